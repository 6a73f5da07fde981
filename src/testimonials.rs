// src/testimonials.rs

use crate::{
    catalog::require_admin,
    constants::{keys, testimonials as limits},
    error::{AppError, AppResult},
    models::{Testimonial, TestimonialDraft, TestimonialSource, Viewer},
    storage::{self, SharedStore},
};
use async_trait::async_trait;
use chrono::Utc;
use log::{debug, info, warn};
use serde::Serialize;

#[async_trait]
pub trait TestimonialBackend: Send + Sync {
    /// Newest first.
    async fn fetch_testimonials(&self) -> AppResult<Vec<Testimonial>>;
    /// Returns the stored row when the backend echoes it.
    async fn insert_testimonial(&self, draft: &TestimonialDraft) -> AppResult<Option<Testimonial>>;
    async fn update_testimonial(&self, id: &str, update: &TestimonialUpdate) -> AppResult<()>;
    async fn delete_testimonial(&self, id: &str) -> AppResult<()>;
}

/// Partial admin edit; serialized as the PATCH body.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TestimonialUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub approved: Option<bool>,
}

impl TestimonialUpdate {
    pub fn apply_to(&self, testimonial: &mut Testimonial) {
        if let Some(name) = &self.name {
            testimonial.name = name.clone();
        }
        if let Some(role) = &self.role {
            testimonial.role = role.clone();
        }
        if let Some(text) = &self.text {
            testimonial.text = text.clone();
        }
        if let Some(rating) = self.rating {
            testimonial.rating = clamp_rating(rating);
        }
        if let Some(approved) = self.approved {
            testimonial.approved = approved;
        }
    }
}

pub fn clamp_rating(rating: u8) -> u8 {
    rating.clamp(limits::MIN_RATING, limits::MAX_RATING)
}

/// A local change awaiting the backend's answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Insert(Testimonial),
    Update { id: String, update: TestimonialUpdate },
    Delete(String),
}

/// Server-confirmed list plus tentative changes layered on top of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Ledger {
    confirmed: Vec<Testimonial>,
    pending: Vec<(u64, Change)>,
    next_token: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoardEntry {
    pub testimonial: Testimonial,
    pub pending: bool,
}

impl Ledger {
    pub fn new(confirmed: Vec<Testimonial>) -> Self {
        Self {
            confirmed,
            ..Default::default()
        }
    }

    pub fn confirmed(&self) -> &[Testimonial] {
        &self.confirmed
    }

    pub fn stage(&mut self, change: Change) -> u64 {
        self.next_token += 1;
        self.pending.push((self.next_token, change));
        self.next_token
    }

    /// Confirmed state with pending changes applied, pending rows tagged.
    pub fn view(&self) -> Vec<BoardEntry> {
        let mut entries: Vec<BoardEntry> = self
            .confirmed
            .iter()
            .map(|t| BoardEntry {
                testimonial: t.clone(),
                pending: false,
            })
            .collect();
        for (_, change) in &self.pending {
            match change {
                Change::Insert(t) => entries.insert(
                    0,
                    BoardEntry {
                        testimonial: t.clone(),
                        pending: true,
                    },
                ),
                Change::Update { id, update } => {
                    if let Some(entry) = entries.iter_mut().find(|e| &e.testimonial.id == id) {
                        update.apply_to(&mut entry.testimonial);
                        entry.pending = true;
                    }
                }
                Change::Delete(id) => entries.retain(|e| &e.testimonial.id != id),
            }
        }
        entries
    }

    /// Replaces the tentative change with the confirmed outcome, or drops it on failure so
    /// the view falls back to the last confirmed state.
    pub fn settle(&mut self, token: u64, outcome: Result<Option<Testimonial>, ()>) -> bool {
        let Some(pos) = self.pending.iter().position(|(t, _)| *t == token) else {
            return false;
        };
        let (_, change) = self.pending.remove(pos);
        let Ok(server_row) = outcome else {
            debug!("Changement {} annulé", token);
            return false;
        };
        match change {
            Change::Insert(tentative) => {
                self.confirmed.insert(0, server_row.unwrap_or(tentative));
            }
            Change::Update { id, update } => {
                if let Some(t) = self.confirmed.iter_mut().find(|t| t.id == id) {
                    update.apply_to(t);
                }
            }
            Change::Delete(id) => self.confirmed.retain(|t| t.id != id),
        }
        true
    }
}

pub struct TestimonialBoard {
    ledger: Ledger,
    store: SharedStore,
}

impl TestimonialBoard {
    pub fn load(store: SharedStore) -> Self {
        let confirmed = storage::load_json::<Vec<Testimonial>>(store.as_ref(), keys::TESTIMONIALS)
            .unwrap_or_else(fallback_testimonials);
        Self {
            ledger: Ledger::new(confirmed),
            store,
        }
    }

    pub async fn refresh_from_remote(&mut self, backend: &dyn TestimonialBackend) -> bool {
        match backend.fetch_testimonials().await {
            Ok(rows) if !rows.is_empty() => {
                self.ledger = Ledger::new(rows);
                true
            }
            Ok(_) => false,
            Err(e) => {
                warn!("Utilisation des témoignages locaux: {}", e);
                false
            }
        }
    }

    pub fn entries(&self) -> Vec<BoardEntry> {
        self.ledger.view()
    }

    pub fn all(&self) -> &[Testimonial] {
        self.ledger.confirmed()
    }

    /// Approved testimonials shown on the public pages.
    pub fn public(&self) -> Vec<Testimonial> {
        self.ledger
            .confirmed()
            .iter()
            .filter(|t| t.approved)
            .take(limits::PUBLIC_DISPLAY_COUNT)
            .cloned()
            .collect()
    }

    /// New testimonials always start unapproved and need an entitled viewer.
    pub async fn submit(
        &mut self,
        viewer: Option<&Viewer>,
        mut draft: TestimonialDraft,
        backend: &dyn TestimonialBackend,
    ) -> AppResult<Testimonial> {
        if !viewer.is_some_and(Viewer::is_customer) {
            return Err(AppError::Forbidden(
                "seuls les clients peuvent laisser un avis".to_string(),
            ));
        }
        if draft.text.trim().is_empty() || draft.name.trim().is_empty() {
            return Err(AppError::UserInputError(
                "Le nom et le texte de l'avis sont obligatoires".to_string(),
            ));
        }
        draft.rating = clamp_rating(draft.rating);
        let tentative = Testimonial {
            id: format!("temp_{}", Utc::now().timestamp_millis()),
            name: draft.name.clone(),
            role: draft.role.clone(),
            text: draft.text.clone(),
            rating: draft.rating,
            approved: false,
            date: Utc::now().to_rfc3339(),
            source: draft.source.or(Some(TestimonialSource::Email)),
        };
        let token = self.ledger.stage(Change::Insert(tentative));
        let result = backend.insert_testimonial(&draft).await;
        self.finish(token, result, "l'envoi de l'avis")?;
        self.ledger
            .confirmed()
            .first()
            .cloned()
            .ok_or_else(|| AppError::NotFound("avis".to_string()))
    }

    pub async fn update(
        &mut self,
        viewer: &Viewer,
        id: &str,
        update: TestimonialUpdate,
        backend: &dyn TestimonialBackend,
    ) -> AppResult<()> {
        require_admin(viewer)?;
        self.require(id)?;
        let token = self.ledger.stage(Change::Update {
            id: id.to_string(),
            update: update.clone(),
        });
        let result = backend.update_testimonial(id, &update).await.map(|_| None);
        self.finish(token, result, "la mise à jour de l'avis")
    }

    /// Flips approval; a backend failure rolls the flag back.
    pub async fn toggle_approval(
        &mut self,
        viewer: &Viewer,
        id: &str,
        backend: &dyn TestimonialBackend,
    ) -> AppResult<bool> {
        require_admin(viewer)?;
        let approved = !self.require(id)?.approved;
        let update = TestimonialUpdate {
            approved: Some(approved),
            ..Default::default()
        };
        let token = self.ledger.stage(Change::Update {
            id: id.to_string(),
            update: update.clone(),
        });
        let result = backend.update_testimonial(id, &update).await.map(|_| None);
        self.finish(token, result, "la modération de l'avis")?;
        Ok(approved)
    }

    pub async fn delete(
        &mut self,
        viewer: &Viewer,
        id: &str,
        backend: &dyn TestimonialBackend,
    ) -> AppResult<()> {
        require_admin(viewer)?;
        self.require(id)?;
        let token = self.ledger.stage(Change::Delete(id.to_string()));
        let result = backend.delete_testimonial(id).await.map(|_| None);
        self.finish(token, result, "la suppression de l'avis")
    }

    /// Back to the built-in list.
    pub fn reset(&mut self, viewer: &Viewer) -> AppResult<()> {
        require_admin(viewer)?;
        self.ledger = Ledger::new(fallback_testimonials());
        self.persist()
    }

    fn require(&self, id: &str) -> AppResult<&Testimonial> {
        self.ledger
            .confirmed()
            .iter()
            .find(|t| t.id == id)
            .ok_or_else(|| AppError::NotFound(format!("avis '{}'", id)))
    }

    fn finish(
        &mut self,
        token: u64,
        result: AppResult<Option<Testimonial>>,
        action: &str,
    ) -> AppResult<()> {
        match result {
            Ok(row) => {
                self.ledger.settle(token, Ok(row));
                info!("Avis: {} confirmée", action);
                self.persist()
            }
            Err(e) => {
                self.ledger.settle(token, Err(()));
                warn!("Avis: échec de {}: {}", action, e);
                Err(e)
            }
        }
    }

    fn persist(&self) -> AppResult<()> {
        storage::save_json(self.store.as_ref(), keys::TESTIMONIALS, self.ledger.confirmed())
    }
}

pub fn fallback_testimonials() -> Vec<Testimonial> {
    let entry = |id: &str, name: &str, role: &str, text: &str, rating, date: &str, source| Testimonial {
        id: id.to_string(),
        name: name.to_string(),
        role: role.to_string(),
        text: text.to_string(),
        rating,
        approved: true,
        date: date.to_string(),
        source: Some(source),
    };
    vec![
        entry(
            "t1",
            "Sophie M.",
            "Paris 15ème",
            "J'ai économisé 450€ un dimanche soir. Le guide vidéo sur la radio est incroyable, porte ouverte en 3 minutes !",
            5,
            "2023-11-01",
            TestimonialSource::Trustpilot,
        ),
        entry(
            "t2",
            "Karim B.",
            "Lyon",
            "Sceptique au début, mais la méthode du kit de survie fonctionne. Merci pour l'honnêteté.",
            5,
            "2023-11-05",
            TestimonialSource::Google,
        ),
        entry(
            "t3",
            "Julie D.",
            "Marseille",
            "Le support WhatsApp m'a sauvé. J'étais paniquée, Thomas m'a calmée et guidée.",
            4,
            "2023-10-20",
            TestimonialSource::Email,
        ),
    ]
}
