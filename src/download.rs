// src/download.rs

//! Signed download links for purchased resources, and the link state shared by the
//! card and button renderings.

use crate::{
    constants::links,
    error::{AppError, AppResult},
    models::{Offering, ResourceStatus, Viewer},
    publication::DownloadAffordance,
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use log::{info, warn};

pub const WARNING_TITLE: &str = "IMPORTANT – LIRE AVANT TOUTE ACTION";

pub const WARNING_LINES: &[&str] = &[
    "Ce guide s’applique exclusivement aux situations suivantes :",
    "  - Porte claquée (non verrouillée)",
    "  - Porte blindée claquée sans verrouillage",
    "Ce guide ne permet en aucun cas l’ouverture d’une porte fermée à clé.",
    "Une tentative inadaptée peut endommager la serrure et entraîner des frais plus élevés.",
];

/// Object store able to issue time-limited URLs.
#[async_trait]
pub trait LinkSigner: Send + Sync {
    async fn create_signed_url(&self, object_path: &str, expires_in_secs: i64) -> AppResult<String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecureLink {
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

fn audit(viewer_id: &str, action: &str, resource: &str, granted: bool) {
    if granted {
        info!(target: "audit", "user={} action={} resource={} status=SUCCESS", viewer_id, action, resource);
    } else {
        warn!(target: "audit", "user={} action={} resource={} status=DENIED", viewer_id, action, resource);
    }
}

/// Checks session, entitlement and publication before asking the store for a link.
/// Admins skip the entitlement check and may fetch drafts.
pub async fn generate_secure_link(
    viewer: Option<&Viewer>,
    offering: &Offering,
    signer: &dyn LinkSigner,
) -> AppResult<SecureLink> {
    let resource_label = offering
        .current_resource
        .as_ref()
        .map_or(offering.id.as_str(), |r| r.file_name.as_str());

    let Some(viewer) = viewer else {
        audit("anonymous", "DOWNLOAD_ATTEMPT", resource_label, false);
        return Err(AppError::Forbidden(
            "Session invalide. Veuillez vous reconnecter.".to_string(),
        ));
    };
    if !viewer.is_admin() && !viewer.owns(&offering.id) {
        audit(&viewer.id, "DOWNLOAD_ATTEMPT", resource_label, false);
        return Err(AppError::Forbidden(
            "Accès refusé. Produit non acquis.".to_string(),
        ));
    }
    let Some(resource) = offering.current_resource.as_ref() else {
        return Err(AppError::ContentUnavailable("Document indisponible".to_string()));
    };
    match resource.status {
        ResourceStatus::Published => {}
        ResourceStatus::Draft if viewer.is_admin() => {}
        ResourceStatus::Draft => {
            return Err(AppError::ContentUnavailable(
                "Ce document est en cours de validation.".to_string(),
            ));
        }
        ResourceStatus::Archived => {
            return Err(AppError::ContentUnavailable("Document indisponible".to_string()));
        }
    }

    let url = signer
        .create_signed_url(&resource.file_path, links::SIGNED_URL_TTL_SECS)
        .await?;
    audit(&viewer.id, "GENERATE_SIGNED_URL", resource_label, true);
    Ok(SecureLink {
        url,
        expires_at: Utc::now() + Duration::seconds(links::SIGNED_URL_TTL_SECS),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LinkState {
    #[default]
    Idle,
    Generating,
    Ready(SecureLink),
    Error(String),
}

/// One state machine per rendered download control.
#[derive(Debug, Default)]
pub struct LinkTracker {
    state: LinkState,
}

impl LinkTracker {
    pub fn state(&self) -> &LinkState {
        &self.state
    }

    /// Returns false while a generation is already in flight.
    pub fn begin(&mut self) -> bool {
        if self.state == LinkState::Generating {
            return false;
        }
        self.state = LinkState::Generating;
        true
    }

    pub fn resolve(&mut self, result: &AppResult<SecureLink>) {
        self.state = match result {
            Ok(link) => LinkState::Ready(link.clone()),
            Err(e) => LinkState::Error(e.to_string()),
        };
    }

    /// Interacting with a ready link dismisses it.
    pub fn dismiss(&mut self) {
        if matches!(self.state, LinkState::Ready(_)) {
            self.state = LinkState::Idle;
        }
    }

    /// Expired links fall back to idle.
    pub fn tick(&mut self, now: DateTime<Utc>) {
        if let LinkState::Ready(link) = &self.state
            && now >= link.expires_at
        {
            self.state = LinkState::Idle;
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardView {
    pub enabled: bool,
    pub subtitle: String,
    pub footer: Option<String>,
}

/// Card rendering: file details when downloadable, a status line otherwise.
pub fn card_view(offering: &Offering, affordance: DownloadAffordance, state: &LinkState) -> CardView {
    let subtitle = match (affordance, offering.current_resource.as_ref()) {
        (DownloadAffordance::Enabled, Some(r)) => format!("{} • {}", r.file_name, r.file_size),
        (DownloadAffordance::PendingValidation, _) => "En attente de validation".to_string(),
        _ => "Indisponible".to_string(),
    };
    let enabled = affordance == DownloadAffordance::Enabled;
    let footer = match state {
        _ if !enabled => None,
        LinkState::Ready(_) => Some("Téléchargement lancé ! Lien valide 15 min.".to_string()),
        LinkState::Error(message) => Some(message.clone()),
        LinkState::Generating => Some("Génération du lien sécurisé...".to_string()),
        LinkState::Idle => None,
    };
    CardView {
        enabled,
        subtitle,
        footer,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ButtonView {
    pub enabled: bool,
    pub label: String,
    pub tooltip: Option<String>,
}

/// Compact rendering of the same state.
pub fn button_view(label: &str, affordance: DownloadAffordance, state: &LinkState) -> ButtonView {
    match affordance {
        DownloadAffordance::PendingValidation => ButtonView {
            enabled: false,
            label: "Validation en cours...".to_string(),
            tooltip: Some("Le document est en cours de validation par l'expert.".to_string()),
        },
        DownloadAffordance::Unavailable => ButtonView {
            enabled: false,
            label: "Bientôt disponible".to_string(),
            tooltip: Some("Document indisponible".to_string()),
        },
        DownloadAffordance::Enabled => ButtonView {
            enabled: *state != LinkState::Generating,
            label: if *state == LinkState::Generating {
                "Chargement...".to_string()
            } else {
                label.to_string()
            },
            tooltip: None,
        },
    }
}
