// src/session.rs

use crate::{
    constants::{demo, keys},
    error::{AppError, AppResult},
    models::{AccountStatus, Role, Viewer, api::ProfileRow},
    storage::{self, SharedStore},
};
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

/// Identity provider and profile tables.
#[async_trait]
pub trait AccountBackend: Send + Sync {
    async fn fetch_profile(&self, user_id: &str) -> AppResult<Option<ProfileRow>>;
    async fn fetch_purchases(&self, user_id: &str) -> AppResult<Vec<String>>;
    async fn send_magic_link(&self, email: &str) -> AppResult<()>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredSession {
    pub user_id: String,
    pub email: String,
    /// Viewers that exist only locally (demo logins, post-payment fallback).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_viewer: Option<Viewer>,
}

pub struct SessionStore {
    store: SharedStore,
}

impl SessionStore {
    pub fn new(store: SharedStore) -> Self {
        Self { store }
    }

    pub fn load(&self) -> Option<StoredSession> {
        storage::load_json(self.store.as_ref(), keys::SESSION)
    }

    pub fn save(&self, session: &StoredSession) -> AppResult<()> {
        storage::save_json(self.store.as_ref(), keys::SESSION, session)
    }

    pub fn remember_local_viewer(&self, viewer: &Viewer) -> AppResult<()> {
        self.save(&StoredSession {
            user_id: viewer.id.clone(),
            email: viewer.email.clone(),
            local_viewer: Some(viewer.clone()),
        })
    }

    /// Ends the session; the chat transcript goes with it.
    pub fn clear(&self) -> AppResult<()> {
        self.store.remove(keys::SESSION)?;
        self.store.remove(keys::CHAT)
    }
}

pub fn is_demo_email(email: &str) -> bool {
    email == demo::LOGIN_EMAIL || email.contains("test")
}

pub fn demo_viewer(email: &str) -> Viewer {
    Viewer {
        id: demo::USER_ID.to_string(),
        email: email.to_string(),
        name: "Utilisateur Démo".to_string(),
        role: if email.contains("admin") {
            Role::Admin
        } else {
            Role::User
        },
        status: AccountStatus::Active,
        purchased_product_ids: demo::PURCHASED_IDS.iter().map(|s| s.to_string()).collect(),
        joined_at: None,
    }
}

/// Profile plus purchases. A missing or failing profile lookup never fails the session:
/// it degrades to a synthesized profile.
pub async fn resolve_viewer(backend: &dyn AccountBackend, user_id: &str, email: &str) -> Viewer {
    let purchases = backend.fetch_purchases(user_id).await.unwrap_or_else(|e| {
        let e = AppError::EntitlementFetch(e.to_string());
        warn!("{}", e);
        Vec::new()
    });
    match backend.fetch_profile(user_id).await {
        Ok(Some(row)) => row.into_viewer(email, purchases),
        Ok(None) => {
            debug!("Aucun profil pour '{}', profil minimal utilisé", user_id);
            Viewer::synthesized(user_id, email, purchases)
        }
        Err(e) => {
            let e = AppError::EntitlementFetch(e.to_string());
            warn!("{}", e);
            Viewer::synthesized(user_id, email, purchases)
        }
    }
}

/// Viewer of the stored session, or `None` for a guest.
pub async fn current_viewer(sessions: &SessionStore, backend: &dyn AccountBackend) -> Option<Viewer> {
    let session = sessions.load()?;
    if let Some(viewer) = session.local_viewer {
        return Some(viewer);
    }
    Some(resolve_viewer(backend, &session.user_id, &session.email).await)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    /// Signed in right away.
    SignedIn(Viewer),
    /// A sign-in link was emailed; nothing is stored yet.
    LinkSent,
}

/// Demo addresses sign in locally. Other addresses get a magic link, unless the caller
/// already holds the user id the identity provider assigned.
pub async fn login(
    sessions: &SessionStore,
    backend: &dyn AccountBackend,
    email: &str,
    user_id: Option<&str>,
) -> AppResult<LoginOutcome> {
    let email = email.trim();
    if !email.contains('@') {
        return Err(AppError::UserInputError(format!(
            "Adresse email invalide: '{}'",
            email
        )));
    }
    if is_demo_email(email) {
        let viewer = demo_viewer(email);
        sessions.remember_local_viewer(&viewer)?;
        info!("Connexion de démonstration pour {}", email);
        return Ok(LoginOutcome::SignedIn(viewer));
    }
    match user_id {
        Some(user_id) => {
            sessions.save(&StoredSession {
                user_id: user_id.to_string(),
                email: email.to_string(),
                local_viewer: None,
            })?;
            let viewer = resolve_viewer(backend, user_id, email).await;
            info!("Session enregistrée pour {}", email);
            Ok(LoginOutcome::SignedIn(viewer))
        }
        None => {
            backend
                .send_magic_link(email)
                .await
                .map_err(|e| AppError::AuthSession(e.to_string()))?;
            Ok(LoginOutcome::LinkSent)
        }
    }
}
