// src/preferences.rs

use crate::{
    catalog::require_admin,
    constants::keys,
    error::{AppError, AppResult},
    models::{CookiePreferences, SiteSettings, Viewer},
    storage::{self, SharedStore},
    utils,
};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use log::info;

/// Inline `data:` URL for an uploaded image. Anything that is not a recognised image is rejected.
pub fn image_data_url(bytes: &[u8]) -> AppResult<String> {
    let mime = utils::image_mime_type(bytes)
        .ok_or_else(|| AppError::Upload("le fichier doit être une image".to_string()))?;
    Ok(format!("data:{};base64,{}", mime, STANDARD.encode(bytes)))
}

/// Branding overrides; `None` means the built-in asset.
pub struct SiteSettingsStore {
    settings: SiteSettings,
    store: SharedStore,
}

impl SiteSettingsStore {
    pub fn load(store: SharedStore) -> Self {
        let settings = storage::load_json(store.as_ref(), keys::SETTINGS).unwrap_or_default();
        Self { settings, store }
    }

    pub fn settings(&self) -> &SiteSettings {
        &self.settings
    }

    pub fn update_logo(&mut self, viewer: &Viewer, bytes: &[u8]) -> AppResult<()> {
        require_admin(viewer)?;
        self.settings.logo = Some(image_data_url(bytes)?);
        info!("Logo mis à jour ({} octets)", bytes.len());
        self.persist()
    }

    pub fn update_hero_image(&mut self, viewer: &Viewer, bytes: &[u8]) -> AppResult<()> {
        require_admin(viewer)?;
        self.settings.hero_image = Some(image_data_url(bytes)?);
        info!("Image d'accueil mise à jour ({} octets)", bytes.len());
        self.persist()
    }

    pub fn reset(&mut self, viewer: &Viewer) -> AppResult<()> {
        require_admin(viewer)?;
        self.settings = SiteSettings::default();
        self.store.remove(keys::SETTINGS)
    }

    fn persist(&self) -> AppResult<()> {
        storage::save_json(self.store.as_ref(), keys::SETTINGS, &self.settings)
    }
}

pub struct ConsentStore {
    choice: Option<CookiePreferences>,
    store: SharedStore,
}

impl ConsentStore {
    pub fn load(store: SharedStore) -> Self {
        let choice = storage::load_json(store.as_ref(), keys::CONSENT);
        Self { choice, store }
    }

    /// The banner shows until a choice is recorded.
    pub fn banner_visible(&self) -> bool {
        self.choice.is_none()
    }

    /// Recorded choice, or the necessary-only default.
    pub fn preferences(&self) -> CookiePreferences {
        self.choice.unwrap_or_default()
    }

    pub fn accept_all(&mut self) -> AppResult<CookiePreferences> {
        self.record(CookiePreferences {
            necessary: true,
            analytics: true,
            marketing: true,
        })
    }

    pub fn refuse_all(&mut self) -> AppResult<CookiePreferences> {
        self.record(CookiePreferences::default())
    }

    pub fn custom(&mut self, analytics: bool, marketing: bool) -> AppResult<CookiePreferences> {
        self.record(CookiePreferences {
            necessary: true,
            analytics,
            marketing,
        })
    }

    pub fn reset(&mut self) -> AppResult<()> {
        self.choice = None;
        self.store.remove(keys::CONSENT)
    }

    fn record(&mut self, preferences: CookiePreferences) -> AppResult<CookiePreferences> {
        storage::save_json(self.store.as_ref(), keys::CONSENT, &preferences)?;
        self.choice = Some(preferences);
        Ok(preferences)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;
    use crate::storage::{KeyValueStore, MemoryStore};
    use std::sync::Arc;

    const PNG_HEADER: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0];

    fn admin() -> Viewer {
        let mut viewer = Viewer::synthesized("a1", "admin@x.fr", vec![]);
        viewer.role = Role::Admin;
        viewer
    }

    #[test]
    fn images_become_data_urls_and_other_files_are_rejected() {
        let url = image_data_url(PNG_HEADER).unwrap();
        assert!(url.starts_with("data:image/png;base64,iVBORw0KGgo"));
        assert!(matches!(image_data_url(b"%PDF-1.7"), Err(AppError::Upload(_))));
    }

    #[test]
    fn settings_round_trip_and_reset_removes_the_key() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let mut settings = SiteSettingsStore::load(store.clone());
        settings.update_logo(&admin(), PNG_HEADER).unwrap();
        assert!(SiteSettingsStore::load(store.clone()).settings().logo.is_some());

        let customer = Viewer::synthesized("c", "c@x.fr", vec![]);
        assert!(matches!(
            settings.update_hero_image(&customer, PNG_HEADER),
            Err(AppError::Forbidden(_))
        ));

        settings.reset(&admin()).unwrap();
        assert_eq!(store.get(keys::SETTINGS).unwrap(), None);
        assert_eq!(settings.settings(), &SiteSettings::default());
    }

    #[test]
    fn consent_keeps_necessary_and_reset_shows_the_banner() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        let mut consent = ConsentStore::load(store.clone());
        assert!(consent.banner_visible());

        let chosen = consent.custom(true, false).unwrap();
        assert!(chosen.necessary && chosen.analytics && !chosen.marketing);
        let reloaded = ConsentStore::load(store.clone());
        assert!(!reloaded.banner_visible());
        assert_eq!(reloaded.preferences(), chosen);

        consent.reset().unwrap();
        assert!(ConsentStore::load(store).banner_visible());
    }

    #[test]
    fn corrupt_consent_shows_the_banner() {
        let store: SharedStore = Arc::new(MemoryStore::new());
        store.set(keys::CONSENT, "{not json").unwrap();
        assert!(ConsentStore::load(store).banner_visible());
    }
}
