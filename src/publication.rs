// src/publication.rs

use crate::{
    error::{AppError, AppResult},
    models::{Resource, ResourceStatus},
};

/// Lifecycle of an offering's downloadable asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicationState {
    None,
    Draft,
    Published,
    Archived,
}

impl PublicationState {
    pub fn of(resource: Option<&Resource>) -> Self {
        match resource.map(|r| r.status) {
            None => PublicationState::None,
            Some(ResourceStatus::Draft) => PublicationState::Draft,
            Some(ResourceStatus::Published) => PublicationState::Published,
            Some(ResourceStatus::Archived) => PublicationState::Archived,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublicationAction {
    Upload,
    Publish,
    Unpublish,
}

/// Upload always lands in draft; publish and unpublish only flip between draft and published.
pub fn transition(
    state: PublicationState,
    action: PublicationAction,
) -> AppResult<PublicationState> {
    match (state, action) {
        (_, PublicationAction::Upload) => Ok(PublicationState::Draft),
        (PublicationState::Draft, PublicationAction::Publish) => Ok(PublicationState::Published),
        (PublicationState::Published, PublicationAction::Unpublish) => Ok(PublicationState::Draft),
        (state, action) => Err(AppError::UserInputError(format!(
            "Transition {:?} impossible depuis l'état {:?}",
            action, state
        ))),
    }
}

/// Action an admin request for `target` maps to, or `None` when nothing changes.
pub fn action_for_target(
    current: PublicationState,
    target: ResourceStatus,
) -> AppResult<Option<PublicationAction>> {
    match (current, target) {
        (PublicationState::Draft, ResourceStatus::Draft)
        | (PublicationState::Published, ResourceStatus::Published) => Ok(None),
        (_, ResourceStatus::Published) => Ok(Some(PublicationAction::Publish)),
        (_, ResourceStatus::Draft) => Ok(Some(PublicationAction::Unpublish)),
        (_, ResourceStatus::Archived) => Err(AppError::UserInputError(
            "L'archivage d'une ressource n'est pas pris en charge".to_string(),
        )),
    }
}

/// Re-uploads continue the version sequence of the resource they replace.
pub fn next_version(previous: Option<&Resource>) -> u32 {
    previous.map_or(1, |r| r.version.saturating_add(1))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DownloadAffordance {
    Enabled,
    PendingValidation,
    Unavailable,
}

pub fn download_affordance(resource: Option<&Resource>, viewer_is_admin: bool) -> DownloadAffordance {
    match PublicationState::of(resource) {
        PublicationState::Published => DownloadAffordance::Enabled,
        PublicationState::Draft if viewer_is_admin => DownloadAffordance::Enabled,
        PublicationState::Draft => DownloadAffordance::PendingValidation,
        PublicationState::None | PublicationState::Archived => DownloadAffordance::Unavailable,
    }
}
