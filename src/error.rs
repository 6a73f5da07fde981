// src/error.rs

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration requise: {0}")]
    Configuration(String),
    #[error("Session invalide: {0}")]
    AuthSession(String),
    #[error("Impossible de charger le profil: {0}")]
    EntitlementFetch(String),
    #[error("Panier invalide: {0}")]
    CartValidation(String),
    #[error("Échec de la création de la session de paiement: {0}")]
    PaymentSession(String),
    #[error("Échec de l'envoi du fichier: {0}")]
    Upload(String),
    #[error("Contenu en cours de préparation: {0}")]
    ContentUnavailable(String),
    #[error("Accès refusé: {0}")]
    Forbidden(String),
    #[error("Introuvable: {0}")]
    NotFound(String),
    #[error("Assistant indisponible: {0}")]
    ChatCompletion(String),
    #[error("Requête réseau échouée: {0}")]
    Network(#[from] reqwest::Error),
    #[error("Erreur du middleware réseau: {0}")]
    NetworkMiddleware(#[from] reqwest_middleware::Error),
    #[error("Erreur d'E/S: {0}")]
    Io(#[from] std::io::Error),
    #[error("Échec de l'écriture atomique: {0}")]
    TempFilePersist(#[from] tempfile::PersistError),
    #[error("Erreur JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Réponse illisible depuis '{url}': {source}")]
    ApiParseFailed {
        url: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("URL invalide: {0}")]
    Url(#[from] url::ParseError),
    #[error("Décodage Base64 échoué: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Interrompu par l'utilisateur")]
    UserInterrupt,
    #[error("{0}")] // message shown as-is
    UserInputError(String),
    #[error("Erreur inattendue: {0}")]
    Other(#[from] anyhow::Error),
}

pub type AppResult<T> = Result<T, AppError>;

/// How an error travels once it leaves the component that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeKind {
    /// Halts the application behind the configuration screen.
    Fatal,
    /// Swallowed with a log line; the caller continues with a safe default.
    Recovered,
    /// Shown to the user; the action is not carried out.
    Blocking,
    /// Expected terminal state, rendered as "content pending".
    Pending,
}

impl From<&AppError> for NoticeKind {
    fn from(error: &AppError) -> Self {
        match error {
            AppError::Configuration(_) => NoticeKind::Fatal,
            AppError::AuthSession(_)
            | AppError::EntitlementFetch(_)
            | AppError::ChatCompletion(_) => NoticeKind::Recovered,
            AppError::ContentUnavailable(_) => NoticeKind::Pending,
            _ => NoticeKind::Blocking,
        }
    }
}

impl AppError {
    pub fn notice_kind(&self) -> NoticeKind {
        NoticeKind::from(self)
    }

    /// Payment-session failures are the only ones that may open the demo fallback.
    pub fn is_payment_failure(&self) -> bool {
        matches!(self, AppError::PaymentSession(_))
    }
}
