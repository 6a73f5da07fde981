// src/cli.rs

use crate::{
    config::{ConfigOverrides, Environment},
    models::{ResourceStatus, TestimonialSource, VideoProvider},
};
use clap::{Args, Parser, Subcommand, ValueEnum, crate_version};
use std::path::PathBuf;

/// Log file verbosity.
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum StatusArg {
    Draft,
    Published,
    Archived,
}

impl From<StatusArg> for ResourceStatus {
    fn from(arg: StatusArg) -> Self {
        match arg {
            StatusArg::Draft => ResourceStatus::Draft,
            StatusArg::Published => ResourceStatus::Published,
            StatusArg::Archived => ResourceStatus::Archived,
        }
    }
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum ProviderArg {
    Native,
    Vimeo,
    Mux,
    Youtube,
}

impl From<ProviderArg> for VideoProvider {
    fn from(arg: ProviderArg) -> Self {
        match arg {
            ProviderArg::Native => VideoProvider::Native,
            ProviderArg::Vimeo => VideoProvider::Vimeo,
            ProviderArg::Mux => VideoProvider::Mux,
            ProviderArg::Youtube => VideoProvider::Youtube,
        }
    }
}

#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum SourceArg {
    Google,
    Email,
    Trustpilot,
}

impl From<SourceArg> for TestimonialSource {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Google => TestimonialSource::Google,
            SourceArg::Email => TestimonialSource::Email,
            SourceArg::Trustpilot => TestimonialSource::Trustpilot,
        }
    }
}

#[derive(Parser, Debug, Clone)]
#[command(
    version = crate_version!(),
    about,
    long_about = None,
    arg_required_else_help = true,
    propagate_version = true,
    disable_help_flag = true,
    disable_version_flag = true,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    // --- Options ---
    /// Dossier de configuration et de stockage (défaut: ~/.serrure-master)
    #[arg(long, value_name = "DIR", global = true, help_heading = "Options")]
    pub home: Option<PathBuf>,
    /// URL du backend hébergé, prioritaire sur SUPABASE_URL
    #[arg(long, value_name = "URL", global = true, help_heading = "Options")]
    pub backend_url: Option<String>,
    /// Clé publique du backend, prioritaire sur SUPABASE_ANON_KEY
    #[arg(long, value_name = "KEY", global = true, help_heading = "Options")]
    pub backend_key: Option<String>,
    /// Origine du site pour les adresses de retour du paiement
    #[arg(long, value_name = "URL", global = true, help_heading = "Options")]
    pub site_origin: Option<String>,
    /// Environnement: development ou production
    #[arg(long, value_name = "ENV", global = true, help_heading = "Options")]
    pub environment: Option<Environment>,
    /// N'interroge pas le backend pour le catalogue et les avis
    #[arg(long, action = clap::ArgAction::SetTrue, global = true, help_heading = "Options")]
    pub offline: bool,

    // --- General ---
    /// Affiche cette aide
    #[arg(short = 'h', long, action = clap::ArgAction::Help, global = true, help_heading = "General")]
    _help: Option<bool>,
    /// Affiche la version
    #[arg(short = 'V', long, action = clap::ArgAction::Version, global = true, help_heading = "General")]
    _version: Option<bool>,
    /// (caché) niveau du fichier journal
    #[arg(long, value_enum, default_value_t = LogLevel::Off, global = true, hide = true)]
    pub log_level: LogLevel,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            home: self.home.clone(),
            backend_url: self.backend_url.clone(),
            backend_key: self.backend_key.clone(),
            site_origin: self.site_origin.clone(),
            environment: self.environment,
        }
    }
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Enregistre les accès au backend dans le fichier de configuration
    Configure {
        #[arg(long)]
        url: String,
        #[arg(long)]
        key: String,
    },
    /// Liste les guides disponibles
    Catalog,
    /// Gère le panier
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Crée une session de paiement pour le panier
    Checkout {
        /// Accepte la simulation de paiement sans confirmation (hors production)
        #[arg(long, action = clap::ArgAction::SetTrue)]
        simulate: bool,
    },
    /// Traite l'adresse de retour après paiement ou connexion
    Callback { url: String },
    /// Affiche le contenu vidéo d'un guide acheté
    Course {
        product_id: String,
        /// Leçon à ouvrir (défaut: la première visible)
        #[arg(long)]
        lesson: Option<String>,
    },
    /// Génère un lien de téléchargement sécurisé (15 min)
    Download { product_id: String },
    /// Discute avec l'assistant
    Chat {
        /// Message à envoyer; sans message, la conversation est affichée
        message: Option<String>,
        /// Recommence la conversation
        #[arg(long, action = clap::ArgAction::SetTrue)]
        reset: bool,
    },
    /// Se connecte avec une adresse email
    Login(LoginArgs),
    /// Se déconnecte
    Logout,
    /// Affiche le profil connecté
    Whoami,
    /// Avis clients
    Testimonials {
        #[command(subcommand)]
        action: Option<TestimonialAction>,
    },
    /// Préférences de cookies
    Cookies {
        #[command(subcommand)]
        action: CookieAction,
    },
    /// Logo et image d'accueil
    Settings {
        #[command(subcommand)]
        action: SettingsAction,
    },
    /// Back-office (administrateurs)
    Admin {
        #[command(subcommand)]
        action: AdminAction,
    },
}

#[derive(Args, Debug, Clone)]
pub struct LoginArgs {
    #[arg(long)]
    pub email: String,
    /// Identifiant attribué par le fournisseur d'identité (après le lien magique)
    #[arg(long)]
    pub user_id: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum CartAction {
    Add { product_id: String },
    Remove { product_id: String },
    Show,
    Clear,
}

#[derive(Subcommand, Debug, Clone)]
pub enum TestimonialAction {
    /// Avis publiés
    List,
    /// Laisse un avis (clients uniquement)
    Submit {
        #[arg(long)]
        name: String,
        #[arg(long, default_value = "")]
        role: String,
        #[arg(long)]
        text: String,
        #[arg(long, default_value_t = 5)]
        rating: u8,
        #[arg(long, value_enum)]
        source: Option<SourceArg>,
    },
}

#[derive(Subcommand, Debug, Clone)]
pub enum CookieAction {
    Show,
    AcceptAll,
    RefuseAll,
    Custom {
        #[arg(long, action = clap::ArgAction::SetTrue)]
        analytics: bool,
        #[arg(long, action = clap::ArgAction::SetTrue)]
        marketing: bool,
    },
    Reset,
}

#[derive(Subcommand, Debug, Clone)]
pub enum SettingsAction {
    Show,
    Logo { file: PathBuf },
    Hero { file: PathBuf },
    Reset,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ProductEdit {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub description: Option<String>,
    #[arg(long)]
    pub price: Option<u64>,
    #[arg(long)]
    pub original_price: Option<u64>,
    #[arg(long)]
    pub price_id: Option<String>,
    /// Remplace la liste des points forts (répétable)
    #[arg(long = "feature")]
    pub features: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct LessonFields {
    #[arg(long)]
    pub title: Option<String>,
    #[arg(long)]
    pub duration: Option<String>,
    #[arg(long)]
    pub video_url: Option<String>,
    #[arg(long, value_enum)]
    pub provider: Option<ProviderArg>,
    #[arg(long)]
    pub description: Option<String>,
    /// Point de contrôle (répétable)
    #[arg(long = "check")]
    pub checklist: Vec<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum AdminAction {
    /// Chiffre d'affaires et clients actifs
    Stats,
    Users,
    Block { user_id: String },
    Grant { user_id: String, product_id: String },
    /// Modifie les informations d'un produit
    Product {
        product_id: String,
        #[command(flatten)]
        edit: ProductEdit,
    },
    /// Remplace l'image d'un produit
    Image { product_id: String, file: PathBuf },
    /// Dépose un nouveau PDF (brouillon)
    Upload { product_id: String, file: PathBuf },
    /// Change le statut du PDF courant
    Resource {
        product_id: String,
        #[arg(value_enum)]
        status: StatusArg,
    },
    /// Ajoute un module (brouillon)
    AddModule { product_id: String, title: String },
    /// Ajoute une leçon (brouillon)
    AddLesson {
        product_id: String,
        module_id: String,
        #[command(flatten)]
        fields: LessonFields,
    },
    EditLesson {
        product_id: String,
        module_id: String,
        lesson_id: String,
        #[command(flatten)]
        fields: LessonFields,
    },
    LessonStatus {
        product_id: String,
        module_id: String,
        lesson_id: String,
        #[arg(value_enum)]
        status: StatusArg,
    },
    ModuleStatus {
        product_id: String,
        module_id: String,
        #[arg(value_enum)]
        status: StatusArg,
    },
    /// Tous les avis, en attente compris
    Reviews,
    /// Publie ou masque un avis
    Approve { id: String },
    EditReview {
        id: String,
        #[arg(long)]
        name: Option<String>,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        text: Option<String>,
        #[arg(long)]
        rating: Option<u8>,
    },
    DeleteReview { id: String },
    ResetReviews,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn version_flag_is_accepted_on_subcommands() {
        let err = Cli::try_parse_from(["serrure-master", "cart", "show", "--version"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayVersion);
        assert!(Cli::try_parse_from(["serrure-master", "callback", "https://shop.test/"]).is_ok());
    }

    #[test]
    fn global_options_follow_subcommands() {
        let cli = Cli::try_parse_from([
            "serrure-master",
            "cart",
            "add",
            "p1_door_slammed",
            "--offline",
            "--environment",
            "production",
        ])
        .unwrap();
        assert!(cli.offline);
        assert_eq!(cli.overrides().environment, Some(Environment::Production));
        assert!(matches!(
            cli.command,
            Command::Cart {
                action: CartAction::Add { ref product_id }
            } if product_id == "p1_door_slammed"
        ));
    }
}
