// src/lib.rs

pub mod admin;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod cli;
pub mod client;
pub mod config;
pub mod constants;
pub mod dialogue;
pub mod download;
pub mod error;
pub mod logger;
pub mod models;
pub mod preferences;
pub mod publication;
pub mod session;
pub mod storage;
pub mod symbols;
pub mod testimonials;
pub mod ui;
pub mod utils;
pub mod visibility;
mod workflows;

use crate::{
    cart::CartEngine,
    catalog::CatalogStore,
    cli::{Cli, Command},
    client::ApiClient,
    config::{AppConfig, credentials},
    error::{AppError, AppResult},
    models::Viewer,
    preferences::{ConsentStore, SiteSettingsStore},
    session::SessionStore,
    storage::{FileStore, SharedStore},
    testimonials::TestimonialBoard,
};
use log::{debug, info};
use std::sync::Arc;

/// Everything a command needs, built once per invocation and handed down explicitly.
pub struct AppContext {
    pub config: Arc<AppConfig>,
    pub client: Arc<ApiClient>,
    pub store: SharedStore,
    pub sessions: SessionStore,
    pub viewer: Option<Viewer>,
    pub catalog: CatalogStore,
    pub cart: CartEngine,
    pub testimonials: TestimonialBoard,
    pub settings: SiteSettingsStore,
    pub consent: ConsentStore,
}

impl AppContext {
    /// Loads local state, then refreshes the shared lists from the backend unless `offline`.
    pub async fn build(config: Arc<AppConfig>, store: SharedStore, offline: bool) -> AppResult<Self> {
        let client = Arc::new(ApiClient::new(config.clone())?);
        let sessions = SessionStore::new(store.clone());
        let viewer = session::current_viewer(&sessions, client.as_ref()).await;
        let mut catalog = CatalogStore::load(store.clone());
        let mut testimonials = TestimonialBoard::load(store.clone());
        if offline {
            debug!("Mode hors ligne: catalogue et avis locaux");
        } else {
            ui::with_spinner("Chargement du catalogue...", async {
                catalog.refresh_from_remote(client.as_ref()).await;
                testimonials.refresh_from_remote(client.as_ref()).await;
            })
            .await;
        }
        Ok(Self {
            cart: CartEngine::load(store.clone()),
            settings: SiteSettingsStore::load(store.clone()),
            consent: ConsentStore::load(store.clone()),
            config,
            client,
            store,
            sessions,
            viewer,
            catalog,
            testimonials,
        })
    }

    pub fn is_entitled(&self) -> bool {
        self.viewer.as_ref().is_some_and(Viewer::is_customer)
    }

    pub fn require_viewer(&self) -> AppResult<&Viewer> {
        self.viewer.as_ref().ok_or_else(|| {
            AppError::Forbidden("connectez-vous d'abord (commande 'login')".to_string())
        })
    }
}

/// Library entry point called by `main.rs`.
pub async fn run_from_cli(args: Arc<Cli>) -> AppResult<()> {
    debug!("Arguments: {:?}", args);

    if let Command::Configure { url, key } = &args.command {
        let home = credentials::resolve_home_dir(args.home.as_deref())?;
        let path = credentials::save_backend_credentials(&home, url, key)?;
        println!("{} Accès enregistrés dans {}", *symbols::OK, path.display());
        return Ok(());
    }

    let config = Arc::new(AppConfig::new(&args.overrides())?);
    debug!("Configuration: {:?}", config);
    let store: SharedStore = Arc::new(FileStore::new(config.store_dir())?);
    let mut ctx = AppContext::build(config, store, args.offline).await?;
    info!(
        "Contexte prêt (visiteur: {})",
        ctx.viewer.as_ref().map_or("invité", |v| v.email.as_str())
    );

    match &args.command {
        Command::Configure { .. } => Ok(()),
        Command::Catalog => workflows::show_catalog(&ctx),
        Command::Cart { action } => workflows::cart(&mut ctx, action),
        Command::Checkout { simulate } => workflows::checkout(&mut ctx, *simulate).await,
        Command::Callback { url } => workflows::callback(&mut ctx, url).await,
        Command::Course { product_id, lesson } => {
            workflows::course(&ctx, product_id, lesson.as_deref())
        }
        Command::Download { product_id } => workflows::download(&ctx, product_id).await,
        Command::Chat { message, reset } => {
            workflows::chat(&ctx, message.as_deref(), *reset).await
        }
        Command::Login(login) => workflows::login(&mut ctx, login).await,
        Command::Logout => workflows::logout(&mut ctx),
        Command::Whoami => workflows::whoami(&ctx),
        Command::Testimonials { action } => workflows::testimonials(&mut ctx, action.as_ref()).await,
        Command::Cookies { action } => workflows::cookies(&mut ctx, action),
        Command::Settings { action } => workflows::settings(&mut ctx, action),
        Command::Admin { action } => workflows::admin(&mut ctx, action).await,
    }
}
