// src/constants.rs

pub const APP_NAME: &str = "SerrureMaster";
pub const UI_WIDTH: usize = 88;
pub const TITLE_TRUNCATE_LENGTH: usize = 48;
pub const CONFIG_DIR_NAME: &str = concat!(".", clap::crate_name!());
pub const CONFIG_FILE_NAME: &str = "config.json";
pub const STORE_DIR_NAME: &str = "store";
pub const LOG_FILE_NAME: &str = concat!(clap::crate_name!(), ".log");
pub const LOG_FALLBACK_FILE_NAME: &str = "fallback.log";
pub const USER_AGENT: &str = concat!(clap::crate_name!(), "/", clap::crate_version!());

pub const DEFAULT_SITE_ORIGIN: &str = "http://localhost:3000";
pub const DEFAULT_CHAT_ENDPOINT: &str = "https://generativelanguage.googleapis.com";
pub const DEFAULT_CHAT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_STORAGE_BUCKET: &str = "secure-pdfs";

/// Durable client storage keys.
pub mod keys {
    pub const CART: &str = "serrure_master_cart";
    pub const SETTINGS: &str = "serrure_master_settings";
    pub const CONSENT: &str = "serrure_master_consent";
    pub const SESSION: &str = "serrure_master_session";
    pub const CATALOG: &str = "serrure_master_catalog";
    pub const CHAT: &str = "serrure_master_chat";
    pub const TESTIMONIALS: &str = "serrure_master_testimonials";
    pub const CALLBACKS: &str = "serrure_master_callbacks";
}

pub mod pricing {
    /// Offering that can be bought several times in one order.
    pub const KIT_OFFERING_ID: &str = "p6_survival_kit";
    /// The bundle discount applies when both of these are in the cart.
    pub const BUNDLE_TRIGGER_ID: &str = "p1_door_slammed";
    pub const BUNDLE_PACK_ID: &str = "p4_security_pack";
    pub const BUNDLE_DISCOUNT: u64 = 50;
}

pub mod links {
    /// Lifetime of a signed download link, in seconds.
    pub const SIGNED_URL_TTL_SECS: i64 = 15 * 60;
}

pub mod testimonials {
    pub const PUBLIC_DISPLAY_COUNT: usize = 3;
    pub const MIN_RATING: u8 = 1;
    pub const MAX_RATING: u8 = 5;
}

pub mod demo {
    pub const USER_ID: &str = "user_123_abc";
    pub const LOGIN_EMAIL: &str = "demo@serruremaster.com";
    pub const PURCHASED_IDS: [&str; 2] = ["p1_door_slammed", "p4_security_pack"];
    /// Entitlement granted after a successful payment when no profile could be fetched.
    pub const POST_PURCHASE_GRANT: &str = "p1_door_slammed";
}

pub mod api {
    pub mod tables {
        pub const PRODUCTS: &str = "products";
        pub const PROFILES: &str = "profiles";
        pub const USER_PRODUCTS: &str = "user_products";
        pub const TESTIMONIALS: &str = "testimonials";
    }
    pub mod functions {
        pub const STRIPE_CHECKOUT: &str = "stripe-checkout";
    }
    pub mod callback {
        pub const STATUS_PARAM: &str = "status";
        pub const STATUS_SUCCESS: &str = "success";
        pub const STATUS_CANCEL: &str = "cancel";
        pub const OTP_EXPIRED: &str = "otp_expired";
        pub const SUCCESS_PATH: &str = "/dashboard";
        pub const CANCEL_PATH: &str = "/";
    }
}

pub const HELP_CONFIGURATION_GUIDE: &str = r#"
L'application ne peut pas démarrer sans les accès au backend hébergé.
Définissez les variables suivantes (ou renseignez ~/.serrure-master/config.json) :
----------------------------------------------
SUPABASE_URL=https://votre-projet.supabase.co
SUPABASE_ANON_KEY=votre-cle-anon-ici
----------------------------------------------
Optionnel :
GEMINI_API_KEY=...        (assistant de discussion)
SITE_ORIGIN=https://...   (adresses de retour du paiement)
APP_ENVIRONMENT=production|development"#;
