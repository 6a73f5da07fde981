// src/checkout.rs

use crate::{
    cart::CartEngine,
    config::Environment,
    constants::{
        api::callback::{
            CANCEL_PATH, OTP_EXPIRED, STATUS_CANCEL, STATUS_PARAM, STATUS_SUCCESS, SUCCESS_PATH,
        },
        demo, keys,
    },
    error::{AppError, AppResult},
    models::{
        CartItem, Viewer,
        api::{CheckoutLineItem, CheckoutSessionRequest},
    },
    storage::{self, KeyValueStore},
};
use async_trait::async_trait;
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use url::Url;

pub const SUCCESS_NOTICE: &str = "Paiement validé ! Bienvenue dans votre espace.";
pub const CANCEL_NOTICE: &str = "Paiement annulé. Votre panier est conservé.";
pub const LOGIN_REQUIRED_NOTICE: &str = "Veuillez vous connecter pour sécuriser votre achat.";
pub const DEMO_FALLBACK_PROMPT: &str =
    "Mode Démo : Supabase/Stripe non connectés.\nVoulez-vous simuler un paiement RÉUSSI ?";
pub const DEMO_DECLINED_NOTICE: &str = "Paiement annulé (Simulation).";

/// Hosted payment provider behind the session-creation function.
#[async_trait]
pub trait CheckoutGateway: Send + Sync {
    /// Redirect URL of the created session. Non-2xx answers or a missing URL are
    /// `PaymentSession` errors.
    async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> AppResult<String>;
}

pub fn success_url(origin: &str) -> String {
    format!("{}{}?{}={}", origin, SUCCESS_PATH, STATUS_PARAM, STATUS_SUCCESS)
}

pub fn cancel_url(origin: &str) -> String {
    format!("{}{}?{}={}", origin, CANCEL_PATH, STATUS_PARAM, STATUS_CANCEL)
}

/// Where the demo fallback sends the visitor after a simulated payment.
pub fn simulated_success_url(origin: &str) -> String {
    format!("{}{}?{}={}", origin, CANCEL_PATH, STATUS_PARAM, STATUS_SUCCESS)
}

/// Maps line items to price references. Nothing is sent when the cart is empty or an
/// item has no price reference.
pub fn build_checkout_payload(
    viewer_id: &str,
    items: &[CartItem],
    origin: &str,
) -> AppResult<CheckoutSessionRequest> {
    if items.is_empty() {
        return Err(AppError::CartValidation("le panier est vide".to_string()));
    }
    let missing: Vec<&str> = items
        .iter()
        .filter(|i| i.offering.price_reference().is_none())
        .map(CartItem::id)
        .collect();
    if !missing.is_empty() {
        return Err(AppError::CartValidation(format!(
            "Certains produits n'ont pas de Price ID Stripe configuré ({})",
            missing.join(", ")
        )));
    }
    let items = items
        .iter()
        .filter_map(|item| {
            item.offering.price_reference().map(|price_id| CheckoutLineItem {
                price_id: price_id.to_string(),
                quantity: item.quantity,
            })
        })
        .collect();
    Ok(CheckoutSessionRequest {
        user_id: viewer_id.to_string(),
        items,
        success_url: success_url(origin),
        cancel_url: cancel_url(origin),
    })
}

/// Validates the cart and asks the gateway for a hosted session URL.
pub async fn start_checkout(
    viewer: Option<&Viewer>,
    cart: &mut CartEngine,
    origin: &str,
    gateway: &dyn CheckoutGateway,
) -> AppResult<String> {
    if cart.is_empty() {
        return Err(AppError::CartValidation("le panier est vide".to_string()));
    }
    let Some(viewer) = viewer else {
        cart.open();
        return Err(AppError::Forbidden(LOGIN_REQUIRED_NOTICE.to_string()));
    };
    let request = build_checkout_payload(&viewer.id, cart.items(), origin)?;
    debug!("Session de paiement demandée: {:?}", request);
    match gateway.create_checkout_session(&request).await {
        Ok(url) => {
            info!("Redirection vers la page de paiement");
            Ok(url)
        }
        Err(AppError::PaymentSession(msg)) => Err(AppError::PaymentSession(msg)),
        Err(e) => Err(AppError::PaymentSession(e.to_string())),
    }
}

/// The simulated-payment prompt only exists outside production.
pub fn demo_fallback_allowed(environment: Environment) -> bool {
    environment != Environment::Production
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentStatus {
    Success,
    Cancel,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AuthNotice {
    LinkExpired,
    LoginFailed(Option<String>),
}

impl AuthNotice {
    pub fn message(&self) -> String {
        match self {
            AuthNotice::LinkExpired => {
                "Le lien de connexion a expiré. Demandez un nouveau lien email.".to_string()
            }
            AuthNotice::LoginFailed(Some(description)) => {
                format!("Connexion impossible : {}", description)
            }
            AuthNotice::LoginFailed(None) => "Connexion impossible.".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackOutcome {
    pub payment: Option<PaymentStatus>,
    pub auth: Option<AuthNotice>,
    /// The URL with the handled parameters removed.
    pub cleaned_url: String,
}

impl CallbackOutcome {
    pub fn is_noop(&self) -> bool {
        self.payment.is_none() && self.auth.is_none()
    }
}

/// Reads the return navigation: `status` in the query, auth errors in the fragment.
pub fn parse_callback(raw_url: &str) -> AppResult<CallbackOutcome> {
    let mut url = Url::parse(raw_url)?;

    let payment = url
        .query_pairs()
        .find(|(k, _)| k == STATUS_PARAM)
        .and_then(|(_, v)| match v.as_ref() {
            STATUS_SUCCESS => Some(PaymentStatus::Success),
            STATUS_CANCEL => Some(PaymentStatus::Cancel),
            _ => None,
        });
    if payment.is_some() {
        url.set_query(None);
        url.set_path("/");
    }

    let auth = url.fragment().and_then(|fragment| {
        let params: Vec<(String, String)> = url::form_urlencoded::parse(fragment.as_bytes())
            .into_owned()
            .collect();
        let get = |key: &str| params.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone());
        let code = get("error_code");
        if get("error").is_none() && code.is_none() {
            return None;
        }
        if code.as_deref() == Some(OTP_EXPIRED) {
            return Some(AuthNotice::LinkExpired);
        }
        // form decoding already turns '+' into spaces
        let description = get("error_description")
            .map(|d| d.trim().to_string())
            .filter(|d| !d.is_empty());
        Some(AuthNotice::LoginFailed(description))
    });
    if auth.is_some() {
        url.set_fragment(None);
    }

    Ok(CallbackOutcome {
        payment,
        auth,
        cleaned_url: url.to_string(),
    })
}

/// Fires callback side effects at most once per URL within one checkout. Starting a new
/// checkout forgets the handled URLs. Only the most recent URLs are kept.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct CallbackGuard {
    consumed: Vec<String>,
}

const CALLBACK_MEMORY: usize = 32;

impl CallbackGuard {
    pub fn load(store: &dyn KeyValueStore) -> Self {
        storage::load_json(store, keys::CALLBACKS).unwrap_or_default()
    }

    pub fn save(&self, store: &dyn KeyValueStore) -> AppResult<()> {
        storage::save_json(store, keys::CALLBACKS, self)
    }

    /// A new purchase may come back on the same return address as the previous one.
    pub fn reset(store: &dyn KeyValueStore) -> AppResult<()> {
        debug!("Nouvelle commande, retours précédents oubliés");
        store.remove(keys::CALLBACKS)
    }

    pub fn take(&mut self, raw_url: &str) -> AppResult<Option<CallbackOutcome>> {
        if self.consumed.iter().any(|u| u == raw_url) {
            debug!("Retour déjà traité: {}", raw_url);
            return Ok(None);
        }
        let outcome = parse_callback(raw_url)?;
        if outcome.is_noop() {
            return Ok(None);
        }
        self.consumed.push(raw_url.to_string());
        self.consumed.push(outcome.cleaned_url.clone());
        let excess = self.consumed.len().saturating_sub(CALLBACK_MEMORY);
        self.consumed.drain(..excess);
        Ok(Some(outcome))
    }
}

/// Payment succeeded: empty the cart and make sure the viewer is entitled to something.
/// `refreshed` is the profile fetched after payment, when that fetch worked.
pub fn apply_payment_success(
    cart: &mut CartEngine,
    refreshed: Option<Viewer>,
    previous: Option<Viewer>,
) -> AppResult<Viewer> {
    cart.clear()?;
    let viewer = match (refreshed, previous) {
        (Some(viewer), _) => viewer,
        (None, Some(mut viewer)) => {
            if !viewer.is_customer() {
                warn!("Profil non rafraîchi, accès minimal accordé à '{}'", viewer.id);
                viewer.grant(demo::POST_PURCHASE_GRANT);
            }
            viewer
        }
        (None, None) => {
            let mut viewer = Viewer::synthesized(
                demo::USER_ID,
                "client@test.com",
                vec![demo::POST_PURCHASE_GRANT.to_string()],
            );
            viewer.name = "Nouveau Client".to_string();
            viewer
        }
    };
    Ok(viewer)
}

/// Payment cancelled: the cart is kept and shown again.
pub fn apply_payment_cancel(cart: &mut CartEngine) {
    cart.open();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fallback_offerings;
    use crate::storage::MemoryStore;
    use std::sync::{Arc, Mutex};

    fn item(id: &str, price: u64, price_id: Option<&str>) -> CartItem {
        let mut offering = fallback_offerings().into_iter().next().unwrap();
        offering.id = id.to_string();
        offering.price = price;
        offering.stripe_price_id = price_id.map(str::to_string);
        CartItem {
            offering,
            quantity: 1,
            added_at: 0,
        }
    }

    struct FakeGateway {
        result: Result<String, String>,
        requests: Mutex<Vec<CheckoutSessionRequest>>,
    }

    #[async_trait]
    impl CheckoutGateway for FakeGateway {
        async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> AppResult<String> {
            self.requests.lock().unwrap().push(request.clone());
            self.result.clone().map_err(|e| AppError::Other(anyhow::anyhow!(e)))
        }
    }

    fn gateway(result: Result<&str, &str>) -> FakeGateway {
        FakeGateway {
            result: result.map(str::to_string).map_err(str::to_string),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn cart_with(ids: &[&str]) -> CartEngine {
        let mut cart = CartEngine::load(Arc::new(MemoryStore::new()));
        for offering in fallback_offerings().iter().filter(|o| ids.contains(&o.id.as_str())) {
            cart.add_item(offering).unwrap();
        }
        cart
    }

    #[test]
    fn payload_maps_price_references_and_redirects() {
        let payload =
            build_checkout_payload("u1", &[item("p1", 100, Some("price_abc"))], "https://shop.test")
                .unwrap();
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            serde_json::json!({
                "userId": "u1",
                "items": [{"priceId": "price_abc", "quantity": 1}],
                "successUrl": "https://shop.test/dashboard?status=success",
                "cancelUrl": "https://shop.test/?status=cancel",
            })
        );
    }

    #[test]
    fn payload_rejects_empty_carts_and_missing_references() {
        let err = build_checkout_payload("u1", &[], "https://shop.test").unwrap_err();
        assert!(matches!(err, AppError::CartValidation(_)));

        let items = [item("p1", 100, Some("price_abc")), item("p9", 10, Some("  "))];
        let err = build_checkout_payload("u1", &items, "https://shop.test").unwrap_err();
        assert!(matches!(err, AppError::CartValidation(ref m) if m.contains("p9")));
    }

    #[tokio::test]
    async fn invalid_cart_never_reaches_the_gateway() {
        let gw = gateway(Ok("https://pay.test/s"));
        let mut cart = cart_with(&["p1_door_slammed"]);
        let mut broken = fallback_offerings()[2].clone();
        broken.stripe_price_id = None;
        cart.add_item(&broken).unwrap();
        let viewer = Viewer::synthesized("u1", "a@b.c", vec![]);
        let err = start_checkout(Some(&viewer), &mut cart, "https://shop.test", &gw)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::CartValidation(_)));
        assert!(!err.is_payment_failure());
        assert!(gw.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn gateway_failure_is_a_payment_session_error() {
        let gw = gateway(Err("502"));
        let mut cart = cart_with(&["p1_door_slammed"]);
        let viewer = Viewer::synthesized("u1", "a@b.c", vec![]);
        let err = start_checkout(Some(&viewer), &mut cart, "https://shop.test", &gw)
            .await
            .unwrap_err();
        assert!(err.is_payment_failure());
        assert_eq!(cart.items().len(), 1);
    }

    #[tokio::test]
    async fn guests_are_asked_to_log_in() {
        let gw = gateway(Ok("https://pay.test/s"));
        let mut cart = cart_with(&["p1_door_slammed"]);
        cart.toggle();
        let err = start_checkout(None, &mut cart, "https://shop.test", &gw)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(ref m) if m == LOGIN_REQUIRED_NOTICE));
        assert!(cart.is_open());
    }

    #[test]
    fn demo_fallback_only_outside_production() {
        assert!(demo_fallback_allowed(Environment::Development));
        assert!(!demo_fallback_allowed(Environment::Production));
        assert_eq!(
            simulated_success_url("https://shop.test"),
            "https://shop.test/?status=success"
        );
    }

    #[test]
    fn callback_parsing_strips_handled_parameters() {
        let outcome = parse_callback("https://shop.test/dashboard?status=success").unwrap();
        assert_eq!(outcome.payment, Some(PaymentStatus::Success));
        assert_eq!(outcome.cleaned_url, "https://shop.test/");

        let outcome = parse_callback(
            "https://shop.test/login#error=access_denied&error_code=otp_expired&error_description=Email+link+is+invalid",
        )
        .unwrap();
        assert_eq!(outcome.auth, Some(AuthNotice::LinkExpired));
        assert_eq!(outcome.cleaned_url, "https://shop.test/login");

        let outcome = parse_callback(
            "https://shop.test/?x=1#error=server_error&error_description=Database+error+saving+user",
        )
        .unwrap();
        assert_eq!(
            outcome.auth.unwrap().message(),
            "Connexion impossible : Database error saving user"
        );
        assert_eq!(outcome.cleaned_url, "https://shop.test/?x=1");
    }

    #[test]
    fn callback_side_effects_fire_once() {
        let mut guard = CallbackGuard::default();
        let url = "https://shop.test/?status=cancel";
        let first = guard.take(url).unwrap().unwrap();
        assert_eq!(first.payment, Some(PaymentStatus::Cancel));
        assert!(guard.take(url).unwrap().is_none());
        assert!(guard.take(&first.cleaned_url).unwrap().is_none());
        assert!(guard.take("https://shop.test/").unwrap().is_none());
    }

    #[test]
    fn second_purchase_is_handled_after_a_new_checkout() {
        let store = MemoryStore::default();
        let url = "https://shop.test/dashboard?status=success";

        let mut cart = cart_with(&["p2_key_broken"]);
        let mut guard = CallbackGuard::load(&store);
        let first = guard.take(url).unwrap().unwrap();
        guard.save(&store).unwrap();
        assert_eq!(first.payment, Some(PaymentStatus::Success));
        apply_payment_success(&mut cart, None, None).unwrap();
        assert!(cart.is_empty());

        // Same address with no new order in between stays a no-op.
        assert!(CallbackGuard::load(&store).take(url).unwrap().is_none());

        CallbackGuard::reset(&store).unwrap();
        let mut cart = cart_with(&["p3_cylinder_replace"]);
        let mut guard = CallbackGuard::load(&store);
        let second = guard.take(url).unwrap().unwrap();
        guard.save(&store).unwrap();
        assert_eq!(second.payment, Some(PaymentStatus::Success));
        apply_payment_success(&mut cart, None, None).unwrap();
        assert!(cart.is_empty());
        assert!(CallbackGuard::load(&store).take(url).unwrap().is_none());
    }

    #[test]
    fn success_clears_cart_and_grants_minimal_entitlement() {
        let mut cart = cart_with(&["p1_door_slammed", "p4_security_pack"]);
        let viewer = apply_payment_success(&mut cart, None, None).unwrap();
        assert!(cart.is_empty());
        assert!(viewer.owns(demo::POST_PURCHASE_GRANT));

        let mut cart = cart_with(&["p3_cylinder_replace"]);
        let previous = Viewer::synthesized("u7", "x@y.z", vec![]);
        let viewer = apply_payment_success(&mut cart, None, Some(previous)).unwrap();
        assert_eq!(viewer.id, "u7");
        assert!(viewer.is_customer());

        let refreshed = Viewer::synthesized("u7", "x@y.z", vec!["p3_cylinder_replace".into()]);
        let viewer = apply_payment_success(&mut cart, Some(refreshed.clone()), None).unwrap();
        assert_eq!(viewer, refreshed);
    }

    #[test]
    fn cancel_keeps_items_and_reopens_drawer() {
        let mut cart = cart_with(&["p1_door_slammed"]);
        cart.toggle();
        assert!(!cart.is_open());
        apply_payment_cancel(&mut cart);
        assert!(cart.is_open());
        assert_eq!(cart.items().len(), 1);
    }
}
