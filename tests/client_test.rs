// tests/client_test.rs

use mockito::Matcher;
use serde_json::json;
use serrure_master::{
    admin::AdminBackend,
    cart::CartEngine,
    catalog::{CatalogBackend, fallback_offerings},
    checkout::start_checkout,
    client::ApiClient,
    config::AppConfig,
    dialogue::{ChatSession, CompletionBackend, TECHNICAL_ERROR_REPLY, UNCLEAR_REPLY},
    download::generate_secure_link,
    error::AppError,
    models::{TestimonialDraft, Viewer},
    session::resolve_viewer,
    storage::{MemoryStore, SharedStore},
    testimonials::TestimonialBoard,
};
use std::sync::Arc;

fn client_for(server: &mockito::ServerGuard) -> ApiClient {
    let config = AppConfig {
        backend_url: server.url(),
        chat_endpoint: server.url(),
        ..Default::default()
    };
    ApiClient::new(Arc::new(config)).expect("client should build")
}

fn memory() -> SharedStore {
    Arc::new(MemoryStore::new())
}

fn customer(ids: &[&str]) -> Viewer {
    Viewer::synthesized("u1", "client@test.com", ids.iter().map(|s| s.to_string()).collect())
}

#[tokio::test(flavor = "multi_thread")]
async fn transient_backend_failure_is_retried() {
    let mut server = mockito::Server::new_async().await;
    let unavailable = server
        .mock("GET", "/rest/v1/products")
        .match_query(Matcher::Any)
        .with_status(503)
        .expect(1)
        .create_async()
        .await;
    let ok = server
        .mock("GET", "/rest/v1/products")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"[{"id":"p1_door_slammed","title":"Porte claquée","price":90}]"#)
        .create_async()
        .await;

    let config = AppConfig {
        backend_url: server.url(),
        max_retries: 2,
        ..Default::default()
    };
    let client = ApiClient::new(Arc::new(config)).unwrap();
    let products = client.fetch_products().await.expect("retry should succeed");

    assert_eq!(products.len(), 1);
    assert_eq!(products[0].price, 90);
    assert!(products[0].current_resource.is_none());
    unavailable.assert_async().await;
    ok.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn rejected_key_is_an_auth_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/rest/v1/products")
        .match_query(Matcher::Any)
        .with_status(401)
        .create_async()
        .await;

    let client = client_for(&server);
    let err = client.fetch_products().await.unwrap_err();
    assert!(matches!(err, AppError::AuthSession(_)), "unexpected error: {err:?}");
}

#[tokio::test(flavor = "multi_thread")]
async fn checkout_posts_price_references_and_returns_the_redirect() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/functions/v1/stripe-checkout")
        .match_header("apikey", "test-anon-key")
        .match_header("authorization", "Bearer test-anon-key")
        .match_body(Matcher::Json(json!({
            "userId": "u1",
            "items": [{ "priceId": "price_1PqXyZA2eZvKYlo2kR9uWq5a", "quantity": 1 }],
            "successUrl": "https://shop.test/dashboard?status=success",
            "cancelUrl": "https://shop.test/?status=cancel"
        })))
        .with_status(200)
        .with_body(r#"{"url":"https://checkout.stripe.test/c/pay_123"}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let mut cart = CartEngine::load(memory());
    cart.add_item(&fallback_offerings()[0]).unwrap();
    let viewer = customer(&[]);

    let url = start_checkout(Some(&viewer), &mut cart, "https://shop.test", &client)
        .await
        .unwrap();

    assert_eq!(url, "https://checkout.stripe.test/c/pay_123");
    assert!(!cart.is_empty(), "the cart is only cleared by the success callback");
    mock.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn checkout_failure_is_a_payment_session_error() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/functions/v1/stripe-checkout")
        .with_status(500)
        .with_body(r#"{"error":"No such price"}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let mut cart = CartEngine::load(memory());
    cart.add_item(&fallback_offerings()[1]).unwrap();

    let err = start_checkout(Some(&customer(&[])), &mut cart, "https://shop.test", &client)
        .await
        .unwrap_err();
    assert!(err.is_payment_failure(), "unexpected error: {err:?}");
    mock.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn missing_profile_row_synthesizes_a_viewer_with_purchases() {
    let mut server = mockito::Server::new_async().await;
    let profiles = server
        .mock("GET", "/rest/v1/profiles")
        .match_query(Matcher::UrlEncoded("id".into(), "eq.u9".into()))
        .with_status(200)
        .with_body("[]")
        .create_async()
        .await;
    let purchases = server
        .mock("GET", "/rest/v1/user_products")
        .match_query(Matcher::UrlEncoded("user_id".into(), "eq.u9".into()))
        .with_status(200)
        .with_body(r#"[{"product_id":"p4_security_pack"},{"product_id":"p4_security_pack"}]"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let viewer = resolve_viewer(&client, "u9", "lea@mail.fr").await;

    assert_eq!(viewer.id, "u9");
    assert_eq!(viewer.name, "lea");
    assert_eq!(viewer.purchased_product_ids, ["p4_security_pack"]);
    profiles.assert_async().await;
    purchases.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn malformed_profile_body_still_yields_a_viewer() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/rest/v1/profiles")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body("<html>gateway</html>")
        .create_async()
        .await;
    server
        .mock("GET", "/rest/v1/user_products")
        .match_query(Matcher::Any)
        .with_status(503)
        .create_async()
        .await;

    let client = client_for(&server);
    let viewer = resolve_viewer(&client, "u2", "marc@mail.fr").await;
    assert_eq!(viewer.email, "marc@mail.fr");
    assert!(viewer.purchased_product_ids.is_empty());
}

#[tokio::test(flavor = "multi_thread")]
async fn signed_url_is_resolved_against_the_storage_root() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/storage/v1/object/sign/secure-pdfs/p1/guide.pdf")
        .match_body(Matcher::PartialJson(json!({ "expiresIn": 900 })))
        .with_status(200)
        .with_body(r#"{"signedURL":"/object/sign/secure-pdfs/p1/guide.pdf?token=xyz"}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let offering = fallback_offerings().remove(0);
    let link = generate_secure_link(Some(&customer(&["p1_door_slammed"])), &offering, &client)
        .await
        .unwrap();

    assert_eq!(
        link.url,
        format!("{}/storage/v1/object/sign/secure-pdfs/p1/guide.pdf?token=xyz", server.url())
    );
    mock.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn denied_download_never_reaches_the_store() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", Matcher::Any)
        .expect(0)
        .create_async()
        .await;

    let client = client_for(&server);
    let offering = fallback_offerings().remove(0);
    let err = generate_secure_link(Some(&customer(&[])), &offering, &client)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Forbidden(_)));
    mock.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn chat_reply_comes_from_the_first_candidate() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/v1beta/models/test-model:generateContent")
        .match_query(Matcher::UrlEncoded("key".into(), "test-chat-key".into()))
        .match_body(Matcher::Regex(r#""systemInstruction""#.into()))
        .with_status(200)
        .with_body(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"  Nos guides couvrent les portes claquées.  "}]}}]}"#,
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let backend: &dyn CompletionBackend = &client;
    let mut chat = ChatSession::start(false);
    let reply = chat.send("Quels guides proposez-vous ?", Some(backend)).await;

    assert_eq!(reply, "Nos guides couvrent les portes claquées.");
    assert_eq!(chat.messages().len(), 3);
    mock.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn chat_degrades_to_fixed_replies() {
    let mut server = mockito::Server::new_async().await;
    let empty = server
        .mock("POST", "/v1beta/models/test-model:generateContent")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(r#"{"candidates":[]}"#)
        .create_async()
        .await;

    let client = client_for(&server);
    let backend: &dyn CompletionBackend = &client;
    let mut chat = ChatSession::start(true);
    assert_eq!(chat.send("Bonjour", Some(backend)).await, UNCLEAR_REPLY);
    empty.assert_async().await;

    empty.remove_async().await;
    server
        .mock("POST", "/v1beta/models/test-model:generateContent")
        .match_query(Matcher::Any)
        .with_status(400)
        .create_async()
        .await;
    assert_eq!(chat.send("Encore là ?", Some(backend)).await, TECHNICAL_ERROR_REPLY);
}

#[tokio::test(flavor = "multi_thread")]
async fn submitted_testimonial_is_replaced_by_the_stored_row() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/rest/v1/testimonials")
        .match_header("prefer", "return=representation")
        .match_body(Matcher::PartialJson(json!({ "approved": false, "rating": 5 })))
        .with_status(201)
        .with_body(
            r#"[{"id":"b7f0","name":"Nadia","role":"Lille","text":"Efficace.","rating":5,"approved":false,"created_at":"2024-06-01T08:00:00Z","source":"email"}]"#,
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let mut board = TestimonialBoard::load(memory());
    let draft = TestimonialDraft {
        name: "Nadia".into(),
        role: "Lille".into(),
        text: "Efficace.".into(),
        rating: 7,
        source: None,
    };
    let created = board
        .submit(Some(&customer(&["p1_door_slammed"])), draft, &client)
        .await
        .unwrap();

    assert_eq!(created.id, "b7f0");
    assert_eq!(created.date, "2024-06-01T08:00:00Z");
    assert_eq!(board.all().len(), 4);
    assert!(board.entries().iter().all(|e| !e.pending));
    mock.assert_async().await;
}

#[tokio::test(flavor = "multi_thread")]
async fn admin_user_list_joins_profiles_and_purchases() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/rest/v1/profiles")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            r#"[{"id":"u1","email":"a@x.fr","full_name":"Anne","role":"user","status":"active","created_at":null},
                {"id":"u2","email":"b@x.fr","full_name":null,"role":"admin","status":"active","created_at":null}]"#,
        )
        .create_async()
        .await;
    server
        .mock("GET", "/rest/v1/user_products")
        .match_query(Matcher::Any)
        .with_status(200)
        .with_body(
            r#"[{"user_id":"u1","product_id":"p1_door_slammed"},{"user_id":"u1","product_id":"p6_survival_kit"}]"#,
        )
        .create_async()
        .await;

    let client = client_for(&server);
    let users = client.list_users().await.unwrap();

    assert_eq!(users.len(), 2);
    assert_eq!(users[0].purchased_product_ids, ["p1_door_slammed", "p6_survival_kit"]);
    assert_eq!(users[1].name, "b");
    assert!(users[1].is_admin());
}
