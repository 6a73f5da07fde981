// src/client.rs

//! HTTP access to the hosted backend (tables, edge function, object store, auth) and to the
//! chat-completion API.

use crate::{
    admin::AdminBackend,
    catalog::CatalogBackend,
    checkout::CheckoutGateway,
    config::AppConfig,
    constants::api::{functions, tables},
    dialogue::CompletionBackend,
    download::LinkSigner,
    error::{AppError, AppResult},
    models::{
        AccountStatus, ChatMessage, ChatRole, Offering, OfferingUpdate, Testimonial,
        TestimonialDraft, Viewer,
        api::{
            CheckoutSessionRequest, CheckoutSessionResponse, Content, GenerateContentRequest,
            GenerateContentResponse, ImagePatch, NewTestimonialRow, ProductRow, ProfileRow,
            PurchaseRow, SignedUrlRequest, SignedUrlResponse, StatusPatch, TestimonialRow,
        },
    },
    session::AccountBackend,
    testimonials::{TestimonialBackend, TestimonialUpdate},
    utils,
};
use async_trait::async_trait;
use itertools::Itertools;
use log::{debug, warn};
use reqwest::{Response, StatusCode, header::CONTENT_TYPE};
use reqwest_middleware::{ClientBuilder, ClientWithMiddleware, RequestBuilder};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::de::DeserializeOwned;
use std::sync::Arc;

#[derive(Clone)]
pub struct ApiClient {
    client: ClientWithMiddleware,
    config: Arc<AppConfig>,
}

impl ApiClient {
    pub fn new(config: Arc<AppConfig>) -> AppResult<Self> {
        let retry_policy =
            ExponentialBackoff::builder().build_with_max_retries(config.max_retries);
        let client = ClientBuilder::new(
            reqwest::Client::builder()
                .user_agent(config.user_agent.clone())
                .connect_timeout(config.connect_timeout)
                .timeout(config.timeout)
                .build()?,
        )
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build();

        Ok(Self { client, config })
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.config.backend_url, table)
    }

    fn storage_url(&self, suffix: &str) -> String {
        format!("{}/storage/v1{}", self.config.backend_url, suffix)
    }

    /// Backend requests carry the project key both as `apikey` and as bearer token.
    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.config.backend_key)
            .bearer_auth(&self.config.backend_key)
    }

    async fn send(&self, builder: RequestBuilder) -> AppResult<Response> {
        let res = self.authorized(builder).send().await?;
        if res.status() == StatusCode::UNAUTHORIZED || res.status() == StatusCode::FORBIDDEN {
            return Err(AppError::AuthSession(format!(
                "clé d'accès refusée (HTTP {})",
                res.status().as_u16()
            )));
        }
        Ok(res.error_for_status()?)
    }

    async fn parse_json<T: DeserializeOwned>(url: &str, res: Response) -> AppResult<T> {
        let body = res.text().await?;
        serde_json::from_str(&body).map_err(|source| AppError::ApiParseFailed {
            url: url.to_string(),
            source,
        })
    }

    async fn select<T: DeserializeOwned>(&self, table: &str, query: &[(&str, &str)]) -> AppResult<Vec<T>> {
        let url = self.rest_url(table);
        debug!("GET {} {:?}", url, query);
        let res = self.send(self.client.get(&url).query(query)).await?;
        Self::parse_json(&url, res).await
    }

    async fn fetch_all_purchases(&self) -> AppResult<Vec<PurchaseRow>> {
        self.select(tables::USER_PRODUCTS, &[("select", "user_id,product_id")])
            .await
    }
}

#[async_trait]
impl CatalogBackend for ApiClient {
    fn storage_bucket(&self) -> &str {
        &self.config.storage_bucket
    }

    async fn fetch_products(&self) -> AppResult<Vec<Offering>> {
        let rows: Vec<ProductRow> = self.select(tables::PRODUCTS, &[("select", "*")]).await?;
        Ok(rows.into_iter().map(Offering::from).collect())
    }

    async fn patch_product(&self, product_id: &str, update: &OfferingUpdate) -> AppResult<()> {
        let filter = format!("eq.{}", product_id);
        let builder = self
            .client
            .patch(self.rest_url(tables::PRODUCTS))
            .query(&[("id", filter.as_str())])
            .json(update);
        self.send(builder).await.map(drop)
    }

    async fn patch_product_image(&self, product_id: &str, image: &str) -> AppResult<()> {
        let filter = format!("eq.{}", product_id);
        let builder = self
            .client
            .patch(self.rest_url(tables::PRODUCTS))
            .query(&[("id", filter.as_str())])
            .json(&ImagePatch { image });
        self.send(builder).await.map(drop)
    }

    async fn upload_object(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> AppResult<()> {
        let url = self.storage_url(&format!("/object/{}", utils::encode_object_path(path)));
        debug!("Envoi de {} octets vers {}", bytes.len(), url);
        let builder = self
            .client
            .post(&url)
            .header(CONTENT_TYPE, content_type)
            .header("x-upsert", "true")
            .body(bytes);
        self.send(builder).await.map(drop)
    }
}

#[async_trait]
impl LinkSigner for ApiClient {
    async fn create_signed_url(&self, object_path: &str, expires_in_secs: i64) -> AppResult<String> {
        let url = self.storage_url(&format!(
            "/object/sign/{}",
            utils::encode_object_path(object_path)
        ));
        let builder = self.client.post(&url).json(&SignedUrlRequest {
            expires_in: expires_in_secs,
        });
        let res = self.send(builder).await?;
        let signed: SignedUrlResponse = Self::parse_json(&url, res).await?;
        // the store answers with a path relative to its own root
        if signed.signed_url.starts_with("http") {
            Ok(signed.signed_url)
        } else {
            Ok(self.storage_url(&signed.signed_url))
        }
    }
}

#[async_trait]
impl AccountBackend for ApiClient {
    async fn fetch_profile(&self, user_id: &str) -> AppResult<Option<ProfileRow>> {
        let filter = format!("eq.{}", user_id);
        let rows: Vec<ProfileRow> = self
            .select(tables::PROFILES, &[("select", "*"), ("id", filter.as_str())])
            .await?;
        Ok(rows.into_iter().next())
    }

    async fn fetch_purchases(&self, user_id: &str) -> AppResult<Vec<String>> {
        let filter = format!("eq.{}", user_id);
        let rows: Vec<PurchaseRow> = self
            .select(
                tables::USER_PRODUCTS,
                &[("select", "product_id"), ("user_id", filter.as_str())],
            )
            .await?;
        Ok(rows.into_iter().map(|r| r.product_id).unique().collect())
    }

    async fn send_magic_link(&self, email: &str) -> AppResult<()> {
        let url = format!("{}/auth/v1/otp", self.config.backend_url);
        let builder = self
            .client
            .post(&url)
            .query(&[("redirect_to", self.config.site_origin.as_str())])
            .json(&serde_json::json!({ "email": email }));
        self.send(builder).await.map(drop)
    }
}

#[async_trait]
impl TestimonialBackend for ApiClient {
    async fn fetch_testimonials(&self) -> AppResult<Vec<Testimonial>> {
        let rows: Vec<TestimonialRow> = self
            .select(
                tables::TESTIMONIALS,
                &[("select", "*"), ("order", "created_at.desc")],
            )
            .await?;
        Ok(rows.into_iter().map(Testimonial::from).collect())
    }

    async fn insert_testimonial(&self, draft: &TestimonialDraft) -> AppResult<Option<Testimonial>> {
        let url = self.rest_url(tables::TESTIMONIALS);
        let row = NewTestimonialRow {
            name: &draft.name,
            role: &draft.role,
            text: &draft.text,
            rating: draft.rating,
            approved: false,
            source: draft.source,
        };
        let builder = self
            .client
            .post(&url)
            .header("Prefer", "return=representation")
            .json(&row);
        let res = self.send(builder).await?;
        let rows: Vec<TestimonialRow> = Self::parse_json(&url, res).await?;
        Ok(rows.into_iter().next().map(Testimonial::from))
    }

    async fn update_testimonial(&self, id: &str, update: &TestimonialUpdate) -> AppResult<()> {
        let filter = format!("eq.{}", id);
        let builder = self
            .client
            .patch(self.rest_url(tables::TESTIMONIALS))
            .query(&[("id", filter.as_str())])
            .json(update);
        self.send(builder).await.map(drop)
    }

    async fn delete_testimonial(&self, id: &str) -> AppResult<()> {
        let filter = format!("eq.{}", id);
        let builder = self
            .client
            .delete(self.rest_url(tables::TESTIMONIALS))
            .query(&[("id", filter.as_str())]);
        self.send(builder).await.map(drop)
    }
}

#[async_trait]
impl AdminBackend for ApiClient {
    async fn list_users(&self) -> AppResult<Vec<Viewer>> {
        let (profiles, purchases) = futures::try_join!(
            self.select::<ProfileRow>(tables::PROFILES, &[("select", "*")]),
            self.fetch_all_purchases(),
        )?;
        let mut by_user = purchases
            .into_iter()
            .filter_map(|row| row.user_id.map(|user| (user, row.product_id)))
            .into_group_map();
        Ok(profiles
            .into_iter()
            .map(|profile| {
                let owned = by_user.remove(&profile.id).unwrap_or_default();
                let email = profile.email.clone().unwrap_or_default();
                profile.into_viewer(&email, owned)
            })
            .collect())
    }

    async fn set_user_status(&self, user_id: &str, status: AccountStatus) -> AppResult<()> {
        let filter = format!("eq.{}", user_id);
        let builder = self
            .client
            .patch(self.rest_url(tables::PROFILES))
            .query(&[("id", filter.as_str())])
            .json(&StatusPatch { status });
        self.send(builder).await.map(drop)
    }

    async fn grant_product(&self, user_id: &str, product_id: &str) -> AppResult<()> {
        let builder = self
            .client
            .post(self.rest_url(tables::USER_PRODUCTS))
            .json(&PurchaseRow {
                user_id: Some(user_id.to_string()),
                product_id: product_id.to_string(),
            });
        self.send(builder).await.map(drop)
    }
}

#[async_trait]
impl CheckoutGateway for ApiClient {
    async fn create_checkout_session(&self, request: &CheckoutSessionRequest) -> AppResult<String> {
        let url = format!(
            "{}/functions/v1/{}",
            self.config.backend_url,
            functions::STRIPE_CHECKOUT
        );
        let res = self
            .authorized(self.client.post(&url).json(request))
            .send()
            .await?;
        let status = res.status();
        if !status.is_success() {
            let body = res.text().await.unwrap_or_default();
            return Err(AppError::PaymentSession(format!(
                "HTTP {}: {}",
                status.as_u16(),
                utils::truncate_text(&utils::single_line(&body), 120)
            )));
        }
        let session: CheckoutSessionResponse = Self::parse_json(&url, res).await?;
        match session {
            CheckoutSessionResponse { url: Some(url), .. } if !url.is_empty() => Ok(url),
            CheckoutSessionResponse { error: Some(e), .. } => Err(AppError::PaymentSession(e)),
            _ => Err(AppError::PaymentSession(
                "aucune URL de paiement reçue".to_string(),
            )),
        }
    }
}

/// Turns sent to the completion API; it expects the conversation to open with a user turn.
pub fn completion_contents(turns: &[ChatMessage]) -> Vec<Content> {
    turns
        .iter()
        .skip_while(|m| m.role == ChatRole::Model)
        .map(|m| {
            let role = match m.role {
                ChatRole::User => "user",
                ChatRole::Model => "model",
            };
            Content::text(Some(role), &m.text)
        })
        .collect()
}

#[async_trait]
impl CompletionBackend for ApiClient {
    async fn complete(&self, system_instruction: &str, turns: &[ChatMessage]) -> AppResult<Option<String>> {
        let Some(api_key) = self.config.chat_api_key.as_deref() else {
            return Err(AppError::ChatCompletion("clé d'API absente".to_string()));
        };
        let url = format!(
            "{}/v1beta/models/{}:generateContent",
            self.config.chat_endpoint, self.config.chat_model
        );
        let request = GenerateContentRequest {
            system_instruction: Content::text(None, system_instruction),
            contents: completion_contents(turns),
        };
        let res = self
            .client
            .post(&url)
            .query(&[("key", api_key)])
            .json(&request)
            .send()
            .await?;
        if !res.status().is_success() {
            warn!("Service de génération: HTTP {}", res.status());
            return Err(AppError::ChatCompletion(format!("HTTP {}", res.status().as_u16())));
        }
        let response: GenerateContentResponse = Self::parse_json(&url, res).await?;
        Ok(response.first_text())
    }
}
