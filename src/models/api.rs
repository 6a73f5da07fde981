// src/models/api.rs

use super::{
    AccountStatus, Compatibility, Offering, ProductType, Role, Testimonial, TestimonialSource,
    Viewer,
};
use serde::{Deserialize, Serialize};

// --- Backend table rows (snake_case columns) ---

#[derive(Deserialize, Debug, Clone)]
pub struct ProductRow {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub price: u64,
    pub original_price: Option<u64>,
    pub image: Option<String>,
    pub stripe_price_id: Option<String>,
    #[serde(rename = "type")]
    pub product_type: Option<ProductType>,
    pub features: Option<Vec<String>>,
    pub compatibility: Option<Compatibility>,
}

impl From<ProductRow> for Offering {
    fn from(row: ProductRow) -> Self {
        Offering {
            id: row.id,
            title: row.title,
            description: row.description.unwrap_or_default(),
            price: row.price,
            original_price: row.original_price,
            features: row.features.unwrap_or_default(),
            compatibility: row.compatibility,
            product_type: row.product_type.unwrap_or_default(),
            image: row.image.unwrap_or_default(),
            stripe_price_id: row.stripe_price_id,
            // resources live in the object store, not in the products table
            current_resource: None,
        }
    }
}

#[derive(Deserialize, Debug, Clone)]
pub struct ProfileRow {
    pub id: String,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub status: Option<AccountStatus>,
    pub created_at: Option<String>,
}

impl ProfileRow {
    /// Blank email or name fall back to the session email and its local part.
    pub fn into_viewer(self, fallback_email: &str, purchased_product_ids: Vec<String>) -> Viewer {
        let email = self
            .email
            .filter(|e| !e.is_empty())
            .unwrap_or_else(|| fallback_email.to_string());
        let name = self
            .full_name
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| email.split('@').next().unwrap_or(&email).to_string());
        Viewer {
            id: self.id,
            email,
            name,
            role: self.role.unwrap_or_default(),
            status: self.status.unwrap_or_default(),
            purchased_product_ids,
            joined_at: self.created_at,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct PurchaseRow {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    pub product_id: String,
}

#[derive(Serialize, Debug, Clone)]
pub struct StatusPatch {
    pub status: AccountStatus,
}

#[derive(Deserialize, Debug, Clone)]
pub struct TestimonialRow {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub role: String,
    pub text: String,
    pub rating: u8,
    #[serde(default)]
    pub approved: bool,
    #[serde(alias = "created_at")]
    pub date: Option<String>,
    pub source: Option<TestimonialSource>,
}

impl From<TestimonialRow> for Testimonial {
    fn from(row: TestimonialRow) -> Self {
        Testimonial {
            id: row.id,
            name: row.name,
            role: row.role,
            text: row.text,
            rating: row.rating,
            approved: row.approved,
            date: row.date.unwrap_or_default(),
            source: row.source,
        }
    }
}

#[derive(Serialize, Debug, Clone)]
pub struct NewTestimonialRow<'a> {
    pub name: &'a str,
    pub role: &'a str,
    pub text: &'a str,
    pub rating: u8,
    pub approved: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<TestimonialSource>,
}

#[derive(Serialize, Debug, Clone)]
pub struct ImagePatch<'a> {
    pub image: &'a str,
}

// --- Checkout session function ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutLineItem {
    pub price_id: String,
    pub quantity: u32,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionRequest {
    pub user_id: String,
    pub items: Vec<CheckoutLineItem>,
    pub success_url: String,
    pub cancel_url: String,
}

#[derive(Deserialize, Debug, Clone)]
pub struct CheckoutSessionResponse {
    pub url: Option<String>,
    pub error: Option<String>,
}

// --- Object store ---

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SignedUrlRequest {
    pub expires_in: i64,
}

#[derive(Deserialize, Debug, Clone)]
pub struct SignedUrlResponse {
    #[serde(rename = "signedURL", alias = "signedUrl")]
    pub signed_url: String,
}

// --- Chat completion ---

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Part {
    pub text: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    pub parts: Vec<Part>,
}

impl Content {
    pub fn text(role: Option<&str>, text: &str) -> Self {
        Self {
            role: role.map(str::to_string),
            parts: vec![Part {
                text: text.to_string(),
            }],
        }
    }
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenerateContentRequest {
    pub system_instruction: Content,
    pub contents: Vec<Content>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct GenerateContentResponse {
    pub candidates: Option<Vec<Candidate>>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct Candidate {
    pub content: Option<Content>,
}

impl GenerateContentResponse {
    /// Text of the first part of the first candidate, if any non-blank text came back.
    pub fn first_text(&self) -> Option<String> {
        self.candidates
            .as_ref()?
            .first()?
            .content
            .as_ref()?
            .parts
            .first()
            .map(|p| p.text.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}
