// src/models/mod.rs

pub mod api;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// --- Catalog ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ProductType {
    #[serde(rename = "PDF", alias = "pdf")]
    Pdf,
    #[serde(rename = "VIDEO", alias = "video")]
    Video,
    #[serde(rename = "BUNDLE", alias = "bundle")]
    #[default]
    Bundle,
}

/// Publication flag shared by resources, modules and lessons.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceStatus {
    Draft,
    Published,
    Archived,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Compatibility {
    pub valid: Vec<String>,
    pub invalid: Vec<String>,
}

/// The downloadable file attached to an offering. Only the current one is kept.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resource {
    pub id: String,
    pub product_id: String,
    pub file_name: String,
    pub file_path: String,
    pub file_size: String,
    pub status: ResourceStatus,
    pub version: u32,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Offering {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub price: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_price: Option<u64>,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub compatibility: Option<Compatibility>,
    #[serde(rename = "type", default)]
    pub product_type: ProductType,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub stripe_price_id: Option<String>,
    #[serde(default)]
    pub current_resource: Option<Resource>,
}

impl Offering {
    /// External payment price reference, treating a blank value as absent.
    pub fn price_reference(&self) -> Option<&str> {
        self.stripe_price_id
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }
}

/// Partial admin edit of an offering; `None` leaves the field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OfferingUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<u64>,
    #[serde(rename = "original_price", skip_serializing_if = "Option::is_none")]
    pub original_price: Option<u64>,
    #[serde(rename = "stripe_price_id", skip_serializing_if = "Option::is_none")]
    pub stripe_price_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub features: Option<Vec<String>>,
}

impl OfferingUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.price.is_none()
            && self.original_price.is_none()
            && self.stripe_price_id.is_none()
            && self.features.is_none()
    }

    pub fn apply_to(&self, offering: &mut Offering) {
        if let Some(title) = &self.title {
            offering.title = title.clone();
        }
        if let Some(description) = &self.description {
            offering.description = description.clone();
        }
        if let Some(price) = self.price {
            offering.price = price;
        }
        if let Some(original_price) = self.original_price {
            offering.original_price = Some(original_price);
        }
        if let Some(price_id) = &self.stripe_price_id {
            offering.stripe_price_id = Some(price_id.clone());
        }
        if let Some(features) = &self.features {
            offering.features = features.clone();
        }
    }
}

// --- Content tree ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoProvider {
    Native,
    Vimeo,
    Mux,
    Youtube,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub duration: String,
    pub video_url: String,
    pub provider: VideoProvider,
    pub status: ResourceStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checklist: Option<Vec<String>>,
}

/// Everything an admin supplies for a new lesson; id and status are assigned on insert.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonDraft {
    pub title: String,
    pub duration: String,
    pub video_url: String,
    pub provider: VideoProvider,
    pub description: Option<String>,
    pub checklist: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LessonUpdate {
    pub title: Option<String>,
    pub duration: Option<String>,
    pub video_url: Option<String>,
    pub provider: Option<VideoProvider>,
    pub description: Option<String>,
    pub checklist: Option<Vec<String>>,
}

impl LessonUpdate {
    pub fn apply_to(&self, lesson: &mut Lesson) {
        if let Some(title) = &self.title {
            lesson.title = title.clone();
        }
        if let Some(duration) = &self.duration {
            lesson.duration = duration.clone();
        }
        if let Some(url) = &self.video_url {
            lesson.video_url = url.clone();
        }
        if let Some(provider) = self.provider {
            lesson.provider = provider;
        }
        if let Some(description) = &self.description {
            lesson.description = Some(description.clone());
        }
        if let Some(checklist) = &self.checklist {
            lesson.checklist = Some(checklist.clone());
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    pub title: String,
    pub status: ResourceStatus,
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub product_id: String,
    pub modules: Vec<Module>,
}

impl Course {
    pub fn empty(product_id: &str) -> Self {
        Self {
            product_id: product_id.to_string(),
            modules: Vec::new(),
        }
    }

    pub fn lesson_count(&self) -> usize {
        self.modules.iter().map(|m| m.lessons.len()).sum()
    }
}

// --- Cart ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItem {
    #[serde(flatten)]
    pub offering: Offering,
    pub quantity: u32,
    /// Milliseconds since the Unix epoch.
    pub added_at: i64,
}

impl CartItem {
    pub fn id(&self) -> &str {
        &self.offering.id
    }

    pub fn line_total(&self) -> u64 {
        self.offering.price.saturating_mul(u64::from(self.quantity))
    }
}

// --- Viewer ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    #[default]
    Active,
    Blocked,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewer {
    pub id: String,
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub status: AccountStatus,
    #[serde(default)]
    pub purchased_product_ids: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joined_at: Option<String>,
}

impl Viewer {
    /// Minimal profile used whenever the profile lookup yields nothing usable.
    pub fn synthesized(id: &str, email: &str, purchased_product_ids: Vec<String>) -> Self {
        Self {
            id: id.to_string(),
            email: email.to_string(),
            name: email.split('@').next().unwrap_or(email).to_string(),
            role: Role::User,
            status: AccountStatus::Active,
            purchased_product_ids,
            joined_at: None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    pub fn owns(&self, product_id: &str) -> bool {
        self.purchased_product_ids.iter().any(|id| id == product_id)
    }

    /// A customer is a viewer with at least one purchase.
    pub fn is_customer(&self) -> bool {
        !self.purchased_product_ids.is_empty()
    }

    pub fn grant(&mut self, product_id: &str) -> bool {
        if self.owns(product_id) {
            return false;
        }
        self.purchased_product_ids.push(product_id.to_string());
        true
    }
}

// --- Testimonials ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TestimonialSource {
    Google,
    Email,
    Trustpilot,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Testimonial {
    pub id: String,
    pub name: String,
    pub role: String,
    pub text: String,
    pub rating: u8,
    #[serde(default)]
    pub approved: bool,
    pub date: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<TestimonialSource>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestimonialDraft {
    pub name: String,
    pub role: String,
    pub text: String,
    pub rating: u8,
    pub source: Option<TestimonialSource>,
}

// --- Chat ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Model,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
    pub timestamp: i64,
}

// --- Client preferences ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CookiePreferences {
    pub necessary: bool,
    pub analytics: bool,
    pub marketing: bool,
}

impl Default for CookiePreferences {
    fn default() -> Self {
        Self {
            necessary: true,
            analytics: false,
            marketing: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SiteSettings {
    pub logo: Option<String>,
    pub hero_image: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offering_type_defaults_to_bundle() {
        let row: Offering =
            serde_json::from_str(r#"{"id":"p9","title":"Sans type","price":10}"#).unwrap();
        assert_eq!(row.product_type, ProductType::Bundle);

        let row: Offering =
            serde_json::from_str(r#"{"id":"p9","title":"Guide","price":10,"type":"pdf"}"#).unwrap();
        assert_eq!(row.product_type, ProductType::Pdf);
    }
}
