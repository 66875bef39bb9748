//! Deal listing model and validation.
//!
//! # Responsibility
//! - Define the canonical deal record and its create/patch inputs.
//! - Derive slug, discount percentage and shipping cost text.
//!
//! # Invariants
//! - `title` is non-blank and `slug` always reflects the current title.
//! - Prices are finite and non-negative.
//! - `shipping_cost` is a decimal string with exactly two fraction digits.

use crate::model::{
    optional_text, require_amount, require_text, DealId, UserId, ValidationError,
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

static NON_SLUG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-z0-9]+").expect("valid slug regex"));

/// Moderation status of a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DealStatus {
    Active,
    Pending,
    Rejected,
}

impl DealStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "pending" => Some(Self::Pending),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

/// Stock availability shown on a deal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Availability {
    #[default]
    #[serde(rename = "In Stock")]
    InStock,
    #[serde(rename = "Out of Stock")]
    OutOfStock,
}

impl Availability {
    /// Parses the display label; anything unknown falls back to in stock.
    pub fn from_label(value: &str) -> Self {
        match value.trim() {
            "Out of Stock" => Self::OutOfStock,
            _ => Self::InStock,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::InStock => "In Stock",
            Self::OutOfStock => "Out of Stock",
        }
    }

    pub(crate) fn as_db(self) -> &'static str {
        match self {
            Self::InStock => "in_stock",
            Self::OutOfStock => "out_of_stock",
        }
    }

    pub(crate) fn parse_db(value: &str) -> Option<Self> {
        match value {
            "in_stock" => Some(Self::InStock),
            "out_of_stock" => Some(Self::OutOfStock),
            _ => None,
        }
    }
}

/// Per-user toggles kept on a deal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteKind {
    Like,
    Upvote,
    Bookmark,
}

impl VoteKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Like => "like",
            Self::Upvote => "upvote",
            Self::Bookmark => "bookmark",
        }
    }
}

/// Canonical deal record.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Deal {
    pub id: DealId,
    pub url: Option<String>,
    pub title: String,
    pub slug: String,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub original_price: f64,
    pub discounted_price: f64,
    pub discount_percentage: Option<f64>,
    pub currency: String,
    pub currency_symbol: String,
    pub shipping_cost: String,
    pub coupon_code: Option<String>,
    pub affiliate_url: Option<String>,
    pub brand: Option<String>,
    pub platform: Option<String>,
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
    pub specifications: Map<String, Value>,
    pub availability: Availability,
    pub expiration_date: Option<String>,
    pub expires_at: Option<i64>,
    pub views: i64,
    pub is_verified: bool,
    pub is_saved: bool,
    pub free_shipping: bool,
    pub featured: bool,
    pub created_by: Option<UserId>,
    pub updated_by: Option<UserId>,
    pub status: DealStatus,
    pub average_rating: f64,
    pub ratings_count: u32,
    pub likes: u32,
    pub upvotes: u32,
    pub bookmarks: u32,
    pub created_at: i64,
    pub updated_at: i64,
}

/// Caller input for creating a deal.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NewDeal {
    pub url: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub images: Vec<String>,
    pub category: Option<String>,
    pub tags: Vec<String>,
    pub original_price: Option<f64>,
    pub discounted_price: Option<f64>,
    pub discount_percentage: Option<f64>,
    pub currency: Option<String>,
    pub currency_symbol: Option<String>,
    pub shipping_cost: Option<String>,
    pub coupon_code: Option<String>,
    pub affiliate_url: Option<String>,
    pub brand: Option<String>,
    pub platform: Option<String>,
    pub colors: Vec<String>,
    pub sizes: Vec<String>,
    pub specifications: Map<String, Value>,
    pub availability: Option<String>,
    pub expiration_date: Option<String>,
    pub expires_at: Option<i64>,
    pub is_verified: bool,
    pub is_saved: bool,
    pub free_shipping: bool,
    pub featured: bool,
    pub created_by: Option<UserId>,
    pub status: Option<DealStatus>,
}

impl Deal {
    /// Builds a validated deal from caller input.
    pub fn from_new(input: NewDeal, id: DealId, now: i64) -> Result<Self, ValidationError> {
        let title = require_text("title", &input.title)?;
        let original_price = require_amount(
            "originalPrice",
            input
                .original_price
                .ok_or(ValidationError::Required("originalPrice"))?,
        )?;
        let discounted_price = require_amount(
            "discountedPrice",
            input
                .discounted_price
                .ok_or(ValidationError::Required("discountedPrice"))?,
        )?;
        let discount_percentage = match input.discount_percentage {
            Some(value) => Some(require_amount("discountPercentage", value)?),
            None => derive_discount_percentage(original_price, discounted_price),
        };
        let shipping_cost = match input.shipping_cost.as_deref() {
            Some(raw) => format_shipping_cost(raw)?,
            None => "0.00".to_string(),
        };

        Ok(Self {
            id,
            url: optional_text(input.url.as_deref()),
            slug: slugify(&title),
            title,
            description: optional_text(input.description.as_deref()),
            images: clean_list(input.images),
            category: optional_text(input.category.as_deref()),
            tags: clean_list(input.tags),
            original_price,
            discounted_price,
            discount_percentage,
            currency: optional_text(input.currency.as_deref()).unwrap_or_else(|| "USD".into()),
            currency_symbol: optional_text(input.currency_symbol.as_deref())
                .unwrap_or_else(|| "$".into()),
            shipping_cost,
            coupon_code: optional_text(input.coupon_code.as_deref()),
            affiliate_url: optional_text(input.affiliate_url.as_deref()),
            brand: optional_text(input.brand.as_deref()),
            platform: optional_text(input.platform.as_deref()),
            colors: clean_list(input.colors),
            sizes: clean_list(input.sizes),
            specifications: input.specifications,
            availability: input
                .availability
                .as_deref()
                .map(Availability::from_label)
                .unwrap_or_default(),
            expiration_date: optional_text(input.expiration_date.as_deref()),
            expires_at: input.expires_at,
            views: 0,
            is_verified: input.is_verified,
            is_saved: input.is_saved,
            free_shipping: input.free_shipping,
            featured: input.featured,
            created_by: input.created_by,
            updated_by: None,
            status: input.status.unwrap_or(DealStatus::Pending),
            average_rating: 0.0,
            ratings_count: 0,
            likes: 0,
            upvotes: 0,
            bookmarks: 0,
            created_at: now,
            updated_at: now,
        })
    }
}

/// Partial update for an existing deal. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DealPatch {
    pub url: Option<String>,
    pub title: Option<String>,
    pub description: Option<String>,
    pub images: Option<Vec<String>>,
    pub category: Option<String>,
    pub tags: Option<Vec<String>>,
    pub original_price: Option<f64>,
    pub discounted_price: Option<f64>,
    pub discount_percentage: Option<f64>,
    pub currency: Option<String>,
    pub currency_symbol: Option<String>,
    pub shipping_cost: Option<String>,
    pub coupon_code: Option<String>,
    pub affiliate_url: Option<String>,
    pub brand: Option<String>,
    pub platform: Option<String>,
    pub colors: Option<Vec<String>>,
    pub sizes: Option<Vec<String>>,
    pub specifications: Option<Map<String, Value>>,
    pub availability: Option<String>,
    pub expiration_date: Option<String>,
    pub expires_at: Option<i64>,
    pub is_verified: Option<bool>,
    pub is_saved: Option<bool>,
    pub free_shipping: Option<bool>,
    pub featured: Option<bool>,
    pub status: Option<DealStatus>,
    pub updated_by: Option<UserId>,
}

impl DealPatch {
    /// Applies the patch in place, re-deriving the slug when the title changes.
    pub fn apply(self, deal: &mut Deal, now: i64) -> Result<(), ValidationError> {
        if let Some(title) = self.title {
            deal.title = require_text("title", &title)?;
            deal.slug = slugify(&deal.title);
        }
        if let Some(value) = self.original_price {
            deal.original_price = require_amount("originalPrice", value)?;
        }
        if let Some(value) = self.discounted_price {
            deal.discounted_price = require_amount("discountedPrice", value)?;
        }
        if let Some(value) = self.discount_percentage {
            deal.discount_percentage = Some(require_amount("discountPercentage", value)?);
        }
        if let Some(raw) = self.shipping_cost.as_deref() {
            deal.shipping_cost = format_shipping_cost(raw)?;
        }
        if let Some(url) = self.url {
            deal.url = optional_text(Some(&url));
        }
        if let Some(description) = self.description {
            deal.description = optional_text(Some(&description));
        }
        if let Some(images) = self.images {
            deal.images = clean_list(images);
        }
        if let Some(category) = self.category {
            deal.category = optional_text(Some(&category));
        }
        if let Some(tags) = self.tags {
            deal.tags = clean_list(tags);
        }
        if let Some(currency) = optional_text(self.currency.as_deref()) {
            deal.currency = currency;
        }
        if let Some(symbol) = optional_text(self.currency_symbol.as_deref()) {
            deal.currency_symbol = symbol;
        }
        if let Some(code) = self.coupon_code {
            deal.coupon_code = optional_text(Some(&code));
        }
        if let Some(affiliate_url) = self.affiliate_url {
            deal.affiliate_url = optional_text(Some(&affiliate_url));
        }
        if let Some(brand) = self.brand {
            deal.brand = optional_text(Some(&brand));
        }
        if let Some(platform) = self.platform {
            deal.platform = optional_text(Some(&platform));
        }
        if let Some(colors) = self.colors {
            deal.colors = clean_list(colors);
        }
        if let Some(sizes) = self.sizes {
            deal.sizes = clean_list(sizes);
        }
        if let Some(specifications) = self.specifications {
            deal.specifications = specifications;
        }
        if let Some(availability) = self.availability.as_deref() {
            deal.availability = Availability::from_label(availability);
        }
        if let Some(expiration_date) = self.expiration_date {
            deal.expiration_date = optional_text(Some(&expiration_date));
        }
        if self.expires_at.is_some() {
            deal.expires_at = self.expires_at;
        }
        if let Some(value) = self.is_verified {
            deal.is_verified = value;
        }
        if let Some(value) = self.is_saved {
            deal.is_saved = value;
        }
        if let Some(value) = self.free_shipping {
            deal.free_shipping = value;
        }
        if let Some(value) = self.featured {
            deal.featured = value;
        }
        if let Some(status) = self.status {
            deal.status = status;
        }
        if self.updated_by.is_some() {
            deal.updated_by = self.updated_by;
        }
        deal.updated_at = now;
        Ok(())
    }
}

/// Sort orders accepted by deal listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DealSort {
    #[default]
    Newest,
    Oldest,
    PriceLow,
    PriceHigh,
    DiscountHigh,
    DiscountLow,
    Popularity,
}

impl DealSort {
    /// Parses a sort key; unknown keys fall back to newest first.
    pub fn parse(value: &str) -> Self {
        match value {
            "oldest" => Self::Oldest,
            "price-low" => Self::PriceLow,
            "price-high" => Self::PriceHigh,
            "discount-high" => Self::DiscountHigh,
            "discount-low" => Self::DiscountLow,
            "popularity" => Self::Popularity,
            _ => Self::Newest,
        }
    }

    pub(crate) fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "created_at DESC, id ASC",
            Self::Oldest => "created_at ASC, id ASC",
            Self::PriceLow => "discounted_price ASC, created_at DESC",
            Self::PriceHigh => "discounted_price DESC, created_at DESC",
            Self::DiscountHigh => "COALESCE(discount_percentage, 0) DESC, created_at DESC",
            Self::DiscountLow => "COALESCE(discount_percentage, 0) ASC, created_at DESC",
            Self::Popularity => "views DESC, created_at DESC",
        }
    }
}

/// Filters for deal listings. Empty filters match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DealFilter {
    pub category: Option<String>,
    pub brand: Option<String>,
    pub platform: Option<String>,
    pub search: Option<String>,
    pub min_price: Option<f64>,
    pub max_price: Option<f64>,
    pub min_discount: Option<f64>,
    pub max_discount: Option<f64>,
    pub saved_only: bool,
    pub sort: DealSort,
}

/// Derives a URL slug: lowercase ASCII alphanumerics joined by single dashes.
pub fn slugify(title: &str) -> String {
    NON_SLUG_RE
        .replace_all(&title.to_lowercase(), "-")
        .trim_matches('-')
        .to_string()
}

/// Percentage saved relative to the original price, rounded to a whole number.
pub fn derive_discount_percentage(original_price: f64, discounted_price: f64) -> Option<f64> {
    if original_price <= 0.0 || discounted_price > original_price {
        return None;
    }
    Some(((original_price - discounted_price) / original_price * 100.0).round())
}

/// Normalizes shipping cost text to two decimals.
pub fn format_shipping_cost(raw: &str) -> Result<String, ValidationError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok("0.00".to_string());
    }
    let value: f64 = trimmed
        .parse()
        .map_err(|_| ValidationError::invalid("shippingCost", "must be a number"))?;
    let value = require_amount("shippingCost", value)?;
    Ok(format!("{value:.2}"))
}

fn clean_list(values: Vec<String>) -> Vec<String> {
    values
        .into_iter()
        .filter_map(|value| optional_text(Some(&value)))
        .collect()
}
