use core::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use freshfood_core::{DomainError, DomainResult, Entity, ProductId};

/// Longest accepted product label, in characters.
pub const MAX_LABEL_LEN: usize = 100;

/// Prices are stored as `NUMERIC(10, 2)`.
pub const PRICE_SCALE: u32 = 2;
const MAX_PRICE_DIGITS: u32 = 10;

/// Closed set of catalog categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Category {
    FreshMeat,
    Vegetable,
    DryGood,
    Fruit,
    #[default]
    Other,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::FreshMeat,
        Category::Vegetable,
        Category::DryGood,
        Category::Fruit,
        Category::Other,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Category::FreshMeat => "fresh-meat",
            Category::Vegetable => "vegetable",
            Category::DryGood => "dry-good",
            Category::Fruit => "fruit",
            Category::Other => "other",
        }
    }
}

impl core::fmt::Display for Category {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive; `_` and spaces are accepted in place of `-`.
impl FromStr for Category {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['_', ' '], "-");
        Category::ALL
            .into_iter()
            .find(|c| c.as_str() == normalized)
            .ok_or_else(|| {
                DomainError::validation(format!(
                    "unknown category '{s}' (expected one of: fresh-meat, vegetable, dry-good, fruit, other)"
                ))
            })
    }
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub label: String,
    pub category: Category,
    /// Current unit price; always `>= 0` with two decimal places.
    pub price: Decimal,
    pub description: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Materialize a validated [`NewProduct`] under a store-assigned id.
    pub fn from_new(id: ProductId, new: NewProduct, now: DateTime<Utc>) -> Self {
        Self {
            id,
            label: new.label,
            category: new.category,
            price: new.price,
            description: new.description,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> ProductId {
        self.id
    }
}

/// Check a unit price and bring it to the stored scale.
///
/// Rejects negative prices, more than two decimal places and values that do not
/// fit in ten digits.
pub fn validate_price(price: Decimal) -> DomainResult<Decimal> {
    if price.is_sign_negative() && !price.is_zero() {
        return Err(DomainError::validation("price must not be negative"));
    }
    if price.normalize().scale() > PRICE_SCALE {
        return Err(DomainError::validation("price must have at most two decimal places"));
    }
    let limit = Decimal::from(10_i64.pow(MAX_PRICE_DIGITS - PRICE_SCALE));
    if price >= limit {
        return Err(DomainError::validation(format!("price must be below {limit}")));
    }

    let mut price = price.abs();
    price.rescale(PRICE_SCALE);
    Ok(price)
}

fn validate_label(label: &str) -> DomainResult<String> {
    let label = label.trim();
    if label.is_empty() {
        return Err(DomainError::validation("label cannot be empty"));
    }
    if label.chars().count() > MAX_LABEL_LEN {
        return Err(DomainError::validation(format!(
            "label cannot exceed {MAX_LABEL_LEN} characters"
        )));
    }
    Ok(label.to_string())
}

/// Input for creating a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub label: String,
    #[serde(default)]
    pub category: Category,
    pub price: Decimal,
    #[serde(default)]
    pub description: String,
}

impl NewProduct {
    pub fn new(label: impl Into<String>, category: Category, price: Decimal) -> Self {
        Self {
            label: label.into(),
            category,
            price,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Validate and normalize (trimmed label, two-decimal price).
    pub fn validate(self) -> DomainResult<Self> {
        Ok(Self {
            label: validate_label(&self.label)?,
            category: self.category,
            price: validate_price(self.price)?,
            description: self.description,
        })
    }
}

/// Partial update of a product; `None` leaves a field untouched.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductChanges {
    pub label: Option<String>,
    pub category: Option<Category>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
}

impl ProductChanges {
    pub fn validate(self) -> DomainResult<Self> {
        Ok(Self {
            label: self.label.as_deref().map(validate_label).transpose()?,
            category: self.category,
            price: self.price.map(validate_price).transpose()?,
            description: self.description,
        })
    }

    /// Apply already-validated changes and bump `updated_at`.
    pub fn apply_to(&self, product: &mut Product, now: DateTime<Utc>) {
        if let Some(label) = &self.label {
            product.label = label.clone();
        }
        if let Some(category) = self.category {
            product.category = category;
        }
        if let Some(price) = self.price {
            product.price = price;
        }
        if let Some(description) = &self.description {
            product.description = description.clone();
        }
        product.updated_at = now.max(product.updated_at);
    }
}

/// Catalog listing filter.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProductFilter {
    /// Case-insensitive label substring; blank means "no filter".
    pub search: Option<String>,
    pub category: Option<Category>,
}

impl ProductFilter {
    pub fn search(term: impl Into<String>) -> Self {
        Self {
            search: Some(term.into()),
            category: None,
        }
    }

    pub fn category(category: Category) -> Self {
        Self {
            search: None,
            category: Some(category),
        }
    }

    /// The trimmed search term, if any.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = self.category {
            if product.category != category {
                return false;
            }
        }
        match self.search_term() {
            Some(term) => product.label.to_lowercase().contains(&term.to_lowercase()),
            None => true,
        }
    }

    /// Listing order: label, then id for ties.
    pub fn sort(products: &mut [Product]) {
        products.sort_by(|a, b| a.label.cmp(&b.label).then(a.id.cmp(&b.id)));
    }
}
