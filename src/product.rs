// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Product record model.
//!
//! [`ProductRecord`] is owned exclusively by the primary store; the search
//! index and the cache hold derived, disposable copies of it. [`NewProduct`]
//! and [`ProductPatch`] are the write-side inputs: a create takes the full
//! field set, an update takes a sparse patch applied over the stored record.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    #[error("product name must not be empty")]
    EmptyName,
    #[error("product price must be non-negative, got {0}")]
    NegativePrice(f64),
}

/// A catalog product as stored in the primary store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Opaque stable identity.
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub quantity: u32,
    /// Image references (URLs).
    #[serde(default)]
    pub images: Vec<String>,
}

/// Input for creating a product. The primary store assigns the identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: f64,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub quantity: u32,
    #[serde(default)]
    pub images: Vec<String>,
}

impl NewProduct {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.is_empty() {
            return Err(ValidationError::EmptyName);
        }
        if self.price < 0.0 {
            return Err(ValidationError::NegativePrice(self.price));
        }
        Ok(())
    }

    /// Materialize a record with the given identity.
    pub fn into_record(self, id: String) -> ProductRecord {
        ProductRecord {
            id,
            name: self.name,
            description: self.description,
            price: self.price,
            category: self.category,
            tags: self.tags,
            quantity: self.quantity,
            images: self.images,
        }
    }
}

/// Sparse update input. `None` fields leave the stored value untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductPatch {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
    #[serde(default)]
    pub quantity: Option<u32>,
    #[serde(default)]
    pub images: Option<Vec<String>>,
}

impl ProductPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(ref name) = self.name {
            if name.is_empty() {
                return Err(ValidationError::EmptyName);
            }
        }
        if let Some(price) = self.price {
            if price < 0.0 {
                return Err(ValidationError::NegativePrice(price));
            }
        }
        Ok(())
    }

    /// Apply the patch over an existing record, returning the updated record.
    pub fn apply(&self, mut record: ProductRecord) -> ProductRecord {
        if let Some(ref name) = self.name {
            record.name = name.clone();
        }
        if let Some(ref description) = self.description {
            record.description = Some(description.clone());
        }
        if let Some(price) = self.price {
            record.price = price;
        }
        if let Some(ref category) = self.category {
            record.category = Some(category.clone());
        }
        if let Some(ref tags) = self.tags {
            record.tags = tags.clone();
        }
        if let Some(quantity) = self.quantity {
            record.quantity = quantity;
        }
        if let Some(ref images) = self.images {
            record.images = images.clone();
        }
        record
    }
}
