//! Catalog domain module.
//!
//! This crate contains the product record and its validation rules, implemented
//! purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod product;

pub use product::{Category, NewProduct, Product, ProductChanges, ProductFilter, validate_price};
