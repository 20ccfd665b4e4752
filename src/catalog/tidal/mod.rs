//! Tidal catalog backend.
//!
//! - `dto.rs` mirrors the proxy API JSON exactly
//! - `adapter.rs` converts DTOs into catalog domain types
//! - `client.rs` performs the HTTP calls and implements [`CatalogApi`](crate::catalog::CatalogApi)

pub mod adapter;
mod client;
pub mod dto;

pub use client::{TidalClient, select_fastest_instance};
