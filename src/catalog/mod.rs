//! Catalog module - searches the streaming backend and fetches audio, lyrics and covers.
//!
//! # Architecture
//!
//! This module follows a clean separation between:
//! - **Domain models** (`domain.rs`) - Internal types the pipeline works with
//! - **API DTOs** (`tidal/dto.rs`, `lrclib/dto.rs`) - Exact API response shapes
//! - **Adapters** - Convert DTOs to domain models
//! - **Clients** - HTTP clients for external APIs
//! - **Traits** (`traits.rs`) - The [`CatalogApi`] seam the downloader depends on
//!
//! The downloader only ever sees [`CatalogApi`], so tests run the whole
//! pipeline against [`traits::mocks::MockCatalog`] without a network.

pub mod domain;
pub mod lrclib;
pub mod tidal;
pub mod traits;

pub use domain::{AudioStream, CandidateTrack, CatalogError, Lyrics, Quality};
pub use tidal::TidalClient;
pub use traits::CatalogApi;
