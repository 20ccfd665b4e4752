//! LRCLIB lyrics lookup.

mod client;
pub mod dto;

pub use client::LrcLibClient;
