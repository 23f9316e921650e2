pub mod client;

// Re-export the client types for convenient access (e.g. `use crate::provider::ProviderClient`).
pub use client::{LoginRequest, ProviderClient, SymbolMatch};
