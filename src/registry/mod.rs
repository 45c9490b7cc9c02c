// src/registry/mod.rs
pub mod client;
pub mod models;

#[allow(unused_imports)]
pub use client::{RegistryClient, RegistryConfig};
#[allow(unused_imports)]
pub use models::CompanySnapshot;
