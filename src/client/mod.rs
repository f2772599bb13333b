// src/client/mod.rs — Typed clients for the two remote services

pub mod ai;
pub mod rest;
pub mod schema;

pub use ai::{AiClient, ImageUpload};
pub use rest::RestClient;
