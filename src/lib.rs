// src/lib.rs — Library root for tutorlink

pub mod cli;
pub mod client;
pub mod infra;
pub mod lesson;
pub mod render;
pub mod stream;
pub mod transport;
