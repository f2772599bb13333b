// src/render/mod.rs — Conversation and assessment views

pub mod format;
pub mod view;

pub use format::{escape_html, format_content};
pub use view::{render, ConversationView, Panel, RenderContext, RenderMode};
