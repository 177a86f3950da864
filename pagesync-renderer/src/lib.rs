//! # pagesync-renderer
//!
//! Tera-based rendering of the commit message template.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pagesync_core::PublishConfig;
//! use pagesync_renderer::{MessageContext, MessageRenderer};
//!
//! fn message_for(config: &PublishConfig) -> String {
//!     let ctx = MessageContext::from_config(config);
//!     MessageRenderer::new()
//!         .and_then(|r| r.render(&config.commit_message, &ctx))
//!         .unwrap_or_else(|_| config.commit_message.clone())
//! }
//! ```

pub mod context;
pub mod engine;
pub mod error;

pub use context::{MessageContext, SourceCtx};
pub use engine::MessageRenderer;
pub use error::RenderError;
