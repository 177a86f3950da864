//! Tera rendering engine for commit messages.
//!
//! The message template comes from config, so it is registered at render
//! time under a fixed name. Templates without an `.html` extension are never
//! autoescaped, which keeps `<`, `&` and quotes intact in commit messages.

use tera::Tera;

use crate::context::MessageContext;
use crate::error::RenderError;

const TEMPLATE_NAME: &str = "commit_message";

/// Renders commit message templates. Create once and reuse.
pub struct MessageRenderer {
    tera: Tera,
}

impl MessageRenderer {
    pub fn new() -> Result<Self, RenderError> {
        Ok(MessageRenderer {
            tera: Tera::default(),
        })
    }

    /// Render `template` against `ctx`.
    ///
    /// Trailing whitespace is trimmed; an empty result is an error because git
    /// would refuse the commit anyway.
    pub fn render(&self, template: &str, ctx: &MessageContext) -> Result<String, RenderError> {
        let mut tera = self.tera.clone();
        tera.add_raw_template(TEMPLATE_NAME, template)?;
        let rendered = tera.render(TEMPLATE_NAME, &ctx.to_tera_context()?)?;
        let trimmed = rendered.trim_end();
        if trimmed.trim().is_empty() {
            return Err(RenderError::EmptyMessage);
        }
        Ok(trimmed.to_string())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
