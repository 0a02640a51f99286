//! Turns a message template into the text and button sent to a recipient.

use crate::error::{DispatchError, Result};
use crate::model::{Button, MessageTemplate};

/// Button label used when the template has none.
pub const DEFAULT_BUTTON_LABEL: &str = "Acessar";

/// Button target used when the template has none.
pub const DEFAULT_BUTTON_URL: &str = "https://google.com";

/// Final outbound content for one send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub text: String,
    pub button: Button,
}

/// Render a template: body, then the footer after a blank line, plus the
/// call-to-action button with per-field defaults.
pub fn render(template: &MessageTemplate) -> Result<RenderedMessage> {
    if template.text.trim().is_empty() {
        return Err(DispatchError::Config("message template has no text".to_string()));
    }

    let mut text = template.text.clone();
    if let Some(footer) = template.footer.as_deref().filter(|f| !f.trim().is_empty()) {
        text.push_str("\n\n");
        text.push_str(footer);
    }

    let button = template.button.clone().unwrap_or_default();
    let button = Button {
        label: non_empty_or(button.label, DEFAULT_BUTTON_LABEL),
        url: non_empty_or(button.url, DEFAULT_BUTTON_URL),
    };

    Ok(RenderedMessage { text, button })
}

fn non_empty_or(value: String, default: &str) -> String {
    if value.trim().is_empty() {
        default.to_string()
    } else {
        value
    }
}
