pub mod chrome;
pub mod locator;
#[cfg(test)]
pub mod mock;

use anyhow::Result;
use serde_json::Value;
use std::path::Path;
use std::time::Duration;

/// ARIA roles the survey engine looks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    ListItem,
    RadioGroup,
    Radio,
    Checkbox,
    Button,
}

impl Role {
    pub fn css(&self) -> &'static str {
        match self {
            Role::ListItem => r#"div[role="listitem"]"#,
            Role::RadioGroup => r#"div[role="radiogroup"]"#,
            Role::Radio => r#"[role="radio"]"#,
            Role::Checkbox => r#"[role="checkbox"]"#,
            Role::Button => r#"div[role="button"], button"#,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::ListItem => "listitem",
            Role::RadioGroup => "radiogroup",
            Role::Radio => "radio",
            Role::Checkbox => "checkbox",
            Role::Button => "button",
        }
    }
}

/// One element of the rendered form. Handles are short-lived: the page may
/// re-render after any click, so nothing holds on to a node across questions.
pub trait FormNode: Sized {
    /// Descendants carrying `role`, in document order.
    fn by_role(&self, role: Role) -> Result<Vec<Self>>;

    /// Every descendant element, in document order.
    fn descendants(&self) -> Result<Vec<Self>>;

    fn inner_text(&self) -> Result<String>;

    fn attribute(&self, name: &str) -> Result<Option<String>>;

    /// Clicks, retrying until `timeout` elapses.
    fn click(&self, timeout: Duration) -> Result<()>;

    fn scroll_into_view(&self, timeout: Duration) -> Result<()>;

    /// aria-label, then data-value, then rendered text.
    fn accessible_name(&self) -> Result<String> {
        for attr in ["aria-label", "data-value"] {
            if let Some(v) = self.attribute(attr)? {
                if !v.trim().is_empty() {
                    return Ok(v);
                }
            }
        }
        self.inner_text()
    }

    /// Unreadable state counts as unchecked.
    fn is_checked(&self) -> bool {
        matches!(self.attribute("aria-checked"), Ok(Some(v)) if v == "true")
    }
}

/// The page capability the engine drives.
pub trait FormPage {
    type Node<'a>: FormNode
    where
        Self: 'a;

    fn by_role(&self, role: Role) -> Result<Vec<Self::Node<'_>>>;

    /// Best-effort wait for network and rendering to settle. Never fails;
    /// returns whether the page actually became idle within `timeout`.
    fn wait_for_quiescence(&self, timeout: Duration) -> bool;

    /// Fixed pause between interactions.
    fn pause(&self, duration: Duration);

    fn screenshot(&self, path: &Path) -> Result<()>;
}

/// Looks for a Chrome instance exposing the DevTools protocol on `port` and
/// returns its browser websocket url.
pub async fn discover_debugger(port: u16) -> Option<String> {
    let endpoint = format!("http://127.0.0.1:{}/json/version", port);
    match reqwest::get(&endpoint).await {
        Ok(res) => match res.json::<Value>().await {
            Ok(json) => json
                .get("webSocketDebuggerUrl")
                .and_then(|v| v.as_str())
                .map(|s| s.to_string()),
            Err(e) => {
                log::warn!("[Browser] {} returned invalid JSON: {}", endpoint, e);
                None
            }
        },
        Err(e) => {
            log::debug!("[Browser] No debugger listening on {}: {}", endpoint, e);
            None
        }
    }
}
