//! Errors from browser API calls.

use pixport_core::HostError;
use wasm_bindgen::JsValue;

/// Errors that can occur when calling into the browser.
#[derive(Debug, thiserror::Error)]
pub enum BrowserError {
    /// A browser API call returned an error.
    #[error("browser API error: {0}")]
    JsError(String),

    /// A required global or property does not exist.
    #[error("{0} is not available")]
    Missing(&'static str),

    /// The user dismissed a prompt (`AbortError`).
    #[error("cancelled by the user")]
    Cancelled,
}

impl From<JsValue> for BrowserError {
    fn from(value: JsValue) -> Self {
        let name = js_sys::Reflect::get(&value, &JsValue::from_str("name"))
            .ok()
            .and_then(|name| name.as_string());
        if name.as_deref() == Some("AbortError") {
            return Self::Cancelled;
        }
        let message = js_sys::Reflect::get(&value, &JsValue::from_str("message"))
            .ok()
            .and_then(|message| message.as_string());
        match (name, message) {
            (Some(name), Some(message)) => Self::JsError(format!("{name}: {message}")),
            _ => Self::JsError(format!("{value:?}")),
        }
    }
}

impl From<BrowserError> for HostError {
    fn from(error: BrowserError) -> Self {
        match error {
            BrowserError::Cancelled => Self::Cancelled,
            other => Self::Failed(other.to_string()),
        }
    }
}
