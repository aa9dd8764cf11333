//! Inbound job message as delivered by the producing node.
//!
//! Three shapes carry the item list:
//!
//! - `files: [{data_url, filename, mime?}]` (current)
//! - `data_urls: [{data_url, filename}]` (legacy, no `mime`)
//! - either of the above nested one level under `ui` (older legacy)
//!
//! Items are kept as raw JSON values here so that one malformed item
//! does not reject the whole message; [`payload`](crate::payload)
//! parses them one at a time.  Likewise an item list that is not an
//! array, or an `options`/`ui` value that is not an object, reads as
//! absent.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::options::ExportOptions;

/// A job message from the producing node.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InboundMessage {
    /// Current item list shape.  Only an array counts as a list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Value>,

    /// Legacy item list shape.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_urls: Option<Value>,

    /// Older legacy wrapper.
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "or_absent")]
    pub ui: Option<UiPayload>,

    /// Destination flags.
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "or_absent")]
    pub options: Option<ExportOptions>,

    /// Producer-side failure.  When present nothing is decoded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<Value>,
}

/// Payload nested under the `ui` key by older producers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UiPayload {
    /// Current item list shape.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub files: Option<Value>,

    /// Legacy item list shape.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_urls: Option<Value>,

    /// Destination flags.
    #[serde(skip_serializing_if = "Option::is_none", deserialize_with = "or_absent")]
    pub options: Option<ExportOptions>,
}

/// Read a nested object, treating a value of the wrong shape as absent.
fn or_absent<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if !value.is_object() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value).ok())
}

/// Which shape the item list was found in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemShape {
    /// Top-level `files`.
    Files,
    /// Top-level `data_urls`.
    DataUrls,
    /// `ui.files`.
    UiFiles,
    /// `ui.data_urls`.
    UiDataUrls,
}

impl InboundMessage {
    /// Parse a message from JSON text.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when `json` is not valid JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json).and_then(Self::from_value)
    }

    /// Parse a message from an already-decoded JSON value.
    ///
    /// Anything other than an object is a message without items.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when an object fails to
    /// deserialize.
    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        if value.is_object() {
            serde_json::from_value(value)
        } else {
            Ok(Self::default())
        }
    }

    /// The item list and the shape it came from.
    ///
    /// A present `files` array wins even when empty, then `data_urls`,
    /// then the same two under `ui`.  Non-array values are skipped over.
    /// `None` means the message carries no recognizable item list.
    #[must_use]
    pub fn items(&self) -> Option<(&[Value], ItemShape)> {
        let ui = self.ui.as_ref();
        [
            (self.files.as_ref(), ItemShape::Files),
            (self.data_urls.as_ref(), ItemShape::DataUrls),
            (ui.and_then(|ui| ui.files.as_ref()), ItemShape::UiFiles),
            (ui.and_then(|ui| ui.data_urls.as_ref()), ItemShape::UiDataUrls),
        ]
        .into_iter()
        .find_map(|(list, shape)| Some((list?.as_array()?.as_slice(), shape)))
    }

    /// Destination flags: top-level `options`, else `ui.options`, else
    /// all defaults.
    #[must_use]
    pub fn options(&self) -> ExportOptions {
        self.options
            .as_ref()
            .or_else(|| self.ui.as_ref().and_then(|ui| ui.options.as_ref()))
            .cloned()
            .unwrap_or_default()
    }

    /// The producer-side error text, if any.
    ///
    /// Non-string error values are rendered as compact JSON.  `null`
    /// and `false` count as no error.
    #[must_use]
    pub fn error_text(&self) -> Option<String> {
        match self.error.as_ref()? {
            Value::Null | Value::Bool(false) => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }
}
