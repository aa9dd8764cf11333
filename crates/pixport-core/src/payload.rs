//! Payload decoding: data URIs to [`AssetItem`]s.
//!
//! Each inbound item carries a `data:<mime>;base64,<payload>` URI and a
//! filename.  Decoding resolves the MIME type (explicit `mime` field,
//! then the URI's own, then `application/octet-stream`), decodes the
//! payload, and sanitizes the filename.
//!
//! Base64 decoding is forgiving in the same ways as browser `atob`:
//! ASCII whitespace is ignored, padding is optional, and non-zero
//! trailing bits are accepted.

use base64::Engine;
use base64::alphabet;
use base64::engine::general_purpose::{GeneralPurpose, GeneralPurposeConfig};
use base64::engine::DecodePaddingMode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use crate::message::{InboundMessage, ItemShape};
use crate::options::ExportOptions;
use crate::sanitize;
use crate::types::{AssetItem, DEFAULT_MIME, DecodeError};

/// Standard alphabet, padding optional, trailing bits tolerated.
const FORGIVING: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

/// One inbound item before decoding.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawItem {
    /// `data:<mime>;base64,<payload>` URI.
    pub data_url: Option<String>,

    /// Requested filename, sanitized during decoding.
    pub filename: Option<String>,

    /// Explicit MIME type; overrides the one embedded in `data_url`.
    pub mime: Option<String>,
}

/// An item that could not be decoded and was left out of the job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedItem {
    /// Position in the inbound list.
    pub index: usize,

    /// Sanitized filename if one was readable, else `item #<index>`.
    pub label: String,

    /// Why the item was skipped.
    pub error: DecodeError,
}

/// Result of decoding a whole message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodedBatch {
    /// Successfully decoded items, in inbound order.
    pub items: Vec<AssetItem>,

    /// Items that failed to decode.
    pub skipped: Vec<SkippedItem>,

    /// Destination flags from the message.
    pub options: ExportOptions,

    /// Where the item list was found; `None` when the message had none.
    pub shape: Option<ItemShape>,
}

/// Decode one raw item.
///
/// # Errors
///
/// Returns [`DecodeError::MissingData`] if `data_url` is absent,
/// [`DecodeError::NotDataUri`] if it is not a base64 data URI, and
/// [`DecodeError::Base64`] if the payload does not decode.
pub fn decode(raw: &RawItem, max_name_len: usize) -> Result<AssetItem, DecodeError> {
    let data_url = raw.data_url.as_deref().ok_or(DecodeError::MissingData)?;
    let (embedded_mime, payload) = split_data_uri(data_url)?;
    let bytes = decode_base64(payload)?;

    let mime = raw
        .mime
        .as_deref()
        .map(str::trim)
        .filter(|mime| !mime.is_empty())
        .or(embedded_mime)
        .unwrap_or(DEFAULT_MIME);
    let filename = raw.filename.as_deref().unwrap_or("");

    Ok(AssetItem {
        name: sanitize::sanitize(filename, max_name_len),
        mime: mime.to_owned(),
        bytes,
    })
}

/// Decode every item of `message`.
///
/// Items that fail are collected in [`DecodedBatch::skipped`]; the rest
/// of the batch is unaffected.  A message with no recognizable item
/// list yields an empty batch, not an error.
#[must_use]
pub fn decode_message(message: &InboundMessage, max_name_len: usize) -> DecodedBatch {
    let options = message.options();
    let Some((values, shape)) = message.items() else {
        return DecodedBatch {
            options,
            ..DecodedBatch::default()
        };
    };

    let mut items = Vec::with_capacity(values.len());
    let mut skipped = Vec::new();
    for (index, value) in values.iter().enumerate() {
        let outcome = parse_raw_item(value, index).and_then(|raw| {
            decode(&raw, max_name_len).map_err(|error| (label_for(&raw, index, max_name_len), error))
        });
        match outcome {
            Ok(item) => {
                debug!(index, name = item.name(), mime = item.mime(), size = item.len(), "decoded item");
                items.push(item);
            }
            Err((label, error)) => skipped.push(SkippedItem {
                index,
                label,
                error,
            }),
        }
    }

    DecodedBatch {
        items,
        skipped,
        options,
        shape: Some(shape),
    }
}

/// Interpret one list element as a [`RawItem`].
fn parse_raw_item(value: &Value, index: usize) -> Result<RawItem, (String, DecodeError)> {
    if !value.is_object() {
        return Err((
            format!("item #{index}"),
            DecodeError::MalformedItem(format!("expected an object, found {}", kind_of(value))),
        ));
    }
    serde_json::from_value(value.clone())
        .map_err(|e| (format!("item #{index}"), DecodeError::MalformedItem(e.to_string())))
}

fn label_for(raw: &RawItem, index: usize, max_name_len: usize) -> String {
    raw.filename
        .as_deref()
        .filter(|name| !name.trim().is_empty())
        .map_or_else(
            || format!("item #{index}"),
            |name| sanitize::sanitize(name, max_name_len),
        )
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Split a base64 data URI into its MIME type (if any) and payload.
fn split_data_uri(uri: &str) -> Result<(Option<&str>, &str), DecodeError> {
    let uri = uri.trim_start();
    let rest = uri
        .get(..5)
        .filter(|scheme| scheme.eq_ignore_ascii_case("data:"))
        .and_then(|_| uri.get(5..))
        .ok_or(DecodeError::NotDataUri)?;
    let (header, payload) = rest.split_once(',').ok_or(DecodeError::NotDataUri)?;

    let mut params = header.split(';');
    let mime = params.next().map(str::trim).filter(|mime| !mime.is_empty());
    if !params.any(|param| param.trim().eq_ignore_ascii_case("base64")) {
        return Err(DecodeError::NotDataUri);
    }
    Ok((mime, payload))
}

fn decode_base64(payload: &str) -> Result<Vec<u8>, DecodeError> {
    let compact: String = payload
        .chars()
        .filter(|c| !c.is_ascii_whitespace())
        .collect();
    Ok(FORGIVING.decode(compact)?)
}
