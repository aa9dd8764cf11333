//! Shared types for the pixport export pipeline.

use serde::Serialize;

use crate::sanitize::{self, DEFAULT_MAX_LEN};

/// Fallback MIME type when neither the item nor its data URI names one.
pub const DEFAULT_MIME: &str = "application/octet-stream";

/// One decoded file, ready to hand to any destination.
///
/// Created once per job and never mutated afterwards.  The name has
/// already been sanitized.  Names are not unique: two items in one job
/// may share a name, and destinations keep both (last write wins in a
/// folder, duplicate entries in an archive).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetItem {
    pub(crate) name: String,
    pub(crate) mime: String,
    pub(crate) bytes: Vec<u8>,
}

impl AssetItem {
    /// Create an item, sanitizing `name` with the default length limit.
    ///
    /// An empty `mime` becomes [`DEFAULT_MIME`].
    #[must_use]
    pub fn new(name: &str, mime: &str, bytes: Vec<u8>) -> Self {
        Self::with_max_len(name, mime, bytes, DEFAULT_MAX_LEN)
    }

    /// Create an item, sanitizing `name` to at most `max_len` UTF-16
    /// code units.
    #[must_use]
    pub fn with_max_len(name: &str, mime: &str, bytes: Vec<u8>, max_len: usize) -> Self {
        let mime = if mime.trim().is_empty() {
            DEFAULT_MIME
        } else {
            mime.trim()
        };
        Self {
            name: sanitize::sanitize(name, max_len),
            mime: mime.to_owned(),
            bytes,
        }
    }

    /// Sanitized filename.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Resolved MIME type.
    #[must_use]
    pub fn mime(&self) -> &str {
        &self.mime
    }

    /// Raw decoded bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Size of the decoded payload in bytes.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if the decoded payload is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Progress state of the current export job.
///
/// A single slot holds one of these at a time (see
/// [`StatusSlot`](crate::status::StatusSlot)).  `progress` in
/// [`Downloading`](Self::Downloading) never decreases within one
/// destination action, but different destinations each start from 0.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum JobStatus {
    /// Nothing in progress.
    #[default]
    Idle,

    /// Decoding the inbound message.
    Preparing,

    /// A destination is working through the items.
    Downloading {
        /// Index of the item most recently handled.
        item_index: usize,
        /// Fraction of this destination's work done, `0.0..=1.0`.
        progress: f32,
        /// Human-readable description of the current step.
        text: String,
    },

    /// The job finished and at least one destination succeeded.
    Complete {
        /// Summary shown to the user.
        text: String,
    },

    /// The job (or the last destination to report) failed.
    Error {
        /// Failure description shown to the user.
        text: String,
    },
}

impl JobStatus {
    /// Text for the progress overlay.
    #[must_use]
    pub fn text(&self) -> &str {
        match self {
            Self::Idle => "",
            Self::Preparing => "Preparing…",
            Self::Downloading { text, .. } | Self::Complete { text } | Self::Error { text } => text,
        }
    }

    /// Progress for the overlay bar, if the state has one.
    ///
    /// Terminal states report a full bar.
    #[must_use]
    pub const fn progress(&self) -> Option<f32> {
        match self {
            Self::Idle => None,
            Self::Preparing => Some(0.0),
            Self::Downloading { progress, .. } => Some(*progress),
            Self::Complete { .. } | Self::Error { .. } => Some(1.0),
        }
    }

    /// `true` for [`Complete`](Self::Complete) and [`Error`](Self::Error),
    /// the states that revert to [`Idle`](Self::Idle) after a display delay.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}

/// Why one inbound item could not be decoded.
///
/// Decoding errors are per item: the item is skipped and the rest of the
/// batch continues.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// The item was not an object of the expected shape.
    #[error("malformed item: {0}")]
    MalformedItem(String),

    /// The item has no `data_url`.
    #[error("item has no data_url")]
    MissingData,

    /// The `data_url` is not a `data:<mime>;base64,<payload>` URI.
    #[error("not a base64 data URI")]
    NotDataUri,

    /// The base64 payload is malformed.
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sanitizes_name_and_defaults_mime() {
        let item = AssetItem::new(" a/b.png ", "", vec![1, 2, 3]);
        assert_eq!(item.name(), "a_b.png");
        assert_eq!(item.mime(), DEFAULT_MIME);
        assert_eq!(item.len(), 3);
        assert!(!item.is_empty());
    }

    #[test]
    fn with_max_len_cuts_name() {
        let item = AssetItem::with_max_len("abcdef.png", "image/png", Vec::new(), 4);
        assert_eq!(item.name(), "abcd");
        assert!(item.is_empty());
    }

    #[test]
    fn status_text_and_progress() {
        assert_eq!(JobStatus::Idle.text(), "");
        assert_eq!(JobStatus::Idle.progress(), None);
        let status = JobStatus::Downloading {
            item_index: 1,
            progress: 0.5,
            text: "Downloading 2/4".into(),
        };
        assert_eq!(status.text(), "Downloading 2/4");
        assert_eq!(status.progress(), Some(0.5));
        assert!(!status.is_terminal());
        assert!(JobStatus::Complete { text: "done".into() }.is_terminal());
        assert!(JobStatus::Error { text: "bad".into() }.is_terminal());
    }

    #[test]
    fn status_serializes_with_state_tag() {
        let json = serde_json::to_value(JobStatus::Complete {
            text: "Downloaded 2 file(s)".into(),
        })
        .unwrap_or_default();
        assert_eq!(json["state"], "complete");
        assert_eq!(json["text"], "Downloaded 2 file(s)");
    }
}
