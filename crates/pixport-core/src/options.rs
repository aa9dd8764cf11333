//! Per-job destination options and dispatcher configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::sanitize::{self, DEFAULT_MAX_LEN};

/// Serde support for `std::time::Duration` as whole milliseconds.
mod duration_millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as milliseconds (`u64`, saturating).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        u64::try_from(duration.as_millis())
            .unwrap_or(u64::MAX)
            .serialize(serializer)
    }

    /// Deserialize a `Duration` from milliseconds.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Forgiving readers for producer-supplied option fields.
///
/// A field of the wrong type takes its default instead of rejecting the
/// whole message.
mod lenient {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// `true`, `"true"` (any case, surrounding whitespace ignored), `"1"`
    /// and non-zero numbers are true; everything else, `null` included,
    /// is false.
    pub fn flag<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::Bool(flag) => flag,
            Value::String(text) => {
                let text = text.trim();
                text.eq_ignore_ascii_case("true") || text == "1"
            }
            Value::Number(number) => number.as_f64().is_some_and(|n| n != 0.0),
            Value::Null | Value::Array(_) | Value::Object(_) => false,
        })
    }

    /// Strings pass through and numbers are rendered; anything else is
    /// absent.
    pub fn name<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(text) => Some(text),
            Value::Number(number) => Some(number.to_string()),
            _ => None,
        })
    }
}

/// Destination flags carried by an inbound job message.
///
/// Every flag is opt-in and any subset may be set.  With neither
/// `save_to_folder` nor `batch_zip`, each item is downloaded directly.
///
/// Flags accept booleans or `"true"`/`"false"` strings; `null` and
/// values of any other type read as `false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportOptions {
    /// Write every item into a user-chosen directory.
    #[serde(deserialize_with = "lenient::flag")]
    pub save_to_folder: bool,

    /// Bundle every item into one ZIP download.
    #[serde(deserialize_with = "lenient::flag")]
    pub batch_zip: bool,

    /// Name for the ZIP download.  Empty or absent uses
    /// [`DispatchConfig::default_zip_filename`].
    #[serde(deserialize_with = "lenient::name")]
    pub zip_filename: Option<String>,

    /// Copy the first item to the clipboard.
    #[serde(deserialize_with = "lenient::flag")]
    pub clipboard: bool,

    /// Open the first item for display.
    #[serde(deserialize_with = "lenient::flag")]
    pub open_in_new_tab: bool,

    /// Emit a developer event with the decoded items and an archive.
    #[serde(deserialize_with = "lenient::flag")]
    pub developer_emit: bool,

    /// Attach the first item as a thumbnail to completion notifications.
    #[serde(deserialize_with = "lenient::flag")]
    pub notify_thumbnails: bool,
}

impl ExportOptions {
    /// `true` when neither directory save nor archive bundling was
    /// requested, so items are downloaded one by one.
    #[must_use]
    pub const fn wants_direct_download(&self) -> bool {
        !self.save_to_folder && !self.batch_zip
    }
}

/// Whether status updates from a superseded job still reach the slot.
///
/// There is no cancellation: when a new job arrives, actions from the
/// previous one keep running.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StalePolicy {
    /// Late updates from older jobs overwrite the slot.
    #[default]
    Overwrite,

    /// Updates stamped with an older job generation are dropped.
    DropStale,
}

/// Dispatcher-wide configuration.
///
/// All fields have defaults; a partial JSON object deserializes with the
/// rest filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    /// Maximum filename length in UTF-16 code units.
    pub max_name_len: usize,

    /// Archive name used when the job does not supply one.
    pub default_zip_filename: String,

    /// How long notifications stay visible.
    #[serde(with = "duration_millis")]
    pub notify_timeout: Duration,

    /// How long a terminal status stays up before reverting to idle.
    #[serde(with = "duration_millis")]
    pub status_revert_delay: Duration,

    /// Handling of status updates from superseded jobs.
    pub stale_policy: StalePolicy,
}

impl DispatchConfig {
    /// Default for [`max_name_len`](Self::max_name_len).
    pub const DEFAULT_MAX_NAME_LEN: usize = DEFAULT_MAX_LEN;

    /// Default for [`default_zip_filename`](Self::default_zip_filename).
    pub const DEFAULT_ZIP_FILENAME: &'static str = "ComfyUI_Images.zip";

    /// Default for [`notify_timeout`](Self::notify_timeout).
    pub const DEFAULT_NOTIFY_TIMEOUT: Duration = Duration::from_secs(3);

    /// Default for [`status_revert_delay`](Self::status_revert_delay).
    pub const DEFAULT_STATUS_REVERT_DELAY: Duration = Duration::from_secs(3);

    /// Resolve the archive filename for a job.
    ///
    /// Falls back to [`default_zip_filename`](Self::default_zip_filename)
    /// when `requested` is absent or blank, appends `.zip` when missing,
    /// and sanitizes the result.
    #[must_use]
    pub fn archive_filename(&self, requested: Option<&str>) -> String {
        let base = requested
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(self.default_zip_filename.as_str());
        let has_suffix = base
            .len()
            .checked_sub(4)
            .and_then(|at| base.get(at..))
            .is_some_and(|suffix| suffix.eq_ignore_ascii_case(".zip"));
        if has_suffix {
            sanitize::sanitize(base, self.max_name_len)
        } else {
            sanitize::sanitize(&format!("{base}.zip"), self.max_name_len)
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_name_len: Self::DEFAULT_MAX_NAME_LEN,
            default_zip_filename: Self::DEFAULT_ZIP_FILENAME.to_owned(),
            notify_timeout: Self::DEFAULT_NOTIFY_TIMEOUT,
            status_revert_delay: Self::DEFAULT_STATUS_REVERT_DELAY,
            stale_policy: StalePolicy::default(),
        }
    }
}
