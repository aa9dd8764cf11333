//! Boundary between the dispatcher and the environment it runs in.
//!
//! The core never touches the browser or the filesystem directly.  Each
//! destination is expressed in terms of a few host primitives, and
//! whether a primitive exists at all is asked up front through
//! [`Host::supports`].

use std::fmt;
use std::time::Duration;

use pixport_export::Archive;

use crate::types::AssetItem;

/// A host primitive that may or may not be available.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Save a byte blob as a user download.
    Download,
    /// Ask the user for a writable directory.
    DirectoryPicker,
    /// Put binary data on the system clipboard.
    ClipboardWrite,
    /// Open a file for display.
    Preview,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Download => "download",
            Self::DirectoryPicker => "directory picker",
            Self::ClipboardWrite => "clipboard write",
            Self::Preview => "preview",
        })
    }
}

/// Failure of a single host primitive.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostError {
    /// The primitive does not exist in this host.
    #[error("{0} is not available")]
    Unavailable(Capability),

    /// The user dismissed a prompt.
    #[error("cancelled by the user")]
    Cancelled,

    /// Anything else, with the host's description.
    #[error("{0}")]
    Failed(String),
}

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    /// Neutral information.
    Info,
    /// A destination completed.
    Success,
    /// Something the user asked for did not happen.
    Error,
}

/// A transient message for the user.
#[derive(Debug, Clone, Copy)]
pub struct Notification<'a> {
    /// Severity.
    pub kind: NotificationKind,
    /// Message text, naming the file or destination involved.
    pub message: &'a str,
    /// How long the host should keep it visible.
    pub timeout: Duration,
    /// Item to render as a thumbnail, for hosts that can.
    pub thumbnail: Option<&'a AssetItem>,
}

/// Payload of the developer event emitted after a job.
#[derive(Debug, Clone, Copy)]
pub struct DeveloperEvent<'a> {
    /// Generation of the job that produced this event.
    pub generation: u64,
    /// Every decoded item, in inbound order.
    pub items: &'a [AssetItem],
    /// An archive of `items`, when one could be built.
    pub archive: Option<&'a Archive>,
}

/// A writable directory obtained from [`Host::pick_directory`].
#[allow(async_fn_in_trait)]
pub trait Directory {
    /// Create `name` or overwrite it, writing `bytes` in full.
    ///
    /// # Errors
    ///
    /// Returns a [`HostError`] if the file could not be written.
    async fn write_file(&self, name: &str, bytes: &[u8]) -> Result<(), HostError>;
}

/// The environment the dispatcher runs in.
///
/// Futures returned by the async methods are `!Send`: browser hosts
/// hold JavaScript handles across suspension points.
#[allow(async_fn_in_trait)]
pub trait Host {
    /// Directory handle type returned by [`pick_directory`](Self::pick_directory).
    type Directory: Directory;

    /// Whether `capability` is present in this host.
    fn supports(&self, capability: Capability) -> bool;

    /// Offer `bytes` to the user as a download named `name`.
    ///
    /// # Errors
    ///
    /// Returns a [`HostError`] if the download could not be started.
    fn download(&self, name: &str, mime: &str, bytes: &[u8]) -> Result<(), HostError>;

    /// Ask the user for a writable directory.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::Cancelled`] when the user dismisses the
    /// prompt, or another [`HostError`] if no directory was obtained.
    async fn pick_directory(&self) -> Result<Self::Directory, HostError>;

    /// Put `bytes` on the clipboard as `mime`.
    ///
    /// # Errors
    ///
    /// Returns a [`HostError`] if the clipboard rejected the write.
    async fn copy_to_clipboard(&self, mime: &str, bytes: &[u8]) -> Result<(), HostError>;

    /// Open `bytes` for display.
    ///
    /// # Errors
    ///
    /// Returns a [`HostError`] if nothing could be opened.
    async fn open_preview(&self, name: &str, mime: &str, bytes: &[u8]) -> Result<(), HostError>;

    /// Show a transient message to the user.
    fn notify(&self, notification: &Notification<'_>);

    /// Publish the decoded items for developer tooling.
    ///
    /// Hosts without an event channel ignore it.
    fn emit_developer_event(&self, event: &DeveloperEvent<'_>) {
        let _ = event;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_error_messages_name_the_capability() {
        assert_eq!(
            HostError::Unavailable(Capability::ClipboardWrite).to_string(),
            "clipboard write is not available"
        );
        assert_eq!(HostError::Cancelled.to_string(), "cancelled by the user");
        assert_eq!(HostError::Failed("quota exceeded".into()).to_string(), "quota exceeded");
    }
}
