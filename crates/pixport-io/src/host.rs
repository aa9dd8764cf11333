//! [`Host`] implementation for the browser main thread.

use pixport_core::{Capability, DeveloperEvent, Host, HostError, Notification};
use tracing::warn;

use crate::directory::{self, BrowserDirectory};
use crate::{clipboard, download, event, js, notify, preview};

/// Browser host: Blob downloads, File System Access folder writes,
/// async clipboard, `window.open` preview.
#[derive(Debug, Clone, Copy, Default)]
pub struct BrowserHost;

impl BrowserHost {
    /// Create the host.  Capabilities are probed on every call, so a
    /// polyfill installed later is picked up.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[allow(clippy::future_not_send)] // WASM is single-threaded; JsValue is !Send
impl Host for BrowserHost {
    type Directory = BrowserDirectory;

    fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Download | Capability::Preview => {
                js::window().is_ok_and(|window| window.document().is_some())
            }
            Capability::DirectoryPicker => directory::is_supported(),
            Capability::ClipboardWrite => clipboard::is_supported(),
        }
    }

    fn download(&self, name: &str, mime: &str, bytes: &[u8]) -> Result<(), HostError> {
        Ok(download::trigger_download(bytes, name, mime)?)
    }

    async fn pick_directory(&self) -> Result<BrowserDirectory, HostError> {
        Ok(directory::pick().await?)
    }

    async fn copy_to_clipboard(&self, mime: &str, bytes: &[u8]) -> Result<(), HostError> {
        Ok(clipboard::write_bytes(mime, bytes).await?)
    }

    async fn open_preview(&self, _name: &str, mime: &str, bytes: &[u8]) -> Result<(), HostError> {
        Ok(preview::open(bytes, mime)?)
    }

    fn notify(&self, notification: &Notification<'_>) {
        notify::show(notification);
    }

    fn emit_developer_event(&self, event: &DeveloperEvent<'_>) {
        if let Err(error) = event::dispatch(event) {
            warn!(%error, "could not dispatch developer event");
        }
    }
}
