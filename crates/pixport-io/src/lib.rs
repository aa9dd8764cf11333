//! pixport-io: Browser host for the pixport dispatcher.
//!
//! Implements [`pixport_core::Host`] with browser APIs: Blob downloads,
//! File System Access folder writes, async clipboard, preview tabs,
//! page notifications, and a `CustomEvent` for developer tooling.
//!
//! APIs that `web-sys` does not bind are reached through
//! `js_sys::Reflect`, so their absence is detected rather than thrown.

pub mod clipboard;
pub mod directory;
pub mod download;
pub mod error;
pub mod event;
pub mod host;
mod js;
pub mod notify;
pub mod preview;
pub mod progress;

pub use directory::BrowserDirectory;
pub use error::BrowserError;
pub use host::BrowserHost;
pub use progress::schedule_idle_revert;
