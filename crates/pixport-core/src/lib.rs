//! pixport-core: Image export dispatch (sans-IO).
//!
//! Turns an inbound job message (base64 data URIs plus destination
//! flags) into files delivered to any combination of destinations:
//! a user-picked folder, one ZIP download, per-file downloads, the
//! clipboard, and a preview.
//!
//! This crate has **no I/O dependencies**.  Everything that touches the
//! outside world goes through the [`Host`] trait; `pixport-io`
//! implements it for the browser and the `pixport` CLI for the local
//! filesystem.
//!
//! # Flow
//!
//! 1. [`InboundMessage`] is parsed from JSON.
//! 2. [`payload::decode_message`] turns each item into an [`AssetItem`]
//!    with a [sanitized](sanitize::sanitize) name, skipping bad items.
//! 3. [`Dispatcher::handle_message`] runs every requested
//!    [`Destination`] concurrently, publishing progress through the
//!    shared [`StatusSlot`].

pub mod archive;
pub mod dispatch;
pub mod extension;
pub mod host;
pub mod message;
pub mod options;
pub mod payload;
pub mod sanitize;
pub mod status;
pub mod types;

pub use archive::{Archiver, Clock, StoreArchiver, SystemClock};
pub use dispatch::{
    Destination, DestinationError, DestinationReport, DispatchReport, Dispatcher, ExportJob,
};
pub use extension::ExportExtension;
pub use host::{
    Capability, DeveloperEvent, Directory, Host, HostError, Notification, NotificationKind,
};
pub use message::{InboundMessage, ItemShape};
pub use options::{DispatchConfig, ExportOptions, StalePolicy};
pub use payload::{DecodedBatch, RawItem, SkippedItem};
pub use sanitize::sanitize;
pub use status::StatusSlot;
pub use types::{AssetItem, DecodeError, JobStatus};
