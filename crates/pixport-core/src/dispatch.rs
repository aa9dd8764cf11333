//! Export dispatcher: routes one job's items to every requested
//! destination.
//!
//! Per job the status slot moves `Idle -> Preparing -> Downloading* ->
//! Complete | Error`.  Destinations run concurrently and never abort
//! each other; items within one destination run in order.  Reverting a
//! terminal status to idle is left to the host's timer (see
//! [`StatusSlot::revert_to_idle`]).

use std::cell::Cell;
use std::fmt;
use std::rc::Rc;

use futures::future::join_all;
use pixport_export::{Archive, ArchiveError, MIME_TYPE};
use tracing::{debug, info, warn};

use crate::archive::{Archiver, StoreArchiver};
use crate::host::{
    Capability, DeveloperEvent, Directory, Host, HostError, Notification, NotificationKind,
};
use crate::message::InboundMessage;
use crate::options::{DispatchConfig, ExportOptions};
use crate::payload::{self, SkippedItem};
use crate::status::StatusSlot;
use crate::types::{AssetItem, JobStatus};

/// Where a job's items can go, in priority order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    /// Write every item into a user-picked directory.
    Directory,
    /// Bundle every item into one archive download.
    Archive,
    /// Download every item separately.
    DirectDownload,
    /// Copy the first item to the clipboard.
    Clipboard,
    /// Open the first item for display.
    Preview,
}

impl Destination {
    /// Destinations requested by `options`, in priority order.
    ///
    /// Direct download is only chosen when neither directory save nor
    /// archive bundling was requested.
    #[must_use]
    pub fn selected(options: &ExportOptions) -> Vec<Self> {
        let mut destinations = Vec::new();
        if options.save_to_folder {
            destinations.push(Self::Directory);
        }
        if options.batch_zip {
            destinations.push(Self::Archive);
        }
        if options.wants_direct_download() {
            destinations.push(Self::DirectDownload);
        }
        if options.clipboard {
            destinations.push(Self::Clipboard);
        }
        if options.open_in_new_tab {
            destinations.push(Self::Preview);
        }
        destinations
    }

    /// Host capability without which this destination cannot run.
    #[must_use]
    pub const fn required_capability(self) -> Capability {
        match self {
            Self::Directory => Capability::DirectoryPicker,
            Self::Archive | Self::DirectDownload => Capability::Download,
            Self::Clipboard => Capability::ClipboardWrite,
            Self::Preview => Capability::Preview,
        }
    }

    /// Failures of best-effort destinations are logged but not shown.
    #[must_use]
    pub const fn is_best_effort(self) -> bool {
        matches!(self, Self::Preview)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Directory => "folder save",
            Self::Archive => "zip download",
            Self::DirectDownload => "download",
            Self::Clipboard => "clipboard",
            Self::Preview => "preview",
        })
    }
}

/// Why a destination, or one item within it, failed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DestinationError {
    /// The host lacks the capability the destination needs.
    #[error("{destination}: {capability} is not available")]
    CapabilityUnavailable {
        /// Destination that was skipped.
        destination: Destination,
        /// Missing capability.
        capability: Capability,
    },

    /// One item could not be written; the rest continued.
    #[error("could not write {name}: {source}")]
    WriteFailure {
        /// Sanitized item or archive name.
        name: String,
        /// Host failure.
        source: HostError,
    },

    /// The archive could not be built.
    #[error("could not build archive: {0}")]
    ArchiveBuild(#[from] ArchiveError),

    /// The destination failed as a whole.
    #[error("{destination} failed: {source}")]
    Failed {
        /// Destination that failed.
        destination: Destination,
        /// Host failure.
        source: HostError,
    },
}

/// Outcome of one destination.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DestinationReport {
    /// Which destination this is.
    pub destination: Destination,
    /// Files (or archives) successfully delivered.
    pub completed: usize,
    /// Every failure, in the order it happened.
    pub errors: Vec<DestinationError>,
    /// The archive failed and items were downloaded individually.
    pub fell_back: bool,
    /// Summary shown to the user.
    pub message: String,
}

impl DestinationReport {
    fn new(destination: Destination) -> Self {
        Self {
            destination,
            completed: 0,
            errors: Vec::new(),
            fell_back: false,
            message: String::new(),
        }
    }

    /// `true` when nothing went wrong.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Outcome of one inbound message.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    /// Generation stamped on the job.
    pub generation: u64,
    /// Producer-side error that short-circuited the job.
    pub rejected: Option<String>,
    /// Items that failed to decode.
    pub skipped: Vec<SkippedItem>,
    /// One report per destination that ran, in priority order.
    pub destinations: Vec<DestinationReport>,
}

impl DispatchReport {
    /// `true` when the job was accepted and at least one destination
    /// succeeded.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.rejected.is_none() && self.destinations.iter().any(DestinationReport::is_success)
    }
}

/// Decoded items and flags for one job.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportJob {
    /// Items in inbound order.
    pub items: Vec<AssetItem>,
    /// Destination flags.
    pub options: ExportOptions,
}

struct Outcome {
    report: DestinationReport,
    archive: Option<Archive>,
}

impl From<DestinationReport> for Outcome {
    fn from(report: DestinationReport) -> Self {
        Self {
            report,
            archive: None,
        }
    }
}

/// Per-destination progress, never moving backwards.
struct Progress<'a> {
    slot: &'a StatusSlot,
    generation: u64,
    total: usize,
    high_water: Cell<f32>,
}

impl<'a> Progress<'a> {
    const fn new(slot: &'a StatusSlot, generation: u64, total: usize) -> Self {
        Self {
            slot,
            generation,
            total,
            high_water: Cell::new(0.0),
        }
    }

    fn step(&self, item_index: usize, done: usize, text: String) {
        let progress = fraction(done, self.total).max(self.high_water.get());
        self.high_water.set(progress);
        self.slot.set(
            self.generation,
            JobStatus::Downloading {
                item_index,
                progress,
                text,
            },
        );
    }
}

#[allow(clippy::cast_precision_loss)]
fn fraction(done: usize, total: usize) -> f32 {
    if total == 0 {
        1.0
    } else {
        (done as f32 / total as f32).clamp(0.0, 1.0)
    }
}

/// Routes decoded items to the destinations a job asks for.
pub struct Dispatcher<H, A = StoreArchiver> {
    host: H,
    archiver: A,
    config: DispatchConfig,
    status: Rc<StatusSlot>,
}

impl<H: Host> Dispatcher<H> {
    /// Create a dispatcher using the system-clock archiver.
    #[must_use]
    pub fn new(host: H, config: DispatchConfig) -> Self {
        Self::with_archiver(host, config, StoreArchiver::default())
    }
}

#[allow(clippy::future_not_send)]
impl<H: Host, A: Archiver> Dispatcher<H, A> {
    /// Create a dispatcher with a custom archiver.
    #[must_use]
    pub fn with_archiver(host: H, config: DispatchConfig, archiver: A) -> Self {
        let status = Rc::new(StatusSlot::new(config.stale_policy));
        Self {
            host,
            archiver,
            config,
            status,
        }
    }

    /// The host this dispatcher drives.
    #[must_use]
    pub const fn host(&self) -> &H {
        &self.host
    }

    /// Active configuration.
    #[must_use]
    pub const fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// The shared status slot.
    #[must_use]
    pub const fn status(&self) -> &Rc<StatusSlot> {
        &self.status
    }

    /// Decode `message` and run every destination it asks for.
    ///
    /// A producer-side `error` short-circuits to an `Error` status.  A
    /// message with no items is a no-op that leaves the status idle.
    pub async fn handle_message(&self, message: &InboundMessage) -> DispatchReport {
        let generation = self.status.begin_job();

        if let Some(error) = message.error_text() {
            warn!(generation, %error, "producer reported an error");
            let text = format!("Export failed: {error}");
            self.status
                .set(generation, JobStatus::Error { text: text.clone() });
            self.notify(NotificationKind::Error, &text, None);
            return DispatchReport {
                generation,
                rejected: Some(error),
                ..DispatchReport::default()
            };
        }

        let batch = payload::decode_message(message, self.config.max_name_len);
        for skipped in &batch.skipped {
            warn!(index = skipped.index, label = %skipped.label, error = %skipped.error, "skipping item");
            self.notify(
                NotificationKind::Error,
                &format!("Skipped {}: {}", skipped.label, skipped.error),
                None,
            );
        }

        if batch.items.is_empty() {
            if batch.skipped.is_empty() {
                info!(generation, shape = ?batch.shape, "message carries no items; nothing to export");
            } else {
                self.status.set(
                    generation,
                    JobStatus::Error {
                        text: "No files could be decoded".to_owned(),
                    },
                );
            }
            return DispatchReport {
                generation,
                skipped: batch.skipped,
                ..DispatchReport::default()
            };
        }

        let job = ExportJob {
            items: batch.items,
            options: batch.options,
        };
        let destinations = self.dispatch(generation, &job).await;
        DispatchReport {
            generation,
            rejected: None,
            skipped: batch.skipped,
            destinations,
        }
    }

    /// Run every destination `job` asks for and publish the final status.
    ///
    /// `generation` should come from [`StatusSlot::begin_job`].
    pub async fn dispatch(&self, generation: u64, job: &ExportJob) -> Vec<DestinationReport> {
        self.status.set(generation, JobStatus::Preparing);
        let destinations = Destination::selected(&job.options);
        debug!(generation, ?destinations, items = job.items.len(), "dispatching job");

        let outcomes = join_all(
            destinations
                .iter()
                .map(|&destination| self.run(destination, generation, job)),
        )
        .await;

        if job.options.developer_emit {
            self.emit_developer_event(generation, &job.items, &outcomes);
        }

        let reports: Vec<DestinationReport> =
            outcomes.into_iter().map(|outcome| outcome.report).collect();
        self.status.set(generation, final_status(&reports));
        reports
    }

    async fn run(&self, destination: Destination, generation: u64, job: &ExportJob) -> Outcome {
        let capability = destination.required_capability();
        if !self.host.supports(capability) {
            let mut report = DestinationReport::new(destination);
            let error = DestinationError::CapabilityUnavailable {
                destination,
                capability,
            };
            report.message = format!("Cannot use {destination}: {capability} is not available");
            self.report_failure(destination, &report.message);
            report.errors.push(error);
            return report.into();
        }

        let items = job.items.as_slice();
        let thumbnail = items.first().filter(|_| job.options.notify_thumbnails);
        let outcome: Outcome = match destination {
            Destination::Directory => self.save_to_directory(generation, items).await.into(),
            Destination::Archive => {
                self.save_archive(generation, items, job.options.zip_filename.as_deref())
            }
            Destination::DirectDownload => self.download_each(generation, items).into(),
            Destination::Clipboard => self.copy_first(items).await.into(),
            Destination::Preview => self.preview_first(items).await.into(),
        };

        if outcome.report.is_success() {
            info!(generation, %destination, completed = outcome.report.completed, "destination finished");
            self.notify(NotificationKind::Success, &outcome.report.message, thumbnail);
        } else {
            info!(generation, %destination, errors = outcome.report.errors.len(), "destination finished with errors");
            self.report_failure(destination, &outcome.report.message);
        }
        outcome
    }

    async fn save_to_directory(&self, generation: u64, items: &[AssetItem]) -> DestinationReport {
        let mut report = DestinationReport::new(Destination::Directory);
        let directory = match self.host.pick_directory().await {
            Ok(directory) => directory,
            Err(source) => {
                warn!(%source, "no directory to save into");
                report.message = format!("Folder save failed: {source}");
                report.errors.push(DestinationError::Failed {
                    destination: Destination::Directory,
                    source,
                });
                return report;
            }
        };

        let progress = Progress::new(&self.status, generation, items.len());
        let total = items.len();
        for (index, item) in items.iter().enumerate() {
            progress.step(index, index, format!("Saving {} ({}/{total})", item.name(), index + 1));
            match directory.write_file(item.name(), item.bytes()).await {
                Ok(()) => {
                    debug!(name = item.name(), size = item.len(), "saved to folder");
                    report.completed += 1;
                }
                Err(source) => {
                    warn!(name = item.name(), %source, "folder write failed");
                    report.errors.push(DestinationError::WriteFailure {
                        name: item.name().to_owned(),
                        source,
                    });
                }
            }
            progress.step(index, index + 1, format!("Saved {}/{total}", index + 1));
        }

        report.message = if report.errors.is_empty() {
            format!("Saved {total} file(s) to folder")
        } else {
            format!(
                "Saved {} of {total} file(s) to folder; failed: {}",
                report.completed,
                failed_names(&report.errors)
            )
        };
        report
    }

    fn save_archive(
        &self,
        generation: u64,
        items: &[AssetItem],
        requested_name: Option<&str>,
    ) -> Outcome {
        let mut report = DestinationReport::new(Destination::Archive);
        let filename = self.config.archive_filename(requested_name);
        let progress = Progress::new(&self.status, generation, 1);
        progress.step(0, 0, format!("Building {filename}"));

        let archive = match self.archiver.build(items) {
            Ok(archive) => archive,
            Err(error) => {
                warn!(%filename, %error, "archive build failed; downloading files individually");
                report.errors.push(error.into());
                self.fall_back(generation, items, &filename, &mut report);
                return report.into();
            }
        };

        match self.host.download(&filename, MIME_TYPE, archive.as_bytes()) {
            Ok(()) => {
                debug!(%filename, size = archive.size(), "archive saved");
                progress.step(0, 1, format!("Saved {filename}"));
                report.completed = 1;
                report.message = format!("Saved {filename} ({} file(s))", items.len());
            }
            Err(source) => {
                warn!(%filename, %source, "archive save failed; downloading files individually");
                report.errors.push(DestinationError::WriteFailure {
                    name: filename.clone(),
                    source,
                });
                self.fall_back(generation, items, &filename, &mut report);
            }
        }
        Outcome {
            report,
            archive: Some(archive),
        }
    }

    fn fall_back(
        &self,
        generation: u64,
        items: &[AssetItem],
        filename: &str,
        report: &mut DestinationReport,
    ) {
        report.fell_back = true;
        let downloads = self.download_each(generation, items);
        report.completed = downloads.completed;
        report.errors.extend(downloads.errors);
        report.message = format!(
            "Could not save {filename}; downloaded {} of {} file(s) individually",
            report.completed,
            items.len()
        );
    }

    fn download_each(&self, generation: u64, items: &[AssetItem]) -> DestinationReport {
        let mut report = DestinationReport::new(Destination::DirectDownload);
        let progress = Progress::new(&self.status, generation, items.len());
        let total = items.len();
        for (index, item) in items.iter().enumerate() {
            progress.step(
                index,
                index,
                format!("Downloading {} ({}/{total})", item.name(), index + 1),
            );
            match self.host.download(item.name(), item.mime(), item.bytes()) {
                Ok(()) => {
                    debug!(name = item.name(), size = item.len(), "downloaded");
                    report.completed += 1;
                }
                Err(source) => {
                    warn!(name = item.name(), %source, "download failed");
                    self.notify(
                        NotificationKind::Error,
                        &format!("Failed to download {}: {source}", item.name()),
                        None,
                    );
                    report.errors.push(DestinationError::WriteFailure {
                        name: item.name().to_owned(),
                        source,
                    });
                }
            }
            progress.step(index, index + 1, format!("Downloaded {}/{total}", index + 1));
        }
        report.message = format!("Downloaded {} file(s)", report.completed);
        report
    }

    async fn copy_first(&self, items: &[AssetItem]) -> DestinationReport {
        let mut report = DestinationReport::new(Destination::Clipboard);
        let Some(item) = items.first() else {
            return report;
        };
        match self.host.copy_to_clipboard(item.mime(), item.bytes()).await {
            Ok(()) => {
                report.completed = 1;
                report.message = format!("Copied {} to clipboard", item.name());
            }
            Err(source) => {
                warn!(name = item.name(), %source, "clipboard write failed");
                report.message = format!("Could not copy {} to clipboard: {source}", item.name());
                report.errors.push(DestinationError::Failed {
                    destination: Destination::Clipboard,
                    source,
                });
            }
        }
        report
    }

    async fn preview_first(&self, items: &[AssetItem]) -> DestinationReport {
        let mut report = DestinationReport::new(Destination::Preview);
        let Some(item) = items.first() else {
            return report;
        };
        match self
            .host
            .open_preview(item.name(), item.mime(), item.bytes())
            .await
        {
            Ok(()) => {
                report.completed = 1;
                report.message = format!("Opened {}", item.name());
            }
            Err(source) => {
                report.message = format!("Could not open {}: {source}", item.name());
                report.errors.push(DestinationError::Failed {
                    destination: Destination::Preview,
                    source,
                });
            }
        }
        report
    }

    fn emit_developer_event(&self, generation: u64, items: &[AssetItem], outcomes: &[Outcome]) {
        let built;
        let archive = match outcomes.iter().find_map(|outcome| outcome.archive.as_ref()) {
            Some(archive) => Some(archive),
            None => {
                built = self
                    .archiver
                    .build(items)
                    .inspect_err(|error| warn!(%error, "no archive for developer event"))
                    .ok();
                built.as_ref()
            }
        };
        debug!(generation, items = items.len(), archive = archive.is_some(), "emitting developer event");
        self.host.emit_developer_event(&DeveloperEvent {
            generation,
            items,
            archive,
        });
    }

    fn report_failure(&self, destination: Destination, message: &str) {
        if destination.is_best_effort() {
            warn!(%destination, message, "best-effort destination failed");
        } else {
            self.notify(NotificationKind::Error, message, None);
        }
    }

    fn notify(&self, kind: NotificationKind, message: &str, thumbnail: Option<&AssetItem>) {
        self.host.notify(&Notification {
            kind,
            message,
            timeout: self.config.notify_timeout,
            thumbnail,
        });
    }
}

impl<H, A> fmt::Debug for Dispatcher<H, A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("config", &self.config)
            .field("status", &self.status)
            .finish_non_exhaustive()
    }
}

/// `Complete` when any destination succeeded, else `Error`.
fn final_status(reports: &[DestinationReport]) -> JobStatus {
    let summary = reports
        .iter()
        .map(|report| report.message.as_str())
        .filter(|message| !message.is_empty())
        .collect::<Vec<_>>()
        .join("; ");
    if reports.iter().any(DestinationReport::is_success) {
        JobStatus::Complete { text: summary }
    } else if reports.is_empty() {
        JobStatus::Complete {
            text: "Nothing to do".to_owned(),
        }
    } else {
        JobStatus::Error { text: summary }
    }
}

fn failed_names(errors: &[DestinationError]) -> String {
    errors
        .iter()
        .filter_map(|error| match error {
            DestinationError::WriteFailure { name, .. } => Some(name.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join(", ")
}
