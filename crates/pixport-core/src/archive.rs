//! Archive building for the bundle destination.
//!
//! [`Archiver`] is the seam the dispatcher builds archives through, so
//! tests can inject failures.  [`StoreArchiver`] is the real one: it
//! stamps every entry with the current wall-clock time and delegates to
//! [`pixport_export::build_archive`].

use pixport_export::{Archive, ArchiveError, DosDateTime, build_archive};
use time::OffsetDateTime;

use crate::types::AssetItem;

/// Source of the wall-clock time written into archive headers.
pub trait Clock {
    /// The current instant.
    fn now(&self) -> OffsetDateTime;
}

/// [`Clock`] backed by the system clock.
///
/// Uses local time where the platform can report the offset, UTC
/// otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> OffsetDateTime {
        OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc())
    }
}

/// Builds one archive over a job's items.
pub trait Archiver {
    /// Bundle `items`, in order, into a single archive.
    ///
    /// # Errors
    ///
    /// Returns an [`ArchiveError`] if the items do not fit the format.
    fn build(&self, items: &[AssetItem]) -> Result<Archive, ArchiveError>;
}

/// Store-method ZIP archiver.
#[derive(Debug, Clone, Default)]
pub struct StoreArchiver<C = SystemClock> {
    clock: C,
}

impl<C: Clock> StoreArchiver<C> {
    /// Create an archiver reading timestamps from `clock`.
    #[must_use]
    pub const fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> Archiver for StoreArchiver<C> {
    fn build(&self, items: &[AssetItem]) -> Result<Archive, ArchiveError> {
        let modified = DosDateTime::from(self.clock.now());
        build_archive(
            items.iter().map(|item| (item.name(), item.bytes())),
            modified,
        )
    }
}
