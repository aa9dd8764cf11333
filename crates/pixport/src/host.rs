//! [`Host`] backed by the local filesystem.
//!
//! Downloads land in the output directory, folder saves in `--folder`,
//! previews in the system temp directory.  There is no clipboard.

use std::fs;
use std::path::{Path, PathBuf};

use pixport_core::{
    Capability, DeveloperEvent, Directory, Host, HostError, Notification, NotificationKind,
};
use serde_json::json;
use tracing::info;

/// Filesystem host for the CLI.
#[derive(Debug, Clone)]
pub struct FsHost {
    out_dir: PathBuf,
    folder: Option<PathBuf>,
    preview_dir: PathBuf,
}

impl FsHost {
    /// Downloads go to `out_dir`; folder saves are only available when
    /// `folder` is set.
    #[must_use]
    pub fn new(out_dir: PathBuf, folder: Option<PathBuf>) -> Self {
        Self {
            out_dir,
            folder,
            preview_dir: std::env::temp_dir().join("pixport-preview"),
        }
    }

    /// Override where previews are written.
    #[must_use]
    pub fn with_preview_dir(mut self, preview_dir: PathBuf) -> Self {
        self.preview_dir = preview_dir;
        self
    }
}

/// A directory on disk, created on first use.
#[derive(Debug, Clone)]
pub struct FsDirectory {
    root: PathBuf,
}

impl Directory for FsDirectory {
    async fn write_file(&self, name: &str, bytes: &[u8]) -> Result<(), HostError> {
        write_into(&self.root, name, bytes).map(|_| ())
    }
}

impl Host for FsHost {
    type Directory = FsDirectory;

    fn supports(&self, capability: Capability) -> bool {
        match capability {
            Capability::Download | Capability::Preview => true,
            Capability::DirectoryPicker => self.folder.is_some(),
            Capability::ClipboardWrite => false,
        }
    }

    fn download(&self, name: &str, _mime: &str, bytes: &[u8]) -> Result<(), HostError> {
        let path = write_into(&self.out_dir, name, bytes)?;
        info!(path = %path.display(), size = bytes.len(), "downloaded");
        Ok(())
    }

    async fn pick_directory(&self) -> Result<FsDirectory, HostError> {
        let root = self
            .folder
            .clone()
            .ok_or(HostError::Unavailable(Capability::DirectoryPicker))?;
        Ok(FsDirectory { root })
    }

    async fn copy_to_clipboard(&self, _mime: &str, _bytes: &[u8]) -> Result<(), HostError> {
        Err(HostError::Unavailable(Capability::ClipboardWrite))
    }

    async fn open_preview(&self, name: &str, _mime: &str, bytes: &[u8]) -> Result<(), HostError> {
        let path = write_into(&self.preview_dir, name, bytes)?;
        info!(path = %path.display(), "preview written");
        eprintln!("Preview: {}", path.display());
        Ok(())
    }

    fn notify(&self, notification: &Notification<'_>) {
        let tag = match notification.kind {
            NotificationKind::Info => "info",
            NotificationKind::Success => "ok",
            NotificationKind::Error => "error",
        };
        eprintln!("[{tag}] {}", notification.message);
    }

    fn emit_developer_event(&self, event: &DeveloperEvent<'_>) {
        let summary = json!({
            "generation": event.generation,
            "items": event
                .items
                .iter()
                .map(|item| json!({"name": item.name(), "mime": item.mime(), "size": item.len()}))
                .collect::<Vec<_>>(),
            "archive_size": event.archive.map(|archive| archive.size()),
        });
        println!("{summary}");
    }
}

/// Create `dir` if needed and write `name` inside it.
fn write_into(dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf, HostError> {
    fs::create_dir_all(dir)
        .map_err(|e| HostError::Failed(format!("{}: {e}", dir.display())))?;
    let path = dir.join(name);
    fs::write(&path, bytes).map_err(|e| HostError::Failed(format!("{}: {e}", path.display())))?;
    Ok(path)
}
