//! Folder writes via the File System Access API.
//!
//! `showDirectoryPicker()` yields a directory handle; each file is
//! written with `getFileHandle(name, {create: true})`, then
//! `createWritable()`, `write(blob)`, `close()`.  Existing files are
//! overwritten.  A failed write aborts the stream instead, which drops
//! its swap file and leaves the previous contents in place.
//! Chromium-only at the time of writing.

use std::future::Future;

use pixport_core::{Directory, HostError};
use wasm_bindgen::JsValue;

use crate::download::bytes_to_blob;
use crate::error::BrowserError;
use crate::js;

/// Whether `window.showDirectoryPicker` exists.
#[must_use]
pub fn is_supported() -> bool {
    js::window().is_ok_and(|window| js::has(&window, "showDirectoryPicker"))
}

/// Ask the user for a writable directory.
///
/// # Errors
///
/// Returns [`BrowserError::Cancelled`] if the user dismisses the
/// picker, [`BrowserError::Missing`] if the API does not exist.
#[allow(clippy::future_not_send)] // WASM is single-threaded; JsValue is !Send
pub async fn pick() -> Result<BrowserDirectory, BrowserError> {
    let window = js::window()?;
    let options = js::object(&[("mode", JsValue::from_str("readwrite"))])?;
    let handle = js::call_async(&window, "showDirectoryPicker", &[options.into()]).await?;
    Ok(BrowserDirectory { handle })
}

/// A `FileSystemDirectoryHandle`.
#[derive(Debug, Clone)]
pub struct BrowserDirectory {
    handle: JsValue,
}

impl BrowserDirectory {
    /// Create or overwrite `name` with `bytes`.
    ///
    /// # Errors
    ///
    /// Returns [`BrowserError`] if any step of the write fails.
    #[allow(clippy::future_not_send)] // WASM is single-threaded; JsValue is !Send
    pub async fn write(&self, name: &str, bytes: &[u8]) -> Result<(), BrowserError> {
        let create = js::object(&[("create", JsValue::TRUE)])?;
        let file = js::call_async(
            &self.handle,
            "getFileHandle",
            &[JsValue::from_str(name), create.into()],
        )
        .await?;
        let writable = js::call_async(&file, "createWritable", &[]).await?;
        let written = async {
            let blob = bytes_to_blob(bytes, "application/octet-stream")?;
            js::call_async(&writable, "write", &[blob.into()]).await
        }
        .await;
        settle(
            written,
            || async { js::call_async(&writable, "close", &[]).await },
            || async { js::call_async(&writable, "abort", &[]).await },
        )
        .await
    }
}

/// Finish a writable stream: `close` after a successful write, `abort`
/// after a failed one.  A failed write is reported even if the abort
/// also fails.
#[allow(clippy::future_not_send)]
async fn settle<T, C, A, CF, AF, CT, AT>(
    written: Result<T, BrowserError>,
    close: C,
    abort: A,
) -> Result<(), BrowserError>
where
    C: FnOnce() -> CF,
    A: FnOnce() -> AF,
    CF: Future<Output = Result<CT, BrowserError>>,
    AF: Future<Output = Result<AT, BrowserError>>,
{
    match written {
        Ok(_) => close().await.map(drop),
        Err(error) => {
            if let Err(abort_error) = abort().await {
                tracing::warn!(%abort_error, "could not abort writable stream");
            }
            Err(error)
        }
    }
}

#[allow(clippy::future_not_send)]
impl Directory for BrowserDirectory {
    async fn write_file(&self, name: &str, bytes: &[u8]) -> Result<(), HostError> {
        Ok(self.write(name, bytes).await?)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;

    use futures::executor::block_on;

    use super::*;

    fn step<'a>(
        log: &'a RefCell<Vec<&'static str>>,
        name: &'static str,
        result: Result<(), BrowserError>,
    ) -> impl FnOnce() -> std::future::Ready<Result<(), BrowserError>> + 'a {
        move || {
            log.borrow_mut().push(name);
            std::future::ready(result)
        }
    }

    #[test]
    fn successful_write_is_closed() {
        let log = RefCell::new(Vec::new());
        let result = block_on(settle(
            Ok(()),
            step(&log, "close", Ok(())),
            step(&log, "abort", Ok(())),
        ));
        assert!(result.is_ok());
        assert_eq!(*log.borrow(), ["close"]);
    }

    #[test]
    fn failed_write_is_aborted() {
        let log = RefCell::new(Vec::new());
        let result = block_on(settle(
            Err::<(), _>(BrowserError::JsError("QuotaExceededError".into())),
            step(&log, "close", Ok(())),
            step(&log, "abort", Ok(())),
        ));
        assert!(matches!(result, Err(BrowserError::JsError(ref m)) if m == "QuotaExceededError"));
        assert_eq!(*log.borrow(), ["abort"]);
    }

    #[test]
    fn write_error_outlives_abort_error() {
        let log = RefCell::new(Vec::new());
        let result = block_on(settle(
            Err::<(), _>(BrowserError::Cancelled),
            step(&log, "close", Ok(())),
            step(&log, "abort", Err(BrowserError::Missing("abort"))),
        ));
        assert!(matches!(result, Err(BrowserError::Cancelled)));
        assert_eq!(*log.borrow(), ["abort"]);
    }

    #[test]
    fn close_failure_is_reported() {
        let log = RefCell::new(Vec::new());
        let result = block_on(settle(
            Ok(()),
            step(&log, "close", Err(BrowserError::Missing("close"))),
            step(&log, "abort", Ok(())),
        ));
        assert!(matches!(result, Err(BrowserError::Missing("close"))));
        assert_eq!(*log.borrow(), ["close"]);
    }
}
