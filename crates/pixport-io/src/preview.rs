//! Open a file in a new browser tab.

use std::time::Duration;

use gloo_timers::callback::Timeout;

use crate::download::object_url;
use crate::error::BrowserError;
use crate::js;

/// How long the object URL outlives the `window.open` call.
const REVOKE_AFTER: Duration = Duration::from_secs(60);

/// Open `bytes` as `mime` in a new tab.
///
/// The object URL is revoked after [`REVOKE_AFTER`], long enough for
/// the new tab to load it.
///
/// # Errors
///
/// Returns [`BrowserError::JsError`] if the URL cannot be created and
/// [`BrowserError::Missing`] if the popup was blocked.
pub fn open(bytes: &[u8], mime: &str) -> Result<(), BrowserError> {
    let window = js::window()?;
    let url = object_url(bytes, mime)?;
    let opened = window.open_with_url_and_target(&url, "_blank");

    let millis = u32::try_from(REVOKE_AFTER.as_millis()).unwrap_or(u32::MAX);
    Timeout::new(millis, move || {
        let _ = web_sys::Url::revoke_object_url(&url);
    })
    .forget();

    match opened? {
        Some(_) => Ok(()),
        None => Err(BrowserError::Missing("popup window")),
    }
}
