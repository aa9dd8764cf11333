//! File download via Blob URLs.
//!
//! Triggers downloads by creating a `Blob`, generating an object URL,
//! and programmatically clicking a temporary `<a>` element.
//!
//! All functions in this module require a browser environment
//! (`wasm32-unknown-unknown` target).

use wasm_bindgen::JsCast;
use web_sys::{Blob, BlobPropertyBag};

use crate::error::BrowserError;
use crate::js;

/// Wrap `bytes` in a `Blob` of type `mime`.
///
/// # Errors
///
/// Returns [`BrowserError::JsError`] if the `Blob` constructor throws.
pub fn bytes_to_blob(bytes: &[u8], mime: &str) -> Result<Blob, BrowserError> {
    let parts = js_sys::Array::new();
    parts.push(&js_sys::Uint8Array::from(bytes));

    let opts = BlobPropertyBag::new();
    opts.set_type(mime);

    Ok(Blob::new_with_u8_array_sequence_and_options(&parts, &opts)?)
}

/// Object URL for `bytes`.  The caller owns the URL and must revoke it.
///
/// # Errors
///
/// Returns [`BrowserError::JsError`] if the `Blob` or URL cannot be
/// created.
pub fn object_url(bytes: &[u8], mime: &str) -> Result<String, BrowserError> {
    let blob = bytes_to_blob(bytes, mime)?;
    Ok(web_sys::Url::create_object_url_with_blob(&blob)?)
}

/// Trigger a file download in the browser.
///
/// Creates a `Blob` from `bytes`, generates an object URL, and
/// programmatically clicks a temporary `<a download="filename">`
/// element.  The object URL is revoked after the click.
///
/// # Errors
///
/// Returns [`BrowserError`] if any browser API call fails (e.g.,
/// `Blob` creation, `URL.createObjectURL`, element creation).
pub fn trigger_download(bytes: &[u8], filename: &str, mime: &str) -> Result<(), BrowserError> {
    let document = js::window()?
        .document()
        .ok_or(BrowserError::Missing("document"))?;

    let url = object_url(bytes, mime)?;

    let anchor: web_sys::HtmlAnchorElement = document
        .create_element("a")?
        .dyn_into::<web_sys::HtmlAnchorElement>()
        .map_err(|e| BrowserError::JsError(format!("failed to cast element: {e:?}")))?;

    anchor.set_href(&url);
    anchor.set_download(filename);

    let body = document.body().ok_or(BrowserError::Missing("document body"))?;
    body.append_child(&anchor)?;
    anchor.click();

    // The download is already initiated; cleanup failures are not
    // download failures.
    let _ = body.remove_child(&anchor);
    let _ = web_sys::Url::revoke_object_url(&url);

    Ok(())
}
