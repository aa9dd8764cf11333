//! Binary clipboard writes via the async Clipboard API.
//!
//! `navigator.clipboard.write([new ClipboardItem({[mime]: blob})])`.
//! Requires a secure context and, in most browsers, a user gesture.
//! Browsers generally accept only `image/png` for image data.

use js_sys::{Array, Function, Reflect};
use wasm_bindgen::JsCast;

use crate::download::bytes_to_blob;
use crate::error::BrowserError;
use crate::js;

/// Whether both `navigator.clipboard.write` and `ClipboardItem` exist.
#[must_use]
pub fn is_supported() -> bool {
    let Ok(window) = js::window() else {
        return false;
    };
    let has_item = js::has(&window, "ClipboardItem");
    let has_write = js::property(&window.navigator(), "clipboard")
        .is_some_and(|clipboard| js::has(&clipboard, "write"));
    has_item && has_write
}

/// Put `bytes` on the clipboard as `mime`.
///
/// # Errors
///
/// Returns [`BrowserError::Missing`] if the Clipboard API is absent and
/// [`BrowserError::JsError`] if the browser rejects the write (e.g.,
/// no permission or unsupported type).
#[allow(clippy::future_not_send)] // WASM is single-threaded; JsValue is !Send
pub async fn write_bytes(mime: &str, bytes: &[u8]) -> Result<(), BrowserError> {
    let window = js::window()?;
    let clipboard =
        js::property(&window.navigator(), "clipboard").ok_or(BrowserError::Missing("clipboard"))?;
    let item_ctor: Function = js::property(&window, "ClipboardItem")
        .ok_or(BrowserError::Missing("ClipboardItem"))?
        .dyn_into()
        .map_err(|_| BrowserError::Missing("ClipboardItem"))?;

    let blob = bytes_to_blob(bytes, mime)?;
    let data = js::object(&[(mime, blob.into())])?;
    let item = Reflect::construct(&item_ctor, &Array::of1(&data))?;

    js::call_async(&clipboard, "write", &[Array::of1(&item).into()]).await?;
    Ok(())
}

