//! Small helpers for APIs `web-sys` does not bind (or binds only behind
//! unstable flags): File System Access, `ClipboardItem`, host globals.
//!
//! Everything goes through `Reflect`, so a missing API shows up as
//! [`BrowserError::Missing`] instead of a thrown `TypeError`.

use js_sys::{Array, Function, Object, Promise, Reflect};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;

use crate::error::BrowserError;

/// The global `window`.
pub fn window() -> Result<web_sys::Window, BrowserError> {
    web_sys::window().ok_or(BrowserError::Missing("window"))
}

/// `target[name]`, or `None` when absent.
pub fn property(target: &JsValue, name: &str) -> Option<JsValue> {
    Reflect::get(target, &JsValue::from_str(name))
        .ok()
        .filter(|value| !value.is_undefined() && !value.is_null())
}

/// Whether `target[name]` exists.
pub fn has(target: &JsValue, name: &str) -> bool {
    property(target, name).is_some()
}

/// Call `target[name](...args)`.
pub fn call(target: &JsValue, name: &'static str, args: &[JsValue]) -> Result<JsValue, BrowserError> {
    let method: Function = property(target, name)
        .ok_or(BrowserError::Missing(name))?
        .dyn_into()
        .map_err(|_| BrowserError::Missing(name))?;
    let args: Array = args.iter().collect();
    Ok(method.apply(target, &args)?)
}

/// Call `target[name](...args)` and await the returned promise.
#[allow(clippy::future_not_send)] // WASM is single-threaded; JsValue is !Send
pub async fn call_async(
    target: &JsValue,
    name: &'static str,
    args: &[JsValue],
) -> Result<JsValue, BrowserError> {
    let promise: Promise = call(target, name, args)?
        .dyn_into()
        .map_err(|value| BrowserError::JsError(format!("{name}() did not return a promise: {value:?}")))?;
    Ok(JsFuture::from(promise).await?)
}

/// Build a plain object from key/value pairs.
pub fn object(entries: &[(&str, JsValue)]) -> Result<Object, BrowserError> {
    let object = Object::new();
    for (key, value) in entries {
        Reflect::set(&object, &JsValue::from_str(key), value)?;
    }
    Ok(object)
}
