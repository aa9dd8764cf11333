//! User-facing notifications.
//!
//! Uses the host page's `window.ComfyUI.notify(message, options)` when
//! present; otherwise logs to the console.

use std::time::Duration;

use gloo_timers::callback::Timeout;
use js_sys::Object;
use pixport_core::{Notification, NotificationKind};
use wasm_bindgen::JsValue;

use crate::download::object_url;
use crate::error::BrowserError;
use crate::js;

/// Show `notification`.  Never fails; problems go to the console.
pub fn show(notification: &Notification<'_>) {
    if let Err(error) = show_in_page(notification) {
        tracing::debug!(%error, "page notifier unavailable; using console");
        log_to_console(notification);
    }
}

fn show_in_page(notification: &Notification<'_>) -> Result<(), BrowserError> {
    let window = js::window()?;
    let notifier = js::property(&window, "ComfyUI").ok_or(BrowserError::Missing("ComfyUI"))?;
    if !js::has(&notifier, "notify") {
        return Err(BrowserError::Missing("ComfyUI.notify"));
    }

    let options = options(notification)?;
    js::call(
        &notifier,
        "notify",
        &[JsValue::from_str(notification.message), options.into()],
    )?;
    Ok(())
}

fn options(notification: &Notification<'_>) -> Result<Object, BrowserError> {
    let timeout = duration_millis(notification.timeout);
    let mut entries = vec![
        ("timeout", JsValue::from_f64(f64::from(timeout))),
        ("type", JsValue::from_str(kind_name(notification.kind))),
    ];
    if let Some(item) = notification.thumbnail {
        let url = object_url(item.bytes(), item.mime())?;
        entries.push(("image", JsValue::from_str(&url)));
        // Keep the thumbnail alive as long as the notification.
        Timeout::new(timeout.saturating_mul(2), move || {
            let _ = web_sys::Url::revoke_object_url(&url);
        })
        .forget();
    }
    js::object(&entries)
}

fn log_to_console(notification: &Notification<'_>) {
    let message = JsValue::from_str(notification.message);
    match notification.kind {
        NotificationKind::Error => web_sys::console::error_1(&message),
        NotificationKind::Info | NotificationKind::Success => web_sys::console::log_1(&message),
    }
}

const fn kind_name(kind: NotificationKind) -> &'static str {
    match kind {
        NotificationKind::Info => "info",
        NotificationKind::Success => "success",
        NotificationKind::Error => "error",
    }
}

fn duration_millis(duration: Duration) -> u32 {
    u32::try_from(duration.as_millis()).unwrap_or(u32::MAX)
}
