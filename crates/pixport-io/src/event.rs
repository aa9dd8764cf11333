//! Developer event dispatched on `window` after each job.
//!
//! ```js
//! window.addEventListener("pixport:export", (e) => {
//!   const { generation, items, archive } = e.detail;
//!   // items: [{ name, mime, bytes: Uint8Array }], archive: Uint8Array | null
//! });
//! ```

use js_sys::{Array, Uint8Array};
use pixport_core::DeveloperEvent;
use wasm_bindgen::JsValue;
use web_sys::{CustomEvent, CustomEventInit};

use crate::error::BrowserError;
use crate::js;

/// Event type name.
pub const EVENT_NAME: &str = "pixport:export";

/// Dispatch `event` as a `CustomEvent` on `window`.
///
/// # Errors
///
/// Returns [`BrowserError`] if the event cannot be built or dispatched.
#[allow(clippy::cast_precision_loss)]
pub fn dispatch(event: &DeveloperEvent<'_>) -> Result<(), BrowserError> {
    let items: Array = event
        .items
        .iter()
        .map(|item| {
            js::object(&[
                ("name", JsValue::from_str(item.name())),
                ("mime", JsValue::from_str(item.mime())),
                ("bytes", Uint8Array::from(item.bytes()).into()),
            ])
        })
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .collect();
    let archive = event
        .archive
        .map_or(JsValue::NULL, |archive| Uint8Array::from(archive.as_bytes()).into());

    let detail = js::object(&[
        ("generation", JsValue::from_f64(event.generation as f64)),
        ("items", items.into()),
        ("archive", archive),
    ])?;

    let init = CustomEventInit::new();
    init.set_detail(&detail);
    let custom = CustomEvent::new_with_event_init_dict(EVENT_NAME, &init)?;
    js::window()?.dispatch_event(&custom)?;
    Ok(())
}
