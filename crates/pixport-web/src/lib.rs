//! WASM entry point for pixport.
//!
//! The page creates one [`PixportExtension`] and forwards every job
//! message from its producer to [`handle_message`](PixportExtension::handle_message):
//!
//! ```js
//! import init, { PixportExtension } from "./pixport_web.js";
//! await init();
//! const pixport = new PixportExtension();
//! pixport.onStatus((status) => overlay.update(status));
//! socket.addEventListener("pixport", (e) => pixport.handleMessage(e.detail));
//! ```
//!
//! Messages are dispatched in the background; `handleMessage` returns
//! as soon as the message is parsed.

use std::cell::RefCell;
use std::rc::Rc;

use js_sys::Function;
use pixport_core::{DispatchConfig, Dispatcher, ExportExtension, InboundMessage};
use pixport_io::{BrowserHost, schedule_idle_revert};
use tracing::{debug, warn};
use wasm_bindgen::prelude::*;

/// Name the extension registers under.
const EXTENSION_NAME: &str = "pixport.export";

/// Browser-facing handle owning the dispatcher and the job handlers.
#[wasm_bindgen]
pub struct PixportExtension {
    dispatcher: Rc<Dispatcher<BrowserHost>>,
    extension: RefCell<ExportExtension>,
}

#[wasm_bindgen]
impl PixportExtension {
    /// Create the extension.  `config_json` is an optional
    /// `DispatchConfig` object; omitted fields take their defaults.
    ///
    /// # Errors
    ///
    /// Throws if `config_json` is not valid configuration JSON.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<Self, JsError> {
        console_error_panic_hook::set_once();

        let config = match config_json.as_deref() {
            Some(json) if !json.trim().is_empty() => serde_json::from_str(json)
                .map_err(|e| JsError::new(&format!("invalid pixport config: {e}")))?,
            _ => DispatchConfig::default(),
        };
        let dispatcher = Rc::new(Dispatcher::new(BrowserHost::new(), config));

        let mut extension = ExportExtension::new(EXTENSION_NAME);
        let runner = Rc::clone(&dispatcher);
        extension.on_job_received(move |message| spawn_dispatch(&runner, message.clone()));

        Ok(Self {
            dispatcher,
            extension: RefCell::new(extension),
        })
    }

    /// Handle one job message given as JSON text.
    ///
    /// # Errors
    ///
    /// Throws only if `json` is not valid JSON; fields of the wrong type
    /// are read leniently.
    #[wasm_bindgen(js_name = handleMessage)]
    pub fn handle_message(&self, json: &str) -> Result<(), JsError> {
        let message = InboundMessage::from_json(json)
            .map_err(|e| JsError::new(&format!("invalid job message: {e}")))?;
        let extension = self
            .extension
            .try_borrow()
            .map_err(|_| JsError::new("handleMessage called from inside onJobReceived"))?;
        extension.receive(&message);
        Ok(())
    }

    /// Register `callback(message)` to run for every job, after the
    /// handlers registered before it.
    ///
    /// # Errors
    ///
    /// Throws if called from inside a job handler.
    #[wasm_bindgen(js_name = onJobReceived)]
    pub fn on_job_received(&self, callback: Function) -> Result<(), JsError> {
        let mut extension = self
            .extension
            .try_borrow_mut()
            .map_err(|_| JsError::new("onJobReceived called from inside a job handler"))?;
        extension.on_job_received(move |message| {
            match serde_json::to_string(message)
                .map_err(|e| e.to_string())
                .and_then(|json| js_sys::JSON::parse(&json).map_err(|e| format!("{e:?}")))
            {
                Ok(value) => {
                    if let Err(error) = callback.call1(&JsValue::NULL, &value) {
                        warn!(?error, "job callback threw");
                    }
                }
                Err(error) => warn!(%error, "could not pass job to callback"),
            }
        });
        Ok(())
    }

    /// Register `callback({state, text, progress})` for every status change.
    #[wasm_bindgen(js_name = onStatus)]
    pub fn on_status(&self, callback: Function) {
        self.dispatcher.status().subscribe(move |status| {
            let Ok(json) = serde_json::to_string(status) else {
                return;
            };
            let Ok(value) = js_sys::JSON::parse(&json) else {
                return;
            };
            let progress = status.progress().map_or(JsValue::NULL, |p| JsValue::from_f64(f64::from(p)));
            let _ = js_sys::Reflect::set(&value, &JsValue::from_str("progress"), &progress);
            let _ = js_sys::Reflect::set(&value, &JsValue::from_str("text"), &JsValue::from_str(status.text()));
            if let Err(error) = callback.call1(&JsValue::NULL, &value) {
                warn!(?error, "status callback threw");
            }
        });
    }

    /// Generation of the most recent job.
    #[wasm_bindgen(getter)]
    #[must_use]
    pub fn generation(&self) -> f64 {
        #[allow(clippy::cast_precision_loss)]
        let generation = self.dispatcher.status().generation() as f64;
        generation
    }
}

/// Run `message` in the background and schedule the idle revert.
fn spawn_dispatch(dispatcher: &Rc<Dispatcher<BrowserHost>>, message: InboundMessage) {
    let dispatcher = Rc::clone(dispatcher);
    wasm_bindgen_futures::spawn_local(async move {
        let report = dispatcher.handle_message(&message).await;
        debug!(
            generation = report.generation,
            destinations = report.destinations.len(),
            skipped = report.skipped.len(),
            success = report.is_success(),
            "job finished"
        );
        schedule_idle_revert(
            Rc::clone(dispatcher.status()),
            report.generation,
            dispatcher.config().status_revert_delay,
        );
    });
}
