//! Status timer: returns a finished job's status to idle after a delay.

use std::rc::Rc;
use std::time::Duration;

use gloo_timers::future::TimeoutFuture;
use pixport_core::StatusSlot;
use tracing::debug;

/// After `delay`, reset `slot` to idle if job `generation` is still the
/// latest and its status is terminal.
pub fn schedule_idle_revert(slot: Rc<StatusSlot>, generation: u64, delay: Duration) {
    let millis = u32::try_from(delay.as_millis()).unwrap_or(u32::MAX);
    wasm_bindgen_futures::spawn_local(async move {
        TimeoutFuture::new(millis).await;
        if slot.revert_to_idle(generation) {
            debug!(generation, "status reverted to idle");
        }
    });
}
