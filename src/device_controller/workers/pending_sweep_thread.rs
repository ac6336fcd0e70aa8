use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::common::clock;
use crate::device_controller::command_dispatcher::CommandDispatcher;
use crate::{debug, info};

const LOG_TAG: &'static str = "pending_sweep_thread";

/// pending command sweep thread
/// 周期性回收超时未应答的在途指令，防止在途集合无界增长
pub fn pending_sweep_thread(
    sweep_interval_millis: u64,
    dispatcher: Arc<CommandDispatcher>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        info!(LOG_TAG, "pending sweep thread starting");
        loop {
            let reclaimed = dispatcher.sweep_timeouts(clock::now_millis());
            if reclaimed > 0 {
                debug!(LOG_TAG, "reclaimed {} timed out commands", reclaimed);
            }
            thread::sleep(std::time::Duration::from_millis(sweep_interval_millis));
        }
    })
}
