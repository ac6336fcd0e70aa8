use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crate::common::clock;
use crate::device_controller::device_registry::DeviceRegistry;
use crate::info;

const LOG_TAG: &'static str = "stale_sweep_thread";

/// device staleness sweep thread
/// 周期性重算全部设备的派生状态，超过 freshness window 没有消息的
/// 设备标记为 Stale，不删除条目
pub fn stale_sweep_thread(
    sweep_interval_millis: u64,
    device_registry: Arc<DeviceRegistry>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        info!(LOG_TAG, "stale sweep thread starting");
        loop {
            device_registry.mark_stale_sweep(clock::now_millis());
            thread::sleep(std::time::Duration::from_millis(sweep_interval_millis));
        }
    })
}
