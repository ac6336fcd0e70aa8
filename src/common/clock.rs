//! epoch 时间戳工具

use std::time::{SystemTime, UNIX_EPOCH};

/// 当前 epoch 毫秒
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
