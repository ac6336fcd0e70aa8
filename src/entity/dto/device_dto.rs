//! device snapshot data transmission object

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviceStatusEnum {
    Online,
    Stale,
    Unknown,
}

/// 设备快照，注册表对外只发放该副本，不发放内部记录的引用
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceDto {
    // 设备序列号，主键
    pub serial: String,
    // 设备族
    pub family: String,
    // 展示名
    pub human_name: String,
    // 派生状态，由 freshness window 决定
    pub status: DeviceStatusEnum,
    // 最近一次消息时间戳（epoch millis），单调不减
    pub last_seen: u64,
    // 首次发现时间戳（epoch millis）
    pub connected_at: u64,
    // 最近一次解码结果，整体覆盖
    pub last_telemetry: Value,
    // 在途指令 correlation id
    pub pending_commands: Vec<String>,
}
