//! outbound command data transmission objects

use serde::Serialize;
use serde_json::Value;

/// used for commanding device
#[derive(Debug, Clone)]
pub struct CommandSpecDto {
    pub kind: String,
    pub params: Value,
    // 编码进出站负载，设备响应时原样回传
    pub correlation_id: String,
}

/// 在途指令记录，由 command dispatcher 持有
#[derive(Debug, Clone, Serialize)]
pub struct PendingCommandDto {
    pub correlation_id: String,
    pub target_serial: String,
    pub command_kind: String,
    // epoch millis
    pub issued_at: u64,
    pub resolved: bool,
}
