//! mqtt topic data transmission object

use serde::{Deserialize, Serialize};

/// 消息类别，对应 topic 的第四段
/// 词表之外的类别原样透传，由上层决定如何处理
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageClassEnum {
    Announce,
    Telemetry,
    Command,
    CommandResponse,
    Unknown(String),
}

impl MessageClassEnum {
    pub fn from_segment(segment: &str) -> Self {
        match segment {
            "anc" => MessageClassEnum::Announce,
            "dt" => MessageClassEnum::Telemetry,
            "cmd" => MessageClassEnum::Command,
            "rsp" => MessageClassEnum::CommandResponse,
            other => MessageClassEnum::Unknown(other.to_string()),
        }
    }

    pub fn as_segment(&self) -> &str {
        match self {
            MessageClassEnum::Announce => "anc",
            MessageClassEnum::Telemetry => "dt",
            MessageClassEnum::Command => "cmd",
            MessageClassEnum::CommandResponse => "rsp",
            MessageClassEnum::Unknown(raw) => raw.as_str(),
        }
    }
}

/// parsed mqtt topic: <direction>/<family>/<serial>/<class>
#[derive(Debug, Clone, PartialEq)]
pub struct TopicDto {
    pub direction: String,
    // 设备族，未注册的族也原样保留
    pub family: String,
    pub serial: String,
    pub class: MessageClassEnum,
}
