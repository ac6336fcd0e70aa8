//! mqtt 协议处理工具类，将 topic 字符串和已经定义好的结构体互相转换

use crate::common::error::{DeviceServerError, ServerErrorCode};
use crate::entity::dto::topic_dto::{MessageClassEnum, TopicDto};

/// 入站、出站流量使用的固定 direction 段
pub const TOPIC_DIRECTION: &str = "async";

pub struct Protocol;

impl Protocol {
    /// parse topic to dto
    /// topic 必须为四段且各段非空；family 不做校验，未注册的族原样透传，
    /// 是否可识别由 driver registry 的 fallback 决定
    pub fn parse_topic(topic_str: &str) -> Result<TopicDto, DeviceServerError> {
        let topic_vec: Vec<&str> = topic_str.split('/').collect();

        if topic_vec.len() != 4 {
            return Err(DeviceServerError {
                code: ServerErrorCode::MalformedTopic,
                msg: format!(
                    "topic segment count error, expect 4 got {}, topic: {}",
                    topic_vec.len(),
                    topic_str
                ),
            });
        }

        if topic_vec.iter().any(|segment| segment.is_empty()) {
            return Err(DeviceServerError {
                code: ServerErrorCode::MalformedTopic,
                msg: format!("topic has empty segment, topic: {}", topic_str),
            });
        }

        Ok(TopicDto {
            direction: topic_vec[0].to_string(),
            family: topic_vec[1].to_string(),
            serial: topic_vec[2].to_string(),
            class: MessageClassEnum::from_segment(topic_vec[3]),
        })
    }

    /// 生成 topic String 字符串
    pub fn make_topic(direction: &str, family: &str, serial: &str, class: &MessageClassEnum) -> String {
        format!("{}/{}/{}/{}", direction, family, serial, class.as_segment())
    }

    /// 发送给目标设备的指令 topic
    pub fn make_command_topic(family: &str, serial: &str) -> String {
        Self::make_topic(TOPIC_DIRECTION, family, serial, &MessageClassEnum::Command)
    }

    /// 入站订阅的 topic 过滤器
    /// 按消息类别订阅，不订阅 cmd，避免网关消费自己的出站指令
    pub fn inbound_topic_filters() -> Vec<String> {
        [
            MessageClassEnum::Announce,
            MessageClassEnum::Telemetry,
            MessageClassEnum::CommandResponse,
        ]
        .iter()
        .map(|class| format!("{}/+/+/{}", TOPIC_DIRECTION, class.as_segment()))
        .collect()
    }
}

// 单元测试部分
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_topic() {
        let topic = Protocol::parse_topic("async/sanitizerGen2/ABC123/anc").unwrap();
        assert_eq!(topic.direction, "async");
        assert_eq!(topic.family, "sanitizerGen2");
        assert_eq!(topic.serial, "ABC123");
        assert_eq!(topic.class, MessageClassEnum::Announce);
    }

    // 合法 topic 解析后重建应与原字符串一致
    #[test]
    fn test_topic_round_trip() {
        let topics = [
            "async/sanitizerGen2/ABC123/anc",
            "async/pumpFamilyX/PUMP01/dt",
            "async/lights/LX0001/rsp",
            "async/unseen-family-x/SN42/dt",
            "async/sanitizerGen2/ABC123/weird-class",
        ];
        for raw in topics {
            let dto = Protocol::parse_topic(raw).unwrap();
            let rebuilt =
                Protocol::make_topic(&dto.direction, &dto.family, &dto.serial, &dto.class);
            assert_eq!(rebuilt, raw);
        }
    }

    // 未注册的 family 原样透传，不在分类阶段拒绝
    #[test]
    fn test_unknown_family_passes_through() {
        let topic = Protocol::parse_topic("async/unseen-family-x/SN42/dt").unwrap();
        assert_eq!(topic.family, "unseen-family-x");
    }

    #[test]
    fn test_unknown_class_kept_verbatim() {
        let topic = Protocol::parse_topic("async/lights/LX0001/blorp").unwrap();
        assert_eq!(topic.class, MessageClassEnum::Unknown("blorp".to_string()));
        assert_eq!(topic.class.as_segment(), "blorp");
    }

    #[test]
    fn test_malformed_topics() {
        let malformed = [
            "async/sanitizerGen2/ABC123",        // 缺段
            "async/sanitizerGen2/ABC123/anc/x",  // 多段
            "async/sanitizerGen2//anc",          // serial 为空
            "/sanitizerGen2/ABC123/anc",         // direction 为空
            "",
        ];
        for raw in malformed {
            let err = Protocol::parse_topic(raw).unwrap_err();
            assert_eq!(err.code, ServerErrorCode::MalformedTopic, "topic: {}", raw);
        }
    }

    #[test]
    fn test_make_command_topic() {
        assert_eq!(
            Protocol::make_command_topic("sanitizerGen2", "ABC123"),
            "async/sanitizerGen2/ABC123/cmd"
        );
    }

    #[test]
    fn test_inbound_filters_skip_cmd() {
        let filters = Protocol::inbound_topic_filters();
        assert_eq!(filters.len(), 3);
        assert!(!filters.iter().any(|f| f.ends_with("/cmd")));
    }
}
