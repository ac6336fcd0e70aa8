//! decoded bus message, consumed immediately by the ingestion pipeline

use serde_json::Value;

use super::topic_dto::MessageClassEnum;

#[derive(Debug, Clone)]
pub struct DecodedMessageDto {
    pub class: MessageClassEnum,
    // 匹配到的 schema 名
    pub schema_name: String,
    // 解码后的结构化字段
    pub fields: Value,
    // 仅指令响应消息携带
    pub correlation_id: Option<String>,
}
