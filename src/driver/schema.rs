//! 二进制消息 schema 目录与解码器
//! - schema 按 (族 | 共享, 消息类别) 组织，进程启动后只读
//! - 解析规则：族专属目录优先，族目录没有该类别时才回退共享目录
//!   （多个设备族定义了同名的 anc 信封，字段集不同，用共享 schema
//!   解码会静默丢字段）

use std::collections::HashMap;

use lazy_static::lazy_static;
use serde_json::{json, Map, Value};

use crate::common::error::DriverError;
use crate::entity::dto::decoded_dto::DecodedMessageDto;
use crate::entity::dto::topic_dto::MessageClassEnum;

pub const FAMILY_SANITIZER_GEN2: &str = "sanitizerGen2";
pub const FAMILY_LIGHTS: &str = "lights";
pub const FAMILY_LIGHTS_TRANSFORMER: &str = "digitalControllerTransformer";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    U8,
    U16,
    U32,
    I16,
    F32,
    Flag,
    // u8 长度前缀 + utf8 字节
    Text,
}

impl FieldKind {
    pub fn kind_name(&self) -> &'static str {
        match self {
            FieldKind::U8 => "u8",
            FieldKind::U16 => "u16",
            FieldKind::U32 => "u32",
            FieldKind::I16 => "i16",
            FieldKind::F32 => "f32",
            FieldKind::Flag => "flag",
            FieldKind::Text => "text",
        }
    }
}

pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    // 计量单位，仅用于能力自描述
    pub unit: &'static str,
}

pub struct MessageSchema {
    pub name: &'static str,
    // topic class 段
    pub class: &'static str,
    pub fields: &'static [FieldSpec],
}

impl MessageSchema {
    /// 能力自描述，serving 层直接输出
    pub fn describe(&self) -> Value {
        json!({
            "schema": self.name,
            "class": self.class,
            "fields": self.fields.iter().map(|f| json!({
                "name": f.name,
                "type": f.kind.kind_name(),
                "unit": f.unit,
            })).collect::<Vec<Value>>(),
        })
    }
}

/// 共享信封目录，所有设备族可用
pub const SHARED_SCHEMAS: &[MessageSchema] = &[
    MessageSchema {
        name: "CommonAnnounce",
        class: "anc",
        fields: &[
            FieldSpec { name: "product_name", kind: FieldKind::Text, unit: "" },
            FieldSpec { name: "model_id", kind: FieldKind::Text, unit: "" },
            FieldSpec { name: "firmware_version", kind: FieldKind::Text, unit: "" },
        ],
    },
    MessageSchema {
        name: "CommonTelemetry",
        class: "dt",
        fields: &[
            FieldSpec { name: "rssi", kind: FieldKind::I16, unit: "dBm" },
            FieldSpec { name: "uptime_seconds", kind: FieldKind::U32, unit: "s" },
            FieldSpec { name: "water_temp", kind: FieldKind::F32, unit: "°C" },
        ],
    },
    MessageSchema {
        name: "CommonCommandResponse",
        class: "rsp",
        fields: &[
            FieldSpec { name: "correlation_id", kind: FieldKind::Text, unit: "" },
            FieldSpec { name: "status_code", kind: FieldKind::U8, unit: "" },
            FieldSpec { name: "detail", kind: FieldKind::Text, unit: "" },
        ],
    },
];

const SANITIZER_SCHEMAS: &[MessageSchema] = &[
    // 盐氯机的 anc 信封带电解槽字段，遮蔽共享 anc
    MessageSchema {
        name: "SanitizerAnnounce",
        class: "anc",
        fields: &[
            FieldSpec { name: "product_name", kind: FieldKind::Text, unit: "" },
            FieldSpec { name: "model_id", kind: FieldKind::Text, unit: "" },
            FieldSpec { name: "firmware_version", kind: FieldKind::Text, unit: "" },
            FieldSpec { name: "cell_serial", kind: FieldKind::Text, unit: "" },
            FieldSpec { name: "cell_firmware", kind: FieldKind::Text, unit: "" },
        ],
    },
    MessageSchema {
        name: "SanitizerTelemetry",
        class: "dt",
        fields: &[
            FieldSpec { name: "percentage_output", kind: FieldKind::U8, unit: "%" },
            FieldSpec { name: "ppm_salt", kind: FieldKind::U16, unit: "ppm" },
            FieldSpec { name: "cell_temp", kind: FieldKind::F32, unit: "°C" },
            FieldSpec { name: "cell_voltage", kind: FieldKind::F32, unit: "V" },
            FieldSpec { name: "cell_current", kind: FieldKind::F32, unit: "A" },
            FieldSpec { name: "line_input_voltage", kind: FieldKind::U16, unit: "V" },
            FieldSpec { name: "is_cell_flow_reversed", kind: FieldKind::Flag, unit: "" },
            FieldSpec { name: "rssi", kind: FieldKind::I16, unit: "dBm" },
        ],
    },
];

const LIGHTS_SCHEMAS: &[MessageSchema] = &[
    MessageSchema {
        name: "LightsTelemetry",
        class: "dt",
        fields: &[
            FieldSpec { name: "red", kind: FieldKind::U8, unit: "" },
            FieldSpec { name: "green", kind: FieldKind::U8, unit: "" },
            FieldSpec { name: "blue", kind: FieldKind::U8, unit: "" },
            FieldSpec { name: "white", kind: FieldKind::U8, unit: "" },
        ],
    },
];

lazy_static! {
    static ref FAMILY_CATALOG: HashMap<&'static str, &'static [MessageSchema]> = {
        let mut catalog: HashMap<&'static str, &'static [MessageSchema]> = HashMap::new();
        catalog.insert(FAMILY_SANITIZER_GEN2, SANITIZER_SCHEMAS);
        catalog.insert(FAMILY_LIGHTS, LIGHTS_SCHEMAS);
        catalog.insert(FAMILY_LIGHTS_TRANSFORMER, LIGHTS_SCHEMAS);
        catalog
    };
}

/// 按优先级解析 schema：族专属在前，共享目录兜底
pub fn resolve_schema(family: &str, class: &MessageClassEnum) -> Option<&'static MessageSchema> {
    let segment = class.as_segment();
    if let Some(&schemas) = FAMILY_CATALOG.get(family) {
        if let Some(schema) = schemas.iter().find(|s| s.class == segment) {
            return Some(schema);
        }
    }
    SHARED_SCHEMAS.iter().find(|s| s.class == segment)
}

/// 该族可解码的消息类别，族专属类别在前，共享类别去重后缀
pub fn message_classes_for(family: &str) -> Vec<String> {
    let mut classes: Vec<String> = Vec::new();
    if let Some(schemas) = FAMILY_CATALOG.get(family) {
        for schema in schemas.iter() {
            classes.push(schema.class.to_string());
        }
    }
    for schema in SHARED_SCHEMAS.iter() {
        if !classes.iter().any(|c| c == schema.class) {
            classes.push(schema.class.to_string());
        }
    }
    classes
}

/// 该族所有可解码 schema 的自描述
pub fn describe_family(family: &str) -> Vec<Value> {
    let mut descriptors: Vec<Value> = Vec::new();
    let mut seen: Vec<&str> = Vec::new();
    if let Some(schemas) = FAMILY_CATALOG.get(family) {
        for schema in schemas.iter() {
            descriptors.push(schema.describe());
            seen.push(schema.class);
        }
    }
    for schema in SHARED_SCHEMAS.iter() {
        if !seen.contains(&schema.class) {
            descriptors.push(schema.describe());
        }
    }
    descriptors
}

/// 按 schema 顺序解码二进制负载
/// 整数、浮点小端；尾部多余字节容忍（厂商填充）
pub fn decode_payload(schema: &MessageSchema, payload: &[u8]) -> Result<Value, DriverError> {
    let mut cursor: usize = 0;
    let mut fields = Map::new();

    for field in schema.fields {
        let value = match field.kind {
            FieldKind::U8 => {
                let bytes = take_bytes(payload, &mut cursor, 1, schema, field)?;
                json!(bytes[0])
            }
            FieldKind::U16 => {
                let bytes = take_bytes(payload, &mut cursor, 2, schema, field)?;
                json!(u16::from_le_bytes([bytes[0], bytes[1]]))
            }
            FieldKind::U32 => {
                let bytes = take_bytes(payload, &mut cursor, 4, schema, field)?;
                json!(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            FieldKind::I16 => {
                let bytes = take_bytes(payload, &mut cursor, 2, schema, field)?;
                json!(i16::from_le_bytes([bytes[0], bytes[1]]))
            }
            FieldKind::F32 => {
                let bytes = take_bytes(payload, &mut cursor, 4, schema, field)?;
                json!(f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
            }
            FieldKind::Flag => {
                let bytes = take_bytes(payload, &mut cursor, 1, schema, field)?;
                json!(bytes[0] != 0)
            }
            FieldKind::Text => {
                let len = take_bytes(payload, &mut cursor, 1, schema, field)?[0] as usize;
                let bytes = take_bytes(payload, &mut cursor, len, schema, field)?;
                let text = std::str::from_utf8(bytes).map_err(|e| {
                    DriverError::Decode(format!(
                        "schema {} field {} is not utf8: {}",
                        schema.name, field.name, e
                    ))
                })?;
                json!(text)
            }
        };
        fields.insert(field.name.to_string(), value);
    }

    Ok(Value::Object(fields))
}

fn take_bytes<'a>(
    payload: &'a [u8],
    cursor: &mut usize,
    count: usize,
    schema: &MessageSchema,
    field: &FieldSpec,
) -> Result<&'a [u8], DriverError> {
    let end = *cursor + count;
    if end > payload.len() {
        return Err(DriverError::Decode(format!(
            "payload too short, schema: {} field: {} need {} bytes at offset {}, payload len {}",
            schema.name, field.name, count, cursor, payload.len()
        )));
    }
    let slice = &payload[*cursor..end];
    *cursor = end;
    Ok(slice)
}

/// 目录驱动的完整解码入口，各驱动共用
/// 指令响应消息从字段中提取 correlation id
pub fn parse_with_catalog(
    family: &str,
    payload: &[u8],
    class: &MessageClassEnum,
) -> Result<DecodedMessageDto, DriverError> {
    let schema = resolve_schema(family, class).ok_or_else(|| {
        DriverError::Decode(format!(
            "no schema for family: {} class: {}",
            family,
            class.as_segment()
        ))
    })?;
    let fields = decode_payload(schema, payload)?;

    let correlation_id = match class {
        MessageClassEnum::CommandResponse => fields
            .get("correlation_id")
            .and_then(|v| v.as_str())
            .map(|s| s.to_string()),
        _ => None,
    };

    Ok(DecodedMessageDto {
        class: class.clone(),
        schema_name: schema.name.to_string(),
        fields,
        correlation_id,
    })
}

/// 写入 u8 长度前缀字符串，指令编码和测试负载构造共用
pub fn encode_text(buf: &mut Vec<u8>, value: &str) -> Result<(), DriverError> {
    if value.len() > u8::MAX as usize {
        return Err(DriverError::InvalidCommandParams(format!(
            "text field too long: {} bytes",
            value.len()
        )));
    }
    buf.push(value.len() as u8);
    buf.extend_from_slice(value.as_bytes());
    Ok(())
}
