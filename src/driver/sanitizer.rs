//! 盐氯机（sanitizerGen2）驱动

use super::schema::{self, FAMILY_SANITIZER_GEN2};
use super::traits::DeviceDriver;
use crate::common::error::DriverError;
use crate::entity::dto::command_dto::CommandSpecDto;
use crate::entity::dto::decoded_dto::DecodedMessageDto;
use crate::entity::dto::topic_dto::MessageClassEnum;

pub const CMD_SET_OUTPUT_PERCENTAGE: &str = "set_output_percentage";
pub const CMD_GET_STATUS: &str = "get_status";

// 出站负载中的指令码
const CMD_CODE_SET_OUTPUT: u8 = 0x01;
const CMD_CODE_GET_STATUS: u8 = 0x02;

// 101 为 boost 档
const MAX_TARGET_PERCENTAGE: u64 = 101;

pub struct SanitizerGen2Driver;

impl SanitizerGen2Driver {
    pub fn new() -> Self {
        SanitizerGen2Driver
    }
}

impl DeviceDriver for SanitizerGen2Driver {
    fn parse_message(
        &self,
        payload: &[u8],
        class: &MessageClassEnum,
    ) -> Result<DecodedMessageDto, DriverError> {
        schema::parse_with_catalog(FAMILY_SANITIZER_GEN2, payload, class)
    }

    fn handle_command(&self, spec: &CommandSpecDto) -> Result<Vec<u8>, DriverError> {
        let mut buf: Vec<u8> = Vec::new();
        schema::encode_text(&mut buf, spec.correlation_id.as_str())?;

        match spec.kind.as_str() {
            CMD_SET_OUTPUT_PERCENTAGE => {
                let target = spec.params["target_percentage"].as_u64().ok_or_else(|| {
                    DriverError::InvalidCommandParams(
                        "target_percentage missing or not an integer".to_string(),
                    )
                })?;
                if target > MAX_TARGET_PERCENTAGE {
                    return Err(DriverError::InvalidCommandParams(format!(
                        "target_percentage out of range: {} (0-101, 101 = boost)",
                        target
                    )));
                }
                buf.push(CMD_CODE_SET_OUTPUT);
                buf.push(target as u8);
            }
            CMD_GET_STATUS => {
                buf.push(CMD_CODE_GET_STATUS);
            }
            other => {
                return Err(DriverError::UnsupportedCommand(format!(
                    "sanitizerGen2 does not define command kind: {}",
                    other
                )));
            }
        }

        Ok(buf)
    }

    fn get_device_type(&self) -> String {
        FAMILY_SANITIZER_GEN2.to_string()
    }

    fn get_message_types(&self) -> Vec<String> {
        schema::message_classes_for(FAMILY_SANITIZER_GEN2)
    }

    fn get_command_kinds(&self) -> Vec<String> {
        vec![
            CMD_SET_OUTPUT_PERCENTAGE.to_string(),
            CMD_GET_STATUS.to_string(),
        ]
    }
}

// 单元测试部分
#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn spec(kind: &str, params: serde_json::Value) -> CommandSpecDto {
        CommandSpecDto {
            kind: kind.to_string(),
            params,
            correlation_id: "cmd-test-1".to_string(),
        }
    }

    // 出站负载以 correlation id 开头，设备响应时原样回传
    #[test]
    fn test_set_output_encoding() {
        let driver = SanitizerGen2Driver::new();
        let payload = driver
            .handle_command(&spec(
                CMD_SET_OUTPUT_PERCENTAGE,
                json!({"target_percentage": 75}),
            ))
            .unwrap();

        let cid = "cmd-test-1".as_bytes();
        assert_eq!(payload[0] as usize, cid.len());
        assert_eq!(&payload[1..1 + cid.len()], cid);
        assert_eq!(payload[1 + cid.len()], CMD_CODE_SET_OUTPUT);
        assert_eq!(payload[2 + cid.len()], 75);
    }

    #[test]
    fn test_boost_level_allowed() {
        let driver = SanitizerGen2Driver::new();
        let result = driver.handle_command(&spec(
            CMD_SET_OUTPUT_PERCENTAGE,
            json!({"target_percentage": 101}),
        ));
        assert!(result.is_ok());
    }

    #[test]
    fn test_out_of_range_percentage_rejected() {
        let driver = SanitizerGen2Driver::new();
        let err = driver
            .handle_command(&spec(
                CMD_SET_OUTPUT_PERCENTAGE,
                json!({"target_percentage": 102}),
            ))
            .unwrap_err();
        assert!(matches!(err, DriverError::InvalidCommandParams(_)));
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let driver = SanitizerGen2Driver::new();
        let err = driver
            .handle_command(&spec("open_pod_bay_doors", json!({})))
            .unwrap_err();
        assert!(matches!(err, DriverError::UnsupportedCommand(_)));
    }

    // anc 类别应命中族专属 schema 而非共享信封
    #[test]
    fn test_parse_announce_uses_family_schema() {
        let mut buf: Vec<u8> = Vec::new();
        schema::encode_text(&mut buf, "AquaRite 940").unwrap();
        schema::encode_text(&mut buf, "AQR940").unwrap();
        schema::encode_text(&mut buf, "3.0.2").unwrap();
        schema::encode_text(&mut buf, "CELL-00817").unwrap();
        schema::encode_text(&mut buf, "1.4").unwrap();

        let driver = SanitizerGen2Driver::new();
        let decoded = driver
            .parse_message(&buf, &MessageClassEnum::Announce)
            .unwrap();
        assert_eq!(decoded.schema_name, "SanitizerAnnounce");
        assert_eq!(decoded.fields["cell_serial"], "CELL-00817");
        assert!(decoded.correlation_id.is_none());
    }

    #[test]
    fn test_command_kinds_listed() {
        let driver = SanitizerGen2Driver::new();
        assert_eq!(
            driver.get_command_kinds(),
            vec![CMD_SET_OUTPUT_PERCENTAGE, CMD_GET_STATUS]
        );
    }
}
