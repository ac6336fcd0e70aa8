//! 彩灯（lights / digitalControllerTransformer）驱动
//! 两个设备族共用同一套 schema，族标识在构造时绑定

use super::schema;
use super::traits::DeviceDriver;
use crate::common::error::DriverError;
use crate::entity::dto::command_dto::CommandSpecDto;
use crate::entity::dto::decoded_dto::DecodedMessageDto;
use crate::entity::dto::topic_dto::MessageClassEnum;

pub const CMD_SET_COLOR: &str = "set_color";

const CMD_CODE_SET_COLOR: u8 = 0x01;

const CHANNELS: [&str; 4] = ["red", "green", "blue", "white"];

pub struct LightsDriver {
    family: String,
}

impl LightsDriver {
    pub fn new(family: &str) -> Self {
        LightsDriver {
            family: family.to_string(),
        }
    }
}

impl DeviceDriver for LightsDriver {
    fn parse_message(
        &self,
        payload: &[u8],
        class: &MessageClassEnum,
    ) -> Result<DecodedMessageDto, DriverError> {
        schema::parse_with_catalog(self.family.as_str(), payload, class)
    }

    fn handle_command(&self, spec: &CommandSpecDto) -> Result<Vec<u8>, DriverError> {
        let mut buf: Vec<u8> = Vec::new();
        schema::encode_text(&mut buf, spec.correlation_id.as_str())?;

        match spec.kind.as_str() {
            CMD_SET_COLOR => {
                buf.push(CMD_CODE_SET_COLOR);
                for channel in CHANNELS {
                    let value = spec.params[channel].as_u64().ok_or_else(|| {
                        DriverError::InvalidCommandParams(format!(
                            "{} missing or not an integer",
                            channel
                        ))
                    })?;
                    if value > u8::MAX as u64 {
                        return Err(DriverError::InvalidCommandParams(format!(
                            "{} out of range: {} (0-255)",
                            channel, value
                        )));
                    }
                    buf.push(value as u8);
                }
            }
            other => {
                return Err(DriverError::UnsupportedCommand(format!(
                    "{} does not define command kind: {}",
                    self.family, other
                )));
            }
        }

        Ok(buf)
    }

    fn get_device_type(&self) -> String {
        self.family.clone()
    }

    fn get_message_types(&self) -> Vec<String> {
        schema::message_classes_for(self.family.as_str())
    }

    fn get_command_kinds(&self) -> Vec<String> {
        vec![CMD_SET_COLOR.to_string()]
    }
}
