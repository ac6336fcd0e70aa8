//! generic 兜底驱动
//! 未注册的设备族也要进入注册表（已发现、类型未知），不允许在
//! 这一层静默丢消息；只能按共享信封目录解码，没有指令集

use super::schema;
use super::traits::DeviceDriver;
use crate::common::error::DriverError;
use crate::entity::dto::command_dto::CommandSpecDto;
use crate::entity::dto::decoded_dto::DecodedMessageDto;
use crate::entity::dto::topic_dto::MessageClassEnum;

pub struct GenericDriver {
    family: String,
}

impl GenericDriver {
    pub fn new(family: &str) -> Self {
        GenericDriver {
            family: family.to_string(),
        }
    }
}

impl DeviceDriver for GenericDriver {
    fn parse_message(
        &self,
        payload: &[u8],
        class: &MessageClassEnum,
    ) -> Result<DecodedMessageDto, DriverError> {
        schema::parse_with_catalog(self.family.as_str(), payload, class)
    }

    fn handle_command(&self, _spec: &CommandSpecDto) -> Result<Vec<u8>, DriverError> {
        Err(DriverError::UnsupportedCommand(format!(
            "family {} has no command set",
            self.family
        )))
    }

    fn get_device_type(&self) -> String {
        self.family.clone()
    }

    fn get_message_types(&self) -> Vec<String> {
        schema::message_classes_for(self.family.as_str())
    }

    fn get_command_kinds(&self) -> Vec<String> {
        Vec::new()
    }
}
