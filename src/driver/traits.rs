// 设备驱动基类
use crate::common::error::DriverError;
use crate::entity::dto::command_dto::CommandSpecDto;
use crate::entity::dto::decoded_dto::DecodedMessageDto;
use crate::entity::dto::topic_dto::MessageClassEnum;

/// 每个设备族一个驱动实现，未注册族由 generic 驱动兜底
pub trait DeviceDriver: Send + Sync {
    /// 解码入站二进制负载
    /// - 族专属 schema 优先，共享 schema 兜底
    /// - 无适用 schema 或负载不合法返回 Decode 错误，调用方不得因此
    ///   中断 pipeline
    fn parse_message(
        &self,
        payload: &[u8],
        class: &MessageClassEnum,
    ) -> Result<DecodedMessageDto, DriverError>;

    /// 编码出站指令负载，correlation id 一并编入
    fn handle_command(&self, spec: &CommandSpecDto) -> Result<Vec<u8>, DriverError>;

    /// 获取设备族标识
    fn get_device_type(&self) -> String;

    /// 该驱动可解码的消息类别，有序，serving 层用于能力自描述
    fn get_message_types(&self) -> Vec<String>;

    /// 该族接受的指令类别，有序；没有指令集的族返回空表
    fn get_command_kinds(&self) -> Vec<String>;
}
