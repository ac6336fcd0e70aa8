use std::error::Error;
use std::fmt::{Display, Formatter};
use std::fmt;

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ServerErrorCode {
    // 未知错误
    UnknownError = 1000,
    // 配置文件错误
    ConfigError = 1001,
    // mqtt 连接或订阅错误
    MqttError = 1002,
    // topic 不符合 <direction>/<family>/<serial>/<class> 格式
    MalformedTopic = 1003,
    // 消息负载无法按任何适用 schema 解码
    DecodeError = 1004,
    // 注册表中不存在该序列号
    UnknownDevice = 1005,
    // 设备族不支持该指令
    UnsupportedCommand = 1006,
    // 出站发布失败或超时
    PublishFailure = 1007,
}

#[derive(Debug)]
pub struct DeviceServerError {
    pub code: ServerErrorCode,
    pub msg: String,
}

impl Display for DeviceServerError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        write!(f, "设备网关错误 code: {:?},  msg: {}", self.code, self.msg)
    }
}

impl Error for DeviceServerError {}

/// 设备驱动错误
/// the dispatcher matches on the variant, so decode failures, unknown
/// command kinds and bad parameters stay distinguishable
#[derive(Debug)]
pub enum DriverError {
    Decode(String),
    UnsupportedCommand(String),
    InvalidCommandParams(String),
}

impl Display for DriverError {
    fn fmt(&self, f: &mut Formatter) -> fmt::Result {
        match self {
            DriverError::Decode(msg) => write!(f, "设备驱动解码错误 msg: {}", msg),
            DriverError::UnsupportedCommand(msg) => write!(f, "设备驱动不支持的指令 msg: {}", msg),
            DriverError::InvalidCommandParams(msg) => write!(f, "设备驱动指令参数错误 msg: {}", msg),
        }
    }
}

impl Error for DriverError {}
