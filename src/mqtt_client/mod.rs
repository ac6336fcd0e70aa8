//! mqtt 消息接入模块
//! - topic 协议解析
//! - 入站消息 pipeline
//! - broker 连接引导

pub mod client;
pub mod message_listener;
pub mod protocol;
