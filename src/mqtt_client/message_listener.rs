//! get message from mqtt bus, then apply it to the device registry
//! 单条坏消息只影响自身：分类失败和解码失败记日志后丢弃，
//! 其他设备、后续消息的处理不受影响

use crate::common::clock;
use crate::common::error::{DeviceServerError, ServerErrorCode};
use crate::debug;
use crate::device_controller::command_dispatcher::CommandDispatcher;
use crate::device_controller::device_registry::DeviceRegistry;
use crate::driver::registry as driver_registry;
use crate::entity::dto::topic_dto::MessageClassEnum;

use super::protocol::Protocol;

const LOG_TAG: &str = "message_listener";

pub fn on_message(
    topic_str: &str,
    payload: &[u8],
    device_registry: &DeviceRegistry,
    dispatcher: &CommandDispatcher,
) -> Result<(), DeviceServerError> {
    // 1. parse topic
    let topic = Protocol::parse_topic(topic_str)?;

    // 2. resolve driver，全函数，未注册族走 generic 兜底
    let driver = driver_registry::resolve(topic.family.as_str());

    // 3. decode payload，加锁之前完成，解码是开销大头
    let decoded = driver
        .parse_message(payload, &topic.class)
        .map_err(|e| DeviceServerError {
            code: ServerErrorCode::DecodeError,
            msg: format!(
                "decode failed, family: {} class: {} serial: {} err: {}",
                topic.family,
                topic.class.as_segment(),
                topic.serial,
                e
            ),
        })?;

    // 4. apply to registry
    match decoded.class {
        MessageClassEnum::Announce | MessageClassEnum::Telemetry => {
            device_registry.upsert(
                topic.serial.as_str(),
                topic.family.as_str(),
                &decoded,
                clock::now_millis(),
            );
        }
        MessageClassEnum::CommandResponse => {
            // 响应证明设备在线，但负载不是遥测，只刷新活性
            dispatcher.resolve_response(&decoded);
            device_registry.touch(topic.serial.as_str(), clock::now_millis());
        }
        MessageClassEnum::Command | MessageClassEnum::Unknown(_) => {
            debug!(
                LOG_TAG,
                "ignore non-inbound message class, topic: {}", topic_str
            );
        }
    }

    Ok(())
}
