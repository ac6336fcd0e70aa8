//! 指令下发与响应关联
//! - dispatch：校验目标 → 驱动编码 → 登记在途指令 → 发布，
//!   发布失败整体回滚，不留下孤儿记录
//! - 响应按 correlation id 关联；未匹配的响应记日志丢弃
//! - 永不应答的在途指令由周期 sweep 超时回收，防止集合无界增长

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use uuid::Uuid;

use super::device_registry::DeviceRegistry;
use crate::common::clock;
use crate::common::error::{DeviceServerError, DriverError, ServerErrorCode};
use crate::common::mqtt::MessagePublisher;
use crate::driver::registry as driver_registry;
use crate::entity::dto::command_dto::{CommandSpecDto, PendingCommandDto};
use crate::entity::dto::decoded_dto::DecodedMessageDto;
use crate::mqtt_client::protocol::Protocol;
use crate::{info, warn};

const LOG_TAG: &str = "command_dispatcher";

pub struct CommandDispatcher {
    device_registry: Arc<DeviceRegistry>,
    publisher: Arc<dyn MessagePublisher>,
    pending_timeout_millis: u64,
    // 在途指令表，key 为 correlation id
    pending: Mutex<HashMap<String, PendingCommandDto>>,
}

impl CommandDispatcher {
    pub fn new(
        device_registry: Arc<DeviceRegistry>,
        publisher: Arc<dyn MessagePublisher>,
        pending_timeout_millis: u64,
    ) -> Self {
        CommandDispatcher {
            device_registry,
            publisher,
            pending_timeout_millis,
            pending: Mutex::new(HashMap::new()),
        }
    }

    /// 下发指令，返回 correlation id
    pub fn dispatch(
        &self,
        serial: &str,
        kind: &str,
        params: Value,
    ) -> Result<String, DeviceServerError> {
        // 1 目标设备必须已在注册表中
        let device = self.device_registry.get(serial)?;

        // 2 按设备族解析驱动并编码负载
        let driver = driver_registry::resolve(device.family.as_str());
        let correlation_id = format!("cmd-{}", Uuid::new_v4().simple());
        let spec = CommandSpecDto {
            kind: kind.to_string(),
            params,
            correlation_id: correlation_id.clone(),
        };
        let payload = driver.handle_command(&spec).map_err(|e| match e {
            DriverError::UnsupportedCommand(msg) | DriverError::InvalidCommandParams(msg) => {
                DeviceServerError {
                    code: ServerErrorCode::UnsupportedCommand,
                    msg,
                }
            }
            DriverError::Decode(msg) => DeviceServerError {
                code: ServerErrorCode::UnknownError,
                msg,
            },
        })?;

        // 3 登记在途指令
        {
            let mut pending = self.pending.lock().unwrap();
            pending.insert(
                correlation_id.clone(),
                PendingCommandDto {
                    correlation_id: correlation_id.clone(),
                    target_serial: serial.to_string(),
                    command_kind: kind.to_string(),
                    issued_at: clock::now_millis(),
                    resolved: false,
                },
            );
        }
        self.device_registry.add_pending(serial, correlation_id.as_str());

        // 4 发布，失败则回滚登记
        let topic = Protocol::make_command_topic(device.family.as_str(), serial);
        if let Err(e) = self.publisher.publish(topic.as_str(), payload.as_slice()) {
            self.pending.lock().unwrap().remove(correlation_id.as_str());
            self.device_registry
                .remove_pending(serial, correlation_id.as_str());
            return Err(e);
        }

        info!(
            LOG_TAG,
            "command published, serial: {} kind: {} correlation: {}", serial, kind, correlation_id
        );
        Ok(correlation_id)
    }

    /// 指令响应关联
    /// 未匹配的 correlation id（如超时回收后才到的响应）记日志丢弃，
    /// 不向任何调用方传播错误
    pub fn resolve_response(&self, decoded: &DecodedMessageDto) {
        let correlation_id = match &decoded.correlation_id {
            Some(id) => id.as_str(),
            None => {
                warn!(
                    LOG_TAG,
                    "command response without correlation id discarded, schema: {}",
                    decoded.schema_name
                );
                return;
            }
        };

        let removed = self.pending.lock().unwrap().remove(correlation_id);
        match removed {
            Some(mut command) => {
                command.resolved = true;
                self.device_registry
                    .remove_pending(command.target_serial.as_str(), correlation_id);
                info!(
                    LOG_TAG,
                    "command resolved, serial: {} kind: {} correlation: {}",
                    command.target_serial,
                    command.command_kind,
                    correlation_id
                );
            }
            None => {
                warn!(
                    LOG_TAG,
                    "unmatched command response discarded, correlation: {}", correlation_id
                );
            }
        }
    }

    /// 回收超过 pending_timeout 的在途指令，返回回收条数
    pub fn sweep_timeouts(&self, now_millis: u64) -> usize {
        let expired: Vec<PendingCommandDto> = {
            let mut pending = self.pending.lock().unwrap();
            let expired_ids: Vec<String> = pending
                .iter()
                .filter(|(_, command)| {
                    now_millis.saturating_sub(command.issued_at) > self.pending_timeout_millis
                })
                .map(|(id, _)| id.clone())
                .collect();
            expired_ids
                .iter()
                .filter_map(|id| pending.remove(id))
                .collect()
        };

        for command in &expired {
            self.device_registry
                .remove_pending(command.target_serial.as_str(), command.correlation_id.as_str());
            warn!(
                LOG_TAG,
                "pending command reclaimed by timeout, serial: {} kind: {} correlation: {}",
                command.target_serial,
                command.command_kind,
                command.correlation_id
            );
        }
        expired.len()
    }

    /// 在途指令快照，按下发时间排序
    pub fn pending_snapshot(&self) -> Vec<PendingCommandDto> {
        let pending = self.pending.lock().unwrap();
        let mut snapshot: Vec<PendingCommandDto> = pending.values().cloned().collect();
        snapshot.sort_by(|a, b| {
            a.issued_at
                .cmp(&b.issued_at)
                .then_with(|| a.correlation_id.cmp(&b.correlation_id))
        });
        snapshot
    }
}

// 单元测试部分
#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::dto::topic_dto::MessageClassEnum;
    use serde_json::json;

    struct DummyPublisher {
        published: Mutex<Vec<(String, Vec<u8>)>>,
        fail: bool,
    }

    impl DummyPublisher {
        fn new(fail: bool) -> Arc<Self> {
            Arc::new(DummyPublisher {
                published: Mutex::new(Vec::new()),
                fail,
            })
        }
    }

    impl MessagePublisher for DummyPublisher {
        fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), DeviceServerError> {
            if self.fail {
                return Err(DeviceServerError {
                    code: ServerErrorCode::PublishFailure,
                    msg: "dummy publish failure".to_string(),
                });
            }
            self.published
                .lock()
                .unwrap()
                .push((topic.to_string(), payload.to_vec()));
            Ok(())
        }
    }

    fn registry_with_device(serial: &str, family: &str) -> Arc<DeviceRegistry> {
        let registry = Arc::new(DeviceRegistry::new(60_000));
        registry.upsert(
            serial,
            family,
            &DecodedMessageDto {
                class: MessageClassEnum::Announce,
                schema_name: "SanitizerAnnounce".to_string(),
                fields: json!({}),
                correlation_id: None,
            },
            1000,
        );
        registry
    }

    fn response_with(correlation_id: Option<&str>) -> DecodedMessageDto {
        DecodedMessageDto {
            class: MessageClassEnum::CommandResponse,
            schema_name: "CommonCommandResponse".to_string(),
            fields: json!({"status_code": 0}),
            correlation_id: correlation_id.map(|s| s.to_string()),
        }
    }

    #[test]
    fn test_dispatch_publishes_and_records_pending() {
        let registry = registry_with_device("ABC123", "sanitizerGen2");
        let publisher = DummyPublisher::new(false);
        let dispatcher =
            CommandDispatcher::new(registry.clone(), publisher.clone(), 30_000);

        let correlation_id = dispatcher
            .dispatch("ABC123", "set_output_percentage", json!({"target_percentage": 50}))
            .unwrap();

        let published = publisher.published.lock().unwrap();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].0, "async/sanitizerGen2/ABC123/cmd");

        let snapshot = dispatcher.pending_snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].correlation_id, correlation_id);
        assert_eq!(snapshot[0].target_serial, "ABC123");
        assert!(!snapshot[0].resolved);

        assert_eq!(
            registry.get("ABC123").unwrap().pending_commands,
            vec![correlation_id]
        );
    }

    #[test]
    fn test_dispatch_unknown_device() {
        let registry = Arc::new(DeviceRegistry::new(60_000));
        let dispatcher =
            CommandDispatcher::new(registry, DummyPublisher::new(false), 30_000);
        let err = dispatcher
            .dispatch("GHOST", "get_status", json!({}))
            .unwrap_err();
        assert_eq!(err.code, ServerErrorCode::UnknownDevice);
    }

    #[test]
    fn test_dispatch_unsupported_command() {
        let registry = registry_with_device("PUMP01", "pumpFamilyX");
        let dispatcher =
            CommandDispatcher::new(registry, DummyPublisher::new(false), 30_000);
        let err = dispatcher
            .dispatch("PUMP01", "set_output_percentage", json!({"target_percentage": 50}))
            .unwrap_err();
        assert_eq!(err.code, ServerErrorCode::UnsupportedCommand);
        // 拒绝的指令不留在途记录
        assert!(dispatcher.pending_snapshot().is_empty());
    }

    // 发布失败必须整体回滚在途登记
    #[test]
    fn test_publish_failure_rolls_back() {
        let registry = registry_with_device("ABC123", "sanitizerGen2");
        let dispatcher =
            CommandDispatcher::new(registry.clone(), DummyPublisher::new(true), 30_000);

        let err = dispatcher
            .dispatch("ABC123", "get_status", json!({}))
            .unwrap_err();
        assert_eq!(err.code, ServerErrorCode::PublishFailure);
        assert!(dispatcher.pending_snapshot().is_empty());
        assert!(registry.get("ABC123").unwrap().pending_commands.is_empty());
    }

    #[test]
    fn test_response_resolves_pending() {
        let registry = registry_with_device("ABC123", "sanitizerGen2");
        let dispatcher =
            CommandDispatcher::new(registry.clone(), DummyPublisher::new(false), 30_000);

        let correlation_id = dispatcher
            .dispatch("ABC123", "get_status", json!({}))
            .unwrap();

        dispatcher.resolve_response(&response_with(Some(correlation_id.as_str())));
        assert!(dispatcher.pending_snapshot().is_empty());
        assert!(registry.get("ABC123").unwrap().pending_commands.is_empty());
    }

    // 未匹配的响应不报错也不动在途集合
    #[test]
    fn test_unmatched_response_discarded() {
        let registry = registry_with_device("ABC123", "sanitizerGen2");
        let dispatcher =
            CommandDispatcher::new(registry.clone(), DummyPublisher::new(false), 30_000);

        let correlation_id = dispatcher
            .dispatch("ABC123", "get_status", json!({}))
            .unwrap();

        dispatcher.resolve_response(&response_with(Some("cmd-someone-else")));
        dispatcher.resolve_response(&response_with(None));

        let snapshot = dispatcher.pending_snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].correlation_id, correlation_id);
    }

    #[test]
    fn test_sweep_reclaims_only_expired() {
        let registry = registry_with_device("ABC123", "sanitizerGen2");
        let dispatcher =
            CommandDispatcher::new(registry.clone(), DummyPublisher::new(false), 30_000);

        dispatcher
            .dispatch("ABC123", "get_status", json!({}))
            .unwrap();

        let now = clock::now_millis();
        assert_eq!(dispatcher.sweep_timeouts(now), 0);
        assert_eq!(dispatcher.pending_snapshot().len(), 1);

        assert_eq!(dispatcher.sweep_timeouts(now + 30_001), 1);
        assert!(dispatcher.pending_snapshot().is_empty());
        assert!(registry.get("ABC123").unwrap().pending_commands.is_empty());
    }
}
