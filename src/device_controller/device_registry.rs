//! 设备注册表
//! - 以 serial 为主键维护全部已发现设备
//! - 对外只发放快照副本，内部记录不出锁
//! - 设备不删除，离线用 Stale 状态表达，面板保留掉线设备的历史

use std::collections::{BTreeMap, HashSet};
use std::sync::Mutex;

use serde_json::Value;

use crate::common::error::{DeviceServerError, ServerErrorCode};
use crate::entity::dto::decoded_dto::DecodedMessageDto;
use crate::entity::dto::device_dto::{DeviceDto, DeviceStatusEnum};
use crate::info;

const LOG_TAG: &str = "device_registry";

// 注册表内部记录；serial 作为 map key 不再重复存储
struct DeviceRecord {
    family: String,
    human_name: String,
    status: DeviceStatusEnum,
    last_seen: u64,
    connected_at: u64,
    last_telemetry: Value,
    pending_commands: HashSet<String>,
}

impl DeviceRecord {
    fn to_dto(&self, serial: &str) -> DeviceDto {
        let mut pending: Vec<String> = self.pending_commands.iter().cloned().collect();
        pending.sort();
        DeviceDto {
            serial: serial.to_string(),
            family: self.family.clone(),
            human_name: self.human_name.clone(),
            status: self.status,
            last_seen: self.last_seen,
            connected_at: self.connected_at,
            last_telemetry: self.last_telemetry.clone(),
            pending_commands: pending,
        }
    }
}

pub struct DeviceRegistry {
    // BTreeMap 保证 list() 按 serial 升序，展示端顺序稳定
    devices: Mutex<BTreeMap<String, DeviceRecord>>,
    freshness_window_millis: u64,
}

impl DeviceRegistry {
    pub fn new(freshness_window_millis: u64) -> Self {
        DeviceRegistry {
            devices: Mutex::new(BTreeMap::new()),
            freshness_window_millis,
        }
    }

    /// 写入一条解码结果，未知 serial 时创建设备
    /// - anc 和 dt 都刷新活性，解码字段整体覆盖 last_telemetry
    /// - last_seen 单调不减，乱序晚到的旧消息不会把新鲜度拉回去
    /// - family 在创建时固定，serial 是设备身份
    pub fn upsert(
        &self,
        serial: &str,
        family: &str,
        decoded: &DecodedMessageDto,
        seen_at_millis: u64,
    ) {
        let mut devices = self.devices.lock().unwrap();
        match devices.get_mut(serial) {
            Some(record) => {
                record.last_telemetry = decoded.fields.clone();
                if seen_at_millis > record.last_seen {
                    record.last_seen = seen_at_millis;
                }
                record.status = DeviceStatusEnum::Online;
            }
            None => {
                info!(
                    LOG_TAG,
                    "discovered device, serial: {} family: {} schema: {}",
                    serial,
                    family,
                    decoded.schema_name
                );
                devices.insert(
                    serial.to_string(),
                    DeviceRecord {
                        family: family.to_string(),
                        human_name: format!("{} {}", family, serial),
                        status: DeviceStatusEnum::Online,
                        last_seen: seen_at_millis,
                        connected_at: seen_at_millis,
                        last_telemetry: decoded.fields.clone(),
                        pending_commands: HashSet::new(),
                    },
                );
            }
        }
    }

    /// 只刷新活性，不动 last_telemetry（指令响应证明设备在线，但
    /// 负载不是遥测读数）；未知 serial 不创建设备
    pub fn touch(&self, serial: &str, seen_at_millis: u64) {
        let mut devices = self.devices.lock().unwrap();
        if let Some(record) = devices.get_mut(serial) {
            if seen_at_millis > record.last_seen {
                record.last_seen = seen_at_millis;
            }
            record.status = DeviceStatusEnum::Online;
        }
    }

    pub fn get(&self, serial: &str) -> Result<DeviceDto, DeviceServerError> {
        let devices = self.devices.lock().unwrap();
        devices
            .get(serial)
            .map(|record| record.to_dto(serial))
            .ok_or(DeviceServerError {
                code: ServerErrorCode::UnknownDevice,
                msg: format!("device not found, serial: {}", serial),
            })
    }

    /// 全量快照，serial 升序
    pub fn list(&self) -> Vec<DeviceDto> {
        let devices = self.devices.lock().unwrap();
        devices
            .iter()
            .map(|(serial, record)| record.to_dto(serial))
            .collect()
    }

    /// 重新派生所有设备的状态，不删除任何条目
    pub fn mark_stale_sweep(&self, now_millis: u64) {
        let mut devices = self.devices.lock().unwrap();
        for record in devices.values_mut() {
            record.status = if now_millis.saturating_sub(record.last_seen)
                > self.freshness_window_millis
            {
                DeviceStatusEnum::Stale
            } else {
                DeviceStatusEnum::Online
            };
        }
    }

    /// dispatcher 登记在途指令
    pub fn add_pending(&self, serial: &str, correlation_id: &str) {
        let mut devices = self.devices.lock().unwrap();
        if let Some(record) = devices.get_mut(serial) {
            record.pending_commands.insert(correlation_id.to_string());
        }
    }

    /// dispatcher 撤销在途指令（响应已关联、发布失败回滚或超时回收）
    pub fn remove_pending(&self, serial: &str, correlation_id: &str) {
        let mut devices = self.devices.lock().unwrap();
        if let Some(record) = devices.get_mut(serial) {
            record.pending_commands.remove(correlation_id);
        }
    }
}
