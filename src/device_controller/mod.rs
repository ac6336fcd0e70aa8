//! 设备状态管理模块
//! - 维护已发现设备的注册表
//! - 指令下发与响应关联
//! - 定期检查设备与在途指令状态

pub mod device_registry;
pub mod command_dispatcher;
pub mod workers;
