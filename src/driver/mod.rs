//! 设备驱动模块
//! - schema 目录与二进制解码
//! - 各设备族驱动实现
//! - 驱动注册表（带 generic 兜底）

pub mod schema;
pub mod traits;
pub mod sanitizer;
pub mod lights;
pub mod generic;
pub mod registry;
