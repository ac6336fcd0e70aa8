//! device driver factory registry
//! 静态映射，进程启动后不再变更，并发 resolve 无需加锁

use super::generic::GenericDriver;
use super::lights::LightsDriver;
use super::sanitizer::SanitizerGen2Driver;
use super::schema::{FAMILY_LIGHTS, FAMILY_LIGHTS_TRANSFORMER, FAMILY_SANITIZER_GEN2};
use super::traits::DeviceDriver;

/// resolve 为全函数：未注册族返回绑定该族的 generic 驱动，
/// 设备仍以"已发现、类型未知"的形式进入注册表，不静默丢失
pub fn resolve(family: &str) -> Box<dyn DeviceDriver> {
    match family {
        FAMILY_SANITIZER_GEN2 => Box::new(SanitizerGen2Driver::new()),
        FAMILY_LIGHTS | FAMILY_LIGHTS_TRANSFORMER => Box::new(LightsDriver::new(family)),
        _ => Box::new(GenericDriver::new(family)),
    }
}

/// 已注册专属驱动的设备族，serving 层用于能力自描述
pub fn known_families() -> Vec<&'static str> {
    vec![
        FAMILY_SANITIZER_GEN2,
        FAMILY_LIGHTS,
        FAMILY_LIGHTS_TRANSFORMER,
    ]
}
