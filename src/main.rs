mod common;
mod device_controller;
mod driver;
mod entity;
mod http_server;
mod mqtt_client;

use std::error::Error;
use std::sync::Arc;

use dotenv::dotenv;

use common::logger::init_logger;
use common::setting::Settings;
use device_controller::command_dispatcher::CommandDispatcher;
use device_controller::device_registry::DeviceRegistry;
use device_controller::workers::pending_sweep_thread::pending_sweep_thread;
use device_controller::workers::stale_sweep_thread::stale_sweep_thread;
use mqtt_client::client::MqttClient;

#[actix_web::main]
async fn main() -> Result<(), Box<dyn Error>> {
    // 检查 env 文件
    dotenv().ok();

    // 加载 config
    let settings = Settings::get();

    // 设置 logger
    init_logger()?;
    log::info!("配置已加载，环境: {:?}", settings.env.env);
    log::debug!("配置: {:?}", settings);

    // 设备注册表与指令分发器，bus 回调线程和 http 线程共享
    let device_registry = Arc::new(DeviceRegistry::new(
        settings.registry.freshness_window_millis,
    ));

    let mqtt_client = MqttClient::new();
    let dispatcher = Arc::new(CommandDispatcher::new(
        device_registry.clone(),
        mqtt_client.connection(),
        settings.command.pending_timeout_millis,
    ));

    // 接入总线，开始消费入站消息
    mqtt_client.start(device_registry.clone(), dispatcher.clone())?;

    // 周期检查线程
    stale_sweep_thread(
        settings.registry.stale_sweep_interval_millis,
        device_registry.clone(),
    );
    pending_sweep_thread(
        settings.command.pending_sweep_interval_millis,
        dispatcher.clone(),
    );

    // 退出时断开 mqtt 连接
    let shutdown_con = mqtt_client.connection();
    ctrlc::set_handler(move || {
        log::info!("shutting down, disconnect mqtt");
        shutdown_con.disconnect();
        std::process::exit(0);
    })?;

    // 执行 http 服务器
    http_server::server::run(device_registry, dispatcher).await?;

    Ok(())
}
