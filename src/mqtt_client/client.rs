use std::sync::Arc;

use super::message_listener::on_message;
use super::protocol::Protocol;
use crate::common::error::{DeviceServerError, ServerErrorCode};
use crate::common::mqtt;
use crate::common::setting::Settings;
use crate::device_controller::command_dispatcher::CommandDispatcher;
use crate::device_controller::device_registry::DeviceRegistry;
use crate::{error, info, warn};

const LOG_TAG: &str = "mqtt_client";

pub struct MqttClient {
    // mqtt connection，与 command dispatcher 共享，后者经由
    // MessagePublisher 接口发布出站指令
    con: Arc<mqtt::MqttConnection>,
}

impl MqttClient {
    pub fn new() -> Self {
        let setting = Settings::get();
        MqttClient {
            con: Arc::new(mqtt::MqttConnection::new(
                setting.mqtt.broker_host.as_str(),
                setting
                    .mqtt
                    .broker_port
                    .try_into()
                    .expect("mqtt broker port data type error, is not u16"),
                setting.mqtt.client_id.as_str(),
                setting.mqtt.send_timeout_millis,
            )),
        }
    }

    pub fn connection(&self) -> Arc<mqtt::MqttConnection> {
        self.con.clone()
    }

    /// 连接 broker，注册入站回调并订阅入站类别 topic
    /// 回调在 paho 自己的线程上运行，与 serving 线程并发访问注册表
    pub fn start(
        &self,
        device_registry: Arc<DeviceRegistry>,
        dispatcher: Arc<CommandDispatcher>,
    ) -> Result<(), DeviceServerError> {
        self.con.connect().map_err(|e| DeviceServerError {
            code: ServerErrorCode::MqttError,
            msg: format!("mqtt connect error: {e}"),
        })?;

        self.con.set_callback(move |_cli, msg| {
            if let Some(msg) = msg {
                let topic = msg.topic().to_string();
                match on_message(
                    topic.as_str(),
                    msg.payload(),
                    device_registry.as_ref(),
                    dispatcher.as_ref(),
                ) {
                    Ok(_) => {}
                    Err(e) => {
                        // 单条消息失败只记日志，消费不中断
                        error!(LOG_TAG, "inbound message dropped, topic: {} err: {}", topic, e);
                    }
                }
            } else {
                warn!(LOG_TAG, "mqtt message callback on none message");
            }
        });

        self.subscribe_topics()?;

        let setting = Settings::get();
        info!(
            LOG_TAG,
            "mqtt connect done, host: {} port: {}, waiting for inbound messages",
            setting.mqtt.broker_host,
            setting.mqtt.broker_port
        );
        Ok(())
    }

    /// register predefined topics
    fn subscribe_topics(&self) -> Result<(), DeviceServerError> {
        for filter in Protocol::inbound_topic_filters() {
            info!(LOG_TAG, "mqtt subscribe topic: {}", filter);
            self.con
                .subscribe(filter.as_str())
                .map_err(|e| DeviceServerError {
                    code: ServerErrorCode::MqttError,
                    msg: format!("mqtt subscribe error: {e}"),
                })?;
        }
        Ok(())
    }
}
