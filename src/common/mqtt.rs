//! MQTT 服务连接器

use std::sync::RwLock;
use std::time::Duration;

use paho_mqtt;
use crate::common::error::{DeviceServerError, ServerErrorCode};
use crate::{error, info};

const LOG_TAG : &str = "mqtt";

/// 出站消息发布接口
/// command dispatcher 经由该接口发布，测试替换为 dummy 传输
pub trait MessagePublisher: Send + Sync {
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), DeviceServerError>;
}

pub struct MqttConnection {
    /// 远程服务器地址
    host: String,

    /// 端口
    port: u16,

    // client_id
    client_id: String,

    // 出站发布等待上限
    send_timeout: Duration,

    /// 连接客户端对象
    /// 读写锁：connect / set_callback 写，publish / subscribe 读，
    /// 回调线程和 serving 线程并发访问
    client: RwLock<Option<paho_mqtt::AsyncClient>>
}

impl MqttConnection {
    pub fn new(host: &str, port: u16, client_id: &str, send_timeout_millis: u64) -> Self {
        MqttConnection {
            host: host.to_string(),
            port,
            client_id: client_id.to_string(),
            send_timeout: Duration::from_millis(send_timeout_millis),
            client: RwLock::new(None)
        }
    }

    pub fn set_callback(&self, callback: impl FnMut(&paho_mqtt::AsyncClient, Option<paho_mqtt::Message>) + Send + 'static) {
        let mut guard = self.client.write().unwrap();
        if let Some(client) = guard.as_mut() {
            client.set_message_callback(callback);
        } else {
            error!(LOG_TAG, "mqtt set_callback failed, no connection");
        }
    }

    /// init mqtt connection
    pub fn connect(&self) -> Result<(), paho_mqtt::Error> {
        let create_opts = paho_mqtt::CreateOptionsBuilder::new()
            .server_uri(format!("tcp://{}:{}", self.host.as_str(), self.port))
            .client_id(self.client_id.as_str())
            .finalize();

        let mut client = paho_mqtt::AsyncClient::new(create_opts)?;

        let conn_opts = paho_mqtt::ConnectOptionsBuilder::new()
            .keep_alive_interval(Duration::from_secs(20))
            .clean_session(true)
            .finalize();

        client.set_connection_lost_callback(|_cli| {
            error!(LOG_TAG, "*** mqtt Connection lost ***");
        });

        if let Err(e) = client.connect(conn_opts).wait() {
            error!(LOG_TAG, "cannot connect to mqtt server: {:?}", e);
            return Err(e);
        }

        info!(LOG_TAG, "mqtt connected, host: {} port: {}", self.host, self.port);
        *self.client.write().unwrap() = Some(client);

        Ok(())
    }

    /// 发布二进制消息，等待 broker 确认，超时视为发布失败
    pub fn publish_bytes(&self, topic: &str, payload: &[u8]) -> Result<(), DeviceServerError> {
        let msg = paho_mqtt::Message::new(topic, payload, paho_mqtt::QOS_1);
        let guard = self.client.read().unwrap();
        match guard.as_ref() {
            Some(client) => {
                client
                    .publish(msg)
                    .wait_for(self.send_timeout)
                    .map_err(|e| DeviceServerError {
                        code: ServerErrorCode::PublishFailure,
                        msg: format!("mqtt publish error, topic: {} err: {}", topic, e),
                    })?;
                Ok(())
            }
            None => Err(DeviceServerError {
                code: ServerErrorCode::PublishFailure,
                msg: format!("mqtt publish failed, no connection, topic: {}", topic),
            }),
        }
    }

    pub fn subscribe(&self, topic: &str) -> Result<(), paho_mqtt::Error> {
        let guard = self.client.read().unwrap();
        if let Some(client) = guard.as_ref() {
            client.subscribe(topic, 0).wait()?;
        } else {
            error!(LOG_TAG, "mqtt subscribe failed, no connection");
        }

        Ok(())
    }

    pub fn disconnect(&self) {
        let guard = self.client.read().unwrap();
        if let Some(client) = guard.as_ref() {
            let _ = client.disconnect(None).wait_for(self.send_timeout);
        }
    }
}

impl MessagePublisher for MqttConnection {
    fn publish(&self, topic: &str, payload: &[u8]) -> Result<(), DeviceServerError> {
        self.publish_bytes(topic, payload)
    }
}
