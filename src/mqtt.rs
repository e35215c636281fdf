//! MQTT 会话模块 - 基于 rumqttc 的消息客户端实现

use crate::publisher::MessagingClient;
use anyhow::{bail, Context, Result};
use rumqttc::{AsyncClient, ConnectReturnCode, Event, EventLoop, MqttOptions, Packet, QoS};
use std::time::Duration;
use tracing::{debug, info};

/// MQTT 会话配置
#[derive(Debug, Clone)]
pub struct MqttConfig {
    /// 客户端标识
    pub client_id: String,
    /// Broker 主机
    pub broker_host: String,
    /// Broker 端口
    pub broker_port: u16,
    /// 用户名（为空则匿名连接）
    pub username: String,
    /// 密码
    pub password: String,
    /// keep-alive 间隔（秒）
    pub keep_alive_secs: u64,
}

impl Default for MqttConfig {
    fn default() -> Self {
        Self {
            client_id: format!("tta-{}", std::process::id()),
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            username: String::new(),
            password: String::new(),
            keep_alive_secs: 30,
        }
    }
}

/// 基于 rumqttc 的 MQTT 会话
///
/// 单线程自驱动：没有后台事件循环任务，`connect` 和 `publish`
/// 自己轮询 eventloop 直到拿到 ConnAck/PubAck 或错误。
/// 每次 `connect` 都从配置重建 client 与 eventloop——失败的握手
/// 可能让句柄处于未知状态，不可复用。
pub struct MqttSession {
    /// 会话配置
    config: MqttConfig,
    /// 当前句柄，握手成功前为 None
    session: Option<(AsyncClient, EventLoop)>,
}

impl MqttSession {
    /// 请求通道容量
    const REQUEST_CAP: usize = 10;

    /// 创建会话（尚未连接）
    pub fn new(config: MqttConfig) -> Self {
        Self {
            config,
            session: None,
        }
    }
}

impl MessagingClient for MqttSession {
    async fn connect(&mut self) -> Result<()> {
        // 丢弃旧句柄，从配置重建
        self.session = None;

        let mut options = MqttOptions::new(
            &self.config.client_id,
            &self.config.broker_host,
            self.config.broker_port,
        );
        options.set_keep_alive(Duration::from_secs(self.config.keep_alive_secs));
        if !self.config.username.is_empty() {
            options.set_credentials(&self.config.username, &self.config.password);
        }

        let (client, mut eventloop) = AsyncClient::new(options, Self::REQUEST_CAP);

        debug!(
            broker = %self.config.broker_host,
            port = self.config.broker_port,
            "mqtt handshake"
        );

        loop {
            match eventloop.poll().await {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    if ack.code != ConnectReturnCode::Success {
                        bail!("broker rejected connection: {:?}", ack.code);
                    }
                    info!(broker = %self.config.broker_host, "mqtt session connected");
                    self.session = Some((client, eventloop));
                    return Ok(());
                }
                Ok(_) => {}
                Err(e) => return Err(e).context("mqtt handshake failed"),
            }
        }
    }

    async fn publish(&mut self, topic: &str, payload: &str) -> Result<()> {
        let result = match self.session.as_mut() {
            None => bail!("no active mqtt session"),
            Some((client, eventloop)) => {
                match client
                    .publish(topic, QoS::AtLeastOnce, false, payload.as_bytes().to_vec())
                    .await
                {
                    Err(e) => Err(e).context("mqtt publish enqueue failed"),
                    // 轮询到 PubAck 才算送达
                    Ok(()) => loop {
                        match eventloop.poll().await {
                            Ok(Event::Incoming(Packet::PubAck(_))) => break Ok(()),
                            Ok(_) => {}
                            Err(e) => break Err(e).context("mqtt publish failed"),
                        }
                    },
                }
            }
        };

        if result.is_err() {
            self.session = None;
        }
        result
    }

    async fn disconnect(&mut self) -> Result<()> {
        if let Some((client, _)) = self.session.take() {
            client.disconnect().await.context("mqtt disconnect failed")?;
        }
        Ok(())
    }
}
