//! 发布模块 - 维护消息会话并发布读数，失败后自动重建会话

use anyhow::{bail, Result};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// 会话状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// 无有效会话
    Unbound,
    /// 会话句柄有效
    Bound,
}

/// 消息客户端 trait
///
/// 抽象上层消息会话（MQTT 等）。契约：`connect` 执行完整握手，
/// 失败的握手不得留下可复用的句柄——实现必须在每次 `connect`
/// 时从配置重建内部会话。
#[allow(async_fn_in_trait)]
pub trait MessagingClient {
    /// 建立会话（完整握手）
    async fn connect(&mut self) -> Result<()>;

    /// 向指定 topic 发布载荷
    async fn publish(&mut self, topic: &str, payload: &str) -> Result<()>;

    /// 断开会话
    async fn disconnect(&mut self) -> Result<()>;
}

/// 发布器
///
/// 拥有会话状态：任何发布失败立即降级为 Unbound，
/// 然后阻塞式重连恢复会话。宁可让下一条读数最终送达，
/// 也不保证本次调用的时延上界。
pub struct Publisher<M: MessagingClient> {
    /// 底层消息客户端
    client: M,
    /// 会话状态
    state: SessionState,
    /// 握手失败后的固定退避
    backoff: Duration,
}

impl<M: MessagingClient> Publisher<M> {
    /// 默认重连退避（秒）
    const BACKOFF_SECS: u64 = 5;

    /// 创建发布器
    pub fn new(client: M) -> Self {
        Self {
            client,
            state: SessionState::Unbound,
            backoff: Duration::from_secs(Self::BACKOFF_SECS),
        }
    }

    /// 创建带自定义退避的发布器（用于测试）
    pub fn with_backoff(client: M, backoff: Duration) -> Self {
        let mut publisher = Self::new(client);
        publisher.backoff = backoff;
        publisher
    }

    /// 建立会话，已 Bound 时幂等返回
    ///
    /// 握手失败则丢弃句柄（由客户端的重建契约保证）、退避后重试，
    /// 直到成功为止。可能无限期阻塞。
    pub async fn connect(&mut self) {
        if self.state == SessionState::Bound {
            return;
        }

        loop {
            match self.client.connect().await {
                Ok(()) => {
                    self.state = SessionState::Bound;
                    info!("messaging session established");
                    return;
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        backoff_secs = self.backoff.as_secs(),
                        "messaging handshake failed, retrying"
                    );
                    sleep(self.backoff).await;
                }
            }
        }
    }

    /// 发布载荷（恢复式）
    ///
    /// 未 Bound 时先阻塞建立会话。发送失败则降级为 Unbound 并
    /// 立即阻塞重连恢复会话，然后返回错误——本条载荷被丢弃，
    /// 恢复后的会话留给下一条读数。
    pub async fn publish(&mut self, topic: &str, payload: &str) -> Result<()> {
        if self.state != SessionState::Bound {
            self.connect().await;
        }

        match self.client.publish(topic, payload).await {
            Ok(()) => {
                debug!(topic, payload, "published");
                Ok(())
            }
            Err(e) => {
                warn!(topic, error = %e, "publish failed, rebuilding session");
                self.state = SessionState::Unbound;
                self.connect().await;
                Err(e.context("publish failed, payload dropped"))
            }
        }
    }

    /// 发布载荷（尽力而为）
    ///
    /// 仅在 Bound 时尝试发送；失败降级为 Unbound 但不重连，
    /// 绝不阻塞调用方。用于诊断 topic 这类不值得为之停摆的载荷。
    pub async fn try_publish(&mut self, topic: &str, payload: &str) -> Result<()> {
        if self.state != SessionState::Bound {
            bail!("session not bound, payload skipped");
        }

        match self.client.publish(topic, payload).await {
            Ok(()) => Ok(()),
            Err(e) => {
                warn!(topic, error = %e, "best-effort publish failed");
                self.state = SessionState::Unbound;
                Err(e)
            }
        }
    }

    /// 尽力而为的优雅断开，失败只记录、不传播
    pub async fn disconnect(&mut self) {
        if let Err(e) = self.client.disconnect().await {
            warn!(error = %e, "messaging disconnect failed (ignored)");
        }
        self.state = SessionState::Unbound;
    }

    /// 当前会话状态
    pub fn state(&self) -> SessionState {
        self.state
    }
}
