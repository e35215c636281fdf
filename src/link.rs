//! 链路监护模块 - 维护并修复下层网络连接

use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

/// 链路状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    /// 未连接
    Disconnected,
    /// 连接中
    Connecting,
    /// 已连接
    Connected,
}

/// 网络链路 trait
///
/// 抽象下层连接原语（Wi-Fi 驱动等）。连接是"请求后轮询"式的：
/// `begin_connect` 只发起请求，是否成功由 `is_connected` 确认。
#[allow(async_fn_in_trait)]
pub trait NetworkLink {
    /// 激活链路硬件
    async fn activate(&mut self);

    /// 发起连接请求（不等待完成）
    async fn begin_connect(&mut self, ssid: &str, credential: &str);

    /// 当前是否已连接（非阻塞）
    fn is_connected(&self) -> bool;
}

/// 链路监护器
///
/// 状态转移只由显式的连接调用和周期性活性检查驱动。
/// 重试节奏由本组件负责：失败检查之间至少间隔 1 秒，避免对驱动紧循环。
pub struct LinkSupervisor<L: NetworkLink> {
    /// 底层链路
    link: L,
    /// 当前状态
    state: LinkState,
    /// SSID
    ssid: String,
    /// 接入凭据
    credential: String,
    /// 连接轮询间隔
    poll_interval: Duration,
}

impl<L: NetworkLink> LinkSupervisor<L> {
    /// 默认轮询间隔（秒）
    const POLL_INTERVAL_SECS: u64 = 1;

    /// 创建监护器
    pub fn new(link: L, ssid: impl Into<String>, credential: impl Into<String>) -> Self {
        Self {
            link,
            state: LinkState::Disconnected,
            ssid: ssid.into(),
            credential: credential.into(),
            poll_interval: Duration::from_secs(Self::POLL_INTERVAL_SECS),
        }
    }

    /// 创建带自定义轮询间隔的监护器（用于测试）
    pub fn with_poll_interval(
        link: L,
        ssid: impl Into<String>,
        credential: impl Into<String>,
        poll_interval: Duration,
    ) -> Self {
        let mut supervisor = Self::new(link, ssid, credential);
        supervisor.poll_interval = poll_interval;
        supervisor
    }

    /// 确保链路已连接，未连接则阻塞直到恢复
    ///
    /// 后置条件：返回时 `is_connected()` 必为 true。
    /// 若下层始终不可达，本调用会无限期阻塞——设备在无链路时
    /// 没有其他有用工作，调用方需自行限制调用频率。
    pub async fn ensure_connected(&mut self) {
        if self.link.is_connected() {
            self.state = LinkState::Connected;
            return;
        }

        self.state = LinkState::Disconnected;
        warn!(ssid = %self.ssid, "link down, reconnecting");

        self.state = LinkState::Connecting;
        self.link.activate().await;
        self.link.begin_connect(&self.ssid, &self.credential).await;

        while !self.link.is_connected() {
            sleep(self.poll_interval).await;
        }

        self.state = LinkState::Connected;
        info!(ssid = %self.ssid, "link connected");
    }

    /// 非阻塞的连接状态检查，不改变监护器状态
    pub fn is_connected(&self) -> bool {
        self.link.is_connected()
    }

    /// 当前监护器状态
    pub fn state(&self) -> LinkState {
        self.state
    }
}
