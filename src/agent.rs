//! 代理主循环模块 - 周期采样、滤波、链路体检与发布的编排

use crate::config::AgentConfig;
use crate::display::DisplaySink;
use crate::filter::SmoothingFilter;
use crate::link::{LinkState, LinkSupervisor, NetworkLink};
use crate::publisher::{MessagingClient, Publisher, SessionState};
use crate::sensor::{SensorBus, SensorReader};
use anyhow::{bail, Result};
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tokio::time::sleep;
use tracing::{debug, info, warn};

/// 诊断 topic 的固定载荷
pub const SENSOR_ERROR_PAYLOAD: &str = "sensor error";

/// 四舍五入到两位小数
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// 单次迭代的结果
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// 平滑值已发布到主 topic
    Published { smoothed: f64 },
    /// 链路断开，本条读数被丢弃
    Dropped { smoothed: f64 },
    /// 发布失败，本条读数被丢弃（会话已恢复）
    PublishFailed { smoothed: f64 },
    /// 传感器缺失，滤波器未更新
    SensorAbsent,
}

/// 遥测代理
///
/// 独占持有全部组件（取代模块级单例），定义整体的
/// 存活与失败策略：可恢复错误就地无限重试，绝不让进程崩溃；
/// 唯一的致命条件是开机时完全探测不到传感器。
pub struct Agent<B, L, M, D>
where
    B: SensorBus,
    L: NetworkLink,
    M: MessagingClient,
    D: DisplaySink,
{
    /// 传感器读取器
    sensor: SensorReader<B>,
    /// 链路监护器
    link: LinkSupervisor<L>,
    /// 发布器
    publisher: Publisher<M>,
    /// 平滑滤波器
    filter: SmoothingFilter,
    /// 可选显示
    display: Option<D>,
    /// 主数据 topic
    data_topic: String,
    /// 诊断 topic
    error_topic: String,
    /// 链路检查间隔
    link_check_interval: Duration,
    /// 采样节拍
    cadence: Duration,
    /// 上次链路检查时刻
    last_link_check: Option<Instant>,
}

impl<B, L, M, D> Agent<B, L, M, D>
where
    B: SensorBus,
    L: NetworkLink,
    M: MessagingClient,
    D: DisplaySink,
{
    /// 创建代理
    pub fn new(
        config: &AgentConfig,
        sensor: SensorReader<B>,
        link: LinkSupervisor<L>,
        publisher: Publisher<M>,
        display: Option<D>,
    ) -> Self {
        Self {
            sensor,
            link,
            publisher,
            filter: SmoothingFilter::new(config.smoothing_alpha),
            display,
            data_topic: config.data_topic.clone(),
            error_topic: config.error_topic.clone(),
            link_check_interval: Duration::from_secs(config.link_check_interval_secs),
            cadence: Duration::from_secs(config.sample_interval_secs),
            last_link_check: None,
        }
    }

    /// 启动序列
    ///
    /// 依次阻塞建立链路与消息会话，然后做一次探测读取：
    /// 开机读不到传感器视为致命配置错误。探测值只用于验证
    /// 传感器在场，不进入滤波器——滤波器由稳态的第一个样本播种。
    pub async fn bootstrap(&mut self) -> Result<()> {
        self.link.ensure_connected().await;
        self.publisher.connect().await;

        if self.sensor.read().await.is_none() {
            bail!("no temperature sensor found at boot");
        }
        info!("sensor probe ok, entering steady state");

        self.last_link_check = Some(Instant::now());
        Ok(())
    }

    /// 执行一次稳态迭代
    pub async fn step(&mut self) -> StepOutcome {
        self.check_link().await;

        // 稳态下传感器缺失是可容忍的工况：发诊断、跳过滤波
        let Some(sample) = self.sensor.read().await else {
            warn!("sensor absent, skipping filter update");
            if let Err(e) = self
                .publisher
                .try_publish(&self.error_topic, SENSOR_ERROR_PAYLOAD)
                .await
            {
                debug!(error = %e, "diagnostic publish not delivered");
            }
            return StepOutcome::SensorAbsent;
        };

        let smoothed = round2(self.filter.observe(sample));
        debug!(raw = sample, smoothed, "sample filtered");

        self.render(smoothed);

        if !self.link.is_connected() {
            warn!(smoothed, "link down, reading dropped");
            return StepOutcome::Dropped { smoothed };
        }

        let payload = format!("{:.2}", smoothed);
        match self.publisher.publish(&self.data_topic, &payload).await {
            Ok(()) => StepOutcome::Published { smoothed },
            Err(e) => {
                warn!(error = %e, smoothed, "reading dropped, session restored");
                StepOutcome::PublishFailed { smoothed }
            }
        }
    }

    /// 运行主循环直到收到停机信号，然后优雅断开会话
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) -> Result<()> {
        self.bootstrap().await?;

        loop {
            if *shutdown.borrow() {
                break;
            }

            self.step().await;

            tokio::select! {
                _ = sleep(self.cadence) => {}
                _ = shutdown.changed() => break,
            }
        }

        info!("shutdown requested, disconnecting messaging session");
        self.publisher.disconnect().await;
        Ok(())
    }

    /// 周期性链路体检：到期且不连通时阻塞修复
    async fn check_link(&mut self) {
        let due = self
            .last_link_check
            .map(|t| t.elapsed() >= self.link_check_interval)
            .unwrap_or(true);
        if !due {
            return;
        }

        if !self.link.is_connected() {
            warn!("periodic link check failed, healing");
            self.link.ensure_connected().await;
        }
        self.last_link_check = Some(Instant::now());
    }

    /// 渲染到可选显示，失败忽略
    fn render(&mut self, smoothed: f64) {
        if let Some(display) = self.display.as_mut() {
            let text = format!("{:.2} C", smoothed);
            if let Err(e) = display.render(&text, 0, 0) {
                debug!(error = %e, "display render failed (ignored)");
            }
        }
    }

    /// 当前会话状态
    pub fn session_state(&self) -> SessionState {
        self.publisher.state()
    }

    /// 当前链路状态
    pub fn link_state(&self) -> LinkState {
        self.link.state()
    }

    /// 当前平滑值
    pub fn smoothed_value(&self) -> Option<f64> {
        self.filter.value()
    }
}
