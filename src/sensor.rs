//! 传感器读取模块 - 把总线 scan/convert/read 封装为可选温度样本

use anyhow::Result;
use std::time::Duration;
use tokio::time::sleep;
use tracing::debug;

/// 总线上的设备地址（one-wire ROM 码风格）
pub type DeviceAddr = u64;

/// 传感器总线 trait
///
/// 抽象物理总线驱动，允许用模拟总线替换真实硬件。
/// 任何总线级错误在读取层都折叠为"无样本"。
#[allow(async_fn_in_trait)]
pub trait SensorBus {
    /// 枚举总线上的设备地址
    async fn scan(&mut self) -> Result<Vec<DeviceAddr>>;

    /// 触发一次温度转换
    async fn start_conversion(&mut self) -> Result<()>;

    /// 读回指定地址的温度值
    async fn read(&mut self, addr: DeviceAddr) -> Result<f64>;
}

/// 传感器读取器
///
/// 读取流程：枚举地址 -> 触发转换 -> 等待固定的转换延迟 -> 读回第一个地址。
/// 总线为空和总线故障同样返回 `None`，调用方无法区分两者。
pub struct SensorReader<B: SensorBus> {
    /// 底层总线驱动
    bus: B,
    /// 转换延迟
    conversion_delay: Duration,
}

impl<B: SensorBus> SensorReader<B> {
    /// 转换延迟（毫秒）。器件固有特性，不随策略调整。
    pub const CONVERSION_DELAY_MS: u64 = 1000;

    /// 创建读取器
    pub fn new(bus: B) -> Self {
        Self {
            bus,
            conversion_delay: Duration::from_millis(Self::CONVERSION_DELAY_MS),
        }
    }

    /// 创建带自定义转换延迟的读取器（用于测试）
    pub fn with_conversion_delay(bus: B, conversion_delay: Duration) -> Self {
        Self {
            bus,
            conversion_delay,
        }
    }

    /// 读取一个温度样本
    ///
    /// 总线为空或任何总线级故障都返回 `None`——对调用方而言
    /// "探头未接"是正常工况，不是错误。
    pub async fn read(&mut self) -> Option<f64> {
        let addrs = match self.bus.scan().await {
            Ok(addrs) => addrs,
            Err(e) => {
                debug!(error = %e, "sensor bus scan failed, treating as absent");
                return None;
            }
        };

        // 总线为空：不触发转换，不等待
        let first = *addrs.first()?;

        if let Err(e) = self.bus.start_conversion().await {
            debug!(error = %e, "sensor conversion trigger failed, treating as absent");
            return None;
        }

        sleep(self.conversion_delay).await;

        // 只取第一个枚举到的传感器，不做多传感器聚合
        match self.bus.read(first).await {
            Ok(value) => Some(value),
            Err(e) => {
                debug!(addr = first, error = %e, "sensor read failed, treating as absent");
                None
            }
        }
    }
}
