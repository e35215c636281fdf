//! 模拟适配器模块 - 宿主机上的合成传感器与链路
//!
//! 真实硬件驱动（one-wire 总线、Wi-Fi 驱动）在同样的 trait 边界接入；
//! 这里的实现用于开发机运行和演示。

use crate::link::NetworkLink;
use crate::sensor::{DeviceAddr, SensorBus};
use anyhow::Result;

/// 合成温度的模拟总线
///
/// 围绕基准温度产生缓慢的正弦波动。
pub struct SimSensorBus {
    /// 枚举返回的设备地址
    addrs: Vec<DeviceAddr>,
    /// 基准温度
    base: f64,
    /// 波动幅度
    amplitude: f64,
    /// 已读取次数
    tick: u64,
}

impl SimSensorBus {
    /// 创建带一个模拟探头的总线
    pub fn new() -> Self {
        Self {
            addrs: vec![0x28_0000_0042],
            base: 21.0,
            amplitude: 1.5,
            tick: 0,
        }
    }

    /// 创建空总线（模拟探头未接）
    pub fn empty() -> Self {
        Self {
            addrs: Vec::new(),
            ..Self::new()
        }
    }
}

impl Default for SimSensorBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorBus for SimSensorBus {
    async fn scan(&mut self) -> Result<Vec<DeviceAddr>> {
        Ok(self.addrs.clone())
    }

    async fn start_conversion(&mut self) -> Result<()> {
        Ok(())
    }

    async fn read(&mut self, _addr: DeviceAddr) -> Result<f64> {
        let value = self.base + self.amplitude * (self.tick as f64 * 0.05).sin();
        self.tick += 1;
        Ok(value)
    }
}

/// 模拟链路
///
/// 初始为断开，`begin_connect` 后即连通；可手动压下模拟断网。
pub struct SimLink {
    /// 当前是否连通
    up: bool,
}

impl SimLink {
    /// 创建模拟链路（初始断开）
    pub fn new() -> Self {
        Self { up: false }
    }

    /// 压下链路（模拟断网）
    pub fn take_down(&mut self) {
        self.up = false;
    }
}

impl Default for SimLink {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkLink for SimLink {
    async fn activate(&mut self) {}

    async fn begin_connect(&mut self, _ssid: &str, _credential: &str) {
        self.up = true;
    }

    fn is_connected(&self) -> bool {
        self.up
    }
}
