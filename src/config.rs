//! 配置模块 - 部署期静态配置的加载与默认值

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// 代理配置
///
/// 部署期固定的静态值。可选地从 JSON 配置文件加载，
/// 缺失的字段取默认值。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Wi-Fi SSID
    pub wifi_ssid: String,
    /// Wi-Fi 密码
    pub wifi_password: String,
    /// MQTT broker 主机
    pub broker_host: String,
    /// MQTT broker 端口
    pub broker_port: u16,
    /// MQTT 用户名
    pub mqtt_username: String,
    /// MQTT 密码
    pub mqtt_password: String,
    /// MQTT 客户端标识
    pub client_id: String,
    /// 主数据 topic
    pub data_topic: String,
    /// 诊断 topic
    pub error_topic: String,
    /// 滤波衰减系数
    pub smoothing_alpha: f64,
    /// 采样节拍（秒）
    pub sample_interval_secs: u64,
    /// 链路检查间隔（秒）
    pub link_check_interval_secs: u64,
    /// 会话重连退避（秒）
    pub reconnect_backoff_secs: u64,
    /// 传感器总线引脚
    pub sensor_pin: u8,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            wifi_ssid: String::new(),
            wifi_password: String::new(),
            broker_host: "localhost".to_string(),
            broker_port: 1883,
            mqtt_username: String::new(),
            mqtt_password: String::new(),
            client_id: format!("tta-{}", std::process::id()),
            data_topic: "sensors/temp_out".to_string(),
            error_topic: "sensors/temp_err".to_string(),
            smoothing_alpha: 0.9,
            sample_interval_secs: 1,
            link_check_interval_secs: 10,
            reconnect_backoff_secs: 5,
            sensor_pin: 16,
        }
    }
}

impl AgentConfig {
    /// 默认配置文件路径
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("temp-telemetry-agent")
            .join("config.json")
    }

    /// 加载配置
    ///
    /// 未指定路径时使用默认路径；文件不存在则返回全默认配置。
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path
            .map(Path::to_path_buf)
            .unwrap_or_else(Self::default_config_path);

        if !path.exists() {
            debug!(path = %path.display(), "config file absent, using defaults");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config: Self = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse config file {}", path.display()))?;

        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }
}
