//! Temperature Telemetry Agent - 采样、平滑并经 MQTT 中继温度读数
//!
//! 韧性内核：监护状态机让采样、滤波、发布在网络栈、broker 连接、
//! 传感器总线的任意瞬态故障下持续存活，永不无限阻塞整个进程，
//! 也不丢失滤波状态。外部协作者（总线驱动、链路原语、消息客户端、
//! 可选显示）只在 trait 边界出现。

pub mod agent;
pub mod config;
pub mod display;
pub mod filter;
pub mod link;
pub mod mqtt;
pub mod publisher;
pub mod sensor;
pub mod sim;

pub use agent::{round2, Agent, StepOutcome, SENSOR_ERROR_PAYLOAD};
pub use config::AgentConfig;
pub use display::{ConsoleDisplay, DisplaySink};
pub use filter::SmoothingFilter;
pub use link::{LinkState, LinkSupervisor, NetworkLink};
pub use mqtt::{MqttConfig, MqttSession};
pub use publisher::{MessagingClient, Publisher, SessionState};
pub use sensor::{DeviceAddr, SensorBus, SensorReader};
pub use sim::{SimLink, SimSensorBus};
