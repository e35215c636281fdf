//! Temperature Telemetry Agent CLI
//!
//! 采样温度传感器、平滑读数并经 MQTT 中继到远端 broker

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;
use temp_telemetry_agent::{
    Agent, AgentConfig, ConsoleDisplay, LinkSupervisor, MqttConfig, MqttSession, Publisher,
    SensorReader, SimLink, SimSensorBus,
};
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "tta")]
#[command(about = "Temperature Telemetry Agent - 采样、平滑并经 MQTT 中继温度读数")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 运行遥测主循环
    Run {
        /// 配置文件路径（默认: 用户配置目录下的 config.json）
        #[arg(long)]
        config: Option<PathBuf>,
        /// 采样节拍（秒），覆盖配置文件
        #[arg(long, short)]
        interval: Option<u64>,
        /// Broker 主机，覆盖配置文件
        #[arg(long)]
        broker: Option<String>,
        /// 主数据 topic，覆盖配置文件
        #[arg(long)]
        topic: Option<String>,
        /// 模拟探头未接（用于演示致命的开机检查）
        #[arg(long)]
        no_sensor: bool,
    },
    /// 打印生效的配置
    Config {
        /// 配置文件路径
        #[arg(long)]
        config: Option<PathBuf>,
        /// 输出 JSON 格式
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // 初始化 tracing 日志系统
    // 通过 RUST_LOG 环境变量控制日志级别，默认为 info
    // 例如: RUST_LOG=debug tta run
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("temp_telemetry_agent=info,tta=info"));

    fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            interval,
            broker,
            topic,
            no_sensor,
        } => {
            let mut cfg = AgentConfig::load(config.as_deref())?;
            if let Some(interval) = interval {
                cfg.sample_interval_secs = interval;
            }
            if let Some(broker) = broker {
                cfg.broker_host = broker;
            }
            if let Some(topic) = topic {
                cfg.data_topic = topic;
            }

            run_agent(cfg, no_sensor).await?;
        }
        Commands::Config { config, json } => {
            let cfg = AgentConfig::load(config.as_deref())?;
            if json {
                println!("{}", serde_json::to_string_pretty(&cfg)?);
            } else {
                println!("broker:       {}:{}", cfg.broker_host, cfg.broker_port);
                println!("data topic:   {}", cfg.data_topic);
                println!("error topic:  {}", cfg.error_topic);
                println!("client id:    {}", cfg.client_id);
                println!("alpha:        {}", cfg.smoothing_alpha);
                println!("cadence:      {}s", cfg.sample_interval_secs);
                println!("link check:   {}s", cfg.link_check_interval_secs);
                println!("backoff:      {}s", cfg.reconnect_backoff_secs);
            }
        }
    }

    Ok(())
}

/// 组装组件并运行主循环，直到 Ctrl+C
async fn run_agent(cfg: AgentConfig, no_sensor: bool) -> Result<()> {
    info!(
        started_at = %chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        broker = %cfg.broker_host,
        topic = %cfg.data_topic,
        "telemetry agent starting"
    );

    let bus = if no_sensor {
        SimSensorBus::empty()
    } else {
        SimSensorBus::new()
    };
    let sensor = SensorReader::new(bus);
    let link = LinkSupervisor::new(SimLink::new(), cfg.wifi_ssid.clone(), cfg.wifi_password.clone());
    let session = MqttSession::new(MqttConfig {
        client_id: cfg.client_id.clone(),
        broker_host: cfg.broker_host.clone(),
        broker_port: cfg.broker_port,
        username: cfg.mqtt_username.clone(),
        password: cfg.mqtt_password.clone(),
        keep_alive_secs: 30,
    });
    let publisher =
        Publisher::with_backoff(session, Duration::from_secs(cfg.reconnect_backoff_secs));

    let mut agent = Agent::new(&cfg, sensor, link, publisher, Some(ConsoleDisplay::new()));

    // Ctrl+C 是唯一的正常终止路径
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        let _ = tokio::signal::ctrl_c().await;
        info!("interrupt received, shutting down");
        let _ = shutdown_tx.send(true);
    });

    agent.run(shutdown_rx).await
}
