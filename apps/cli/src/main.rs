//! # Schilling CLI
//!
//! Command-line host for a single Schilling rotary actuator on a serial port.
//!
//! ```bash
//! # 初始化并读取一次状态
//! schilling-cli --port /dev/ttyUSB0 status
//!
//! # 标定（寻找机械限位并回零）
//! schilling-cli --port /dev/ttyUSB0 --config actuator.toml calibrate
//!
//! # 标定后移动到 45°
//! schilling-cli --port /dev/ttyUSB0 move --angle 45
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;
mod session;

use commands::{MoveCommand, VelocityCommand};
use session::Session;

/// Schilling CLI - 旋转执行器命令行工具
#[derive(Parser, Debug)]
#[command(name = "schilling-cli")]
#[command(about = "Command-line host for Schilling rotary actuators", long_about = None)]
#[command(version)]
struct Cli {
    /// 串口设备
    #[arg(short, long, global = true, default_value = "/dev/ttyUSB0")]
    port: String,

    /// 波特率
    #[arg(short, long, global = true, default_value_t = 57600)]
    baud: u32,

    /// TOML 配置文件
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 初始化并打印一次状态
    Status,

    /// 读取执行器信息（序列号、固件版本）
    Info,

    /// 标定行程边界并回零
    Calibrate,

    /// 标定后移动到目标角度
    Move {
        #[command(flatten)]
        args: MoveCommand,
    },

    /// 以给定转速运行
    Velocity {
        #[command(flatten)]
        args: VelocityCommand,
    },
}

fn main() -> Result<()> {
    // 初始化日志
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                tracing_subscriber::EnvFilter::new("schilling_cli=info,schilling_driver=info")
            }),
        )
        .init();

    let cli = Cli::parse();
    let mut session = Session::connect(&cli.port, cli.baud, cli.config.as_deref())?;

    match cli.command {
        Commands::Status => {
            session.initialize()?;
            session.print_status()
        },

        Commands::Info => {
            session.initialize()?;
            session.print_info()
        },

        Commands::Calibrate => {
            session.initialize()?;
            session.calibrate()?;
            session.print_boundaries();
            Ok(())
        },

        Commands::Move { args } => {
            let angle = args.validate()?;
            session.initialize()?;
            session.calibrate()?;
            session.move_to(angle, args.speed)
        },

        Commands::Velocity { args } => {
            let rpm = args.validate()?;
            session.initialize()?;
            session.calibrate()?;
            session.run_velocity(rpm, args.duration)
        },
    }
}
