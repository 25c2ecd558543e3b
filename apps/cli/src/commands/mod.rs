//! 运动命令参数

use anyhow::Result;
use clap::Args;
use schilling_protocol::MAX_RPM;
use std::time::Duration;

/// 移动命令参数
#[derive(Args, Debug)]
pub struct MoveCommand {
    /// 目标角度（度），超出标定边界时被截断
    #[arg(short, long, allow_hyphen_values = true)]
    pub angle: f64,

    /// 速度系数（相对配置巡航速度）
    #[arg(short, long, default_value_t = 1.0)]
    pub speed: f64,
}

impl MoveCommand {
    pub fn validate(&self) -> Result<f64> {
        if !self.angle.is_finite() {
            anyhow::bail!("Angle must be a finite number");
        }
        if !(0.0..=1.0).contains(&self.speed) || self.speed == 0.0 {
            anyhow::bail!("Speed coefficient must be in (0, 1], got {}", self.speed);
        }
        Ok(self.angle)
    }
}

/// 速度命令参数
#[derive(Args, Debug)]
pub struct VelocityCommand {
    /// 转速（RPM）
    #[arg(short, long, allow_hyphen_values = true)]
    pub rpm: f64,

    /// 运行时长（秒），结束后停止；未指定时运行到 Ctrl+C
    #[arg(short, long)]
    pub duration: Option<f64>,
}

impl VelocityCommand {
    pub fn validate(&self) -> Result<f64> {
        if !self.rpm.is_finite() || self.rpm.abs() > MAX_RPM {
            anyhow::bail!("RPM must be within ±{}, got {}", MAX_RPM, self.rpm);
        }
        if let Some(duration) = self.duration {
            if !duration.is_finite() || duration <= 0.0 {
                anyhow::bail!("Duration must be positive, got {}", duration);
            }
            if Duration::try_from_secs_f64(duration).is_err() {
                anyhow::bail!("Duration is too large, got {}", duration);
            }
        }
        Ok(self.rpm)
    }
}
