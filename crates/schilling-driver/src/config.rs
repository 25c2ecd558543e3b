//! 配置
//!
//! 执行器配置（巡航速度、控制模式、回零角度）与驱动循环配置，
//! 可从 TOML 文档加载：
//!
//! ```toml
//! [actuator]
//! velocity = 1250
//! control_mode = "position"
//! home_position = 0.0
//!
//! [driver]
//! reply_timeout_ms = 500
//! ```

use crate::DriverError;
use schilling_protocol::ControlMode;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

/// 执行器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActuatorConfig {
    /// 巡航速度（RPM）
    pub velocity: i32,
    /// 用户控制模式，标定完成后恢复为该模式
    pub control_mode: ControlMode,
    /// 回零角度（度）
    pub home_position: f64,
}

impl Default for ActuatorConfig {
    fn default() -> Self {
        Self {
            velocity: 1250,
            control_mode: ControlMode::Velocity,
            home_position: 0.0,
        }
    }
}

/// 驱动循环配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// 未完成指令等待应答的超时（毫秒）
    pub reply_timeout_ms: u64,
    /// 单次读取的等待时间（毫秒）
    pub receive_timeout_ms: u64,
    /// 单次读取的最大字节数
    pub read_chunk: usize,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            reply_timeout_ms: 500,
            receive_timeout_ms: 10,
            read_chunk: 64,
        }
    }
}

impl DriverConfig {
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }

    pub fn receive_timeout(&self) -> Duration {
        Duration::from_millis(self.receive_timeout_ms)
    }
}

/// 完整配置文档
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchillingConfig {
    pub actuator: ActuatorConfig,
    pub driver: DriverConfig,
}

impl SchillingConfig {
    pub fn from_toml_str(content: &str) -> Result<Self, DriverError> {
        toml::from_str(content).map_err(|e| DriverError::Config(e.to_string()))
    }

    /// 从文件加载配置
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DriverError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .map_err(|e| DriverError::Config(format!("Failed to read {}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }

    pub fn to_toml_string(&self) -> Result<String, DriverError> {
        toml::to_string(self).map_err(|e| DriverError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = ActuatorConfig::default();
        assert_eq!(config.velocity, 1250);
        assert_eq!(config.control_mode, ControlMode::Velocity);
        assert_eq!(config.home_position, 0.0);
        assert_eq!(DriverConfig::default().reply_timeout(), Duration::from_millis(500));
    }

    #[test]
    fn test_partial_document() {
        let config = SchillingConfig::from_toml_str(
            r#"
            [actuator]
            control_mode = "position"
            home_position = -45.5
            "#,
        )
        .unwrap();
        assert_eq!(config.actuator.control_mode, ControlMode::Position);
        assert_eq!(config.actuator.home_position, -45.5);
        assert_eq!(config.actuator.velocity, 1250);
        assert_eq!(config.driver, DriverConfig::default());
    }

    #[test]
    fn test_invalid_document() {
        let err = SchillingConfig::from_toml_str("[actuator]\ncontrol_mode = \"torque\"\n").unwrap_err();
        assert!(matches!(err, DriverError::Config(_)));
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[driver]\nreply_timeout_ms = 250\nread_chunk = 16").unwrap();
        let config = SchillingConfig::load(file.path()).unwrap();
        assert_eq!(config.driver.reply_timeout_ms, 250);
        assert_eq!(config.driver.read_chunk, 16);
        assert_eq!(config.actuator, ActuatorConfig::default());
    }

    #[test]
    fn test_missing_file() {
        let err = SchillingConfig::load("/nonexistent/schilling.toml").unwrap_err();
        assert!(format!("{}", err).contains("Failed to read"));
    }

    #[test]
    fn test_toml_roundtrip() {
        let mut config = SchillingConfig::default();
        config.actuator.control_mode = ControlMode::None;
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("control_mode = \"none\""));
        assert_eq!(SchillingConfig::from_toml_str(&text).unwrap(), config);
    }
}
