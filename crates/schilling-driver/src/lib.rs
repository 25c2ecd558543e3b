//! # Schilling Driver
//!
//! 旋转执行器协议引擎，包括：
//! - 指令队列（单条未完成指令约束）
//! - 应答解码与状态持有
//! - 标定状态机（寻找机械限位、回零）
//! - 泵循环驱动（组合任意 [`Transport`](schilling_transport::Transport)）
//!
//! # 示例
//!
//! ```no_run
//! use schilling_driver::{ActuatorDriver, SchillingConfig};
//! use schilling_transport::SerialTransport;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = SchillingConfig::default();
//! let transport = SerialTransport::open("/dev/ttyUSB0", 57600)?;
//! let mut driver = ActuatorDriver::from_config(&config, transport);
//! driver.actuator_mut().init_device()?;
//! driver.pump_until_idle(1000)?;
//! # Ok(())
//! # }
//! ```

mod actuator;
pub mod calibration;
pub mod config;
mod driver;
mod error;
pub mod queue;
pub mod state;

pub use actuator::Actuator;
pub use calibration::{CALIBRATION_VELOCITY_COEFF, STILLNESS_THRESHOLD, StillnessDetector};
pub use config::{ActuatorConfig, DriverConfig, SchillingConfig};
pub use driver::ActuatorDriver;
pub use error::DriverError;
pub use queue::CommandQueue;
pub use state::*;
