//! One-shot 会话
//!
//! 打开串口 -> 执行一个命令 -> 退出。所有等待都通过泵循环实现，
//! Ctrl+C 只置位标志，由循环在下一次迭代时退出。

use anyhow::{Context, Result};
use schilling_driver::{Actuator, ActuatorDriver, SchillingConfig};
use schilling_protocol::ControlMode;
use schilling_transport::SerialTransport;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};
use tracing::{info, warn};

const INIT_TIMEOUT: Duration = Duration::from_secs(5);
const CALIBRATION_TIMEOUT: Duration = Duration::from_secs(180);
const MOVE_TIMEOUT: Duration = Duration::from_secs(60);
/// 到位判定容差（度）
const POSITION_TOLERANCE_DEG: f64 = 0.5;

pub struct Session {
    driver: ActuatorDriver<SerialTransport>,
    running: Arc<AtomicBool>,
}

impl Session {
    pub fn connect(port: &str, baud: u32, config_path: Option<&Path>) -> Result<Self> {
        let config = match config_path {
            Some(path) => SchillingConfig::load(path)
                .with_context(|| format!("Failed to load config {}", path.display()))?,
            None => SchillingConfig::default(),
        };

        let transport = SerialTransport::open(port, baud).context("Failed to open actuator port")?;
        info!("Connected to {} at {} baud", port, baud);

        let running = Arc::new(AtomicBool::new(true));
        let r = running.clone();
        ctrlc::set_handler(move || {
            r.store(false, Ordering::SeqCst);
        })
        .context("Failed to set signal handler")?;

        Ok(Self {
            driver: ActuatorDriver::from_config(&config, transport),
            running,
        })
    }

    /// 泵循环直到条件成立
    ///
    /// `poll_status` 为真时在空闲期间持续请求状态（标定状态机依赖状态应答推进）。
    fn pump_until(
        &mut self,
        what: &str,
        timeout: Duration,
        poll_status: bool,
        mut done: impl FnMut(&mut Actuator) -> bool,
    ) -> Result<()> {
        let start = Instant::now();
        loop {
            if !self.running.load(Ordering::SeqCst) {
                anyhow::bail!("Interrupted while waiting for {}", what);
            }
            if done(self.driver.actuator_mut()) {
                return Ok(());
            }
            if start.elapsed() > timeout {
                anyhow::bail!("Timed out after {:?} waiting for {}", timeout, what);
            }
            if poll_status && self.driver.actuator().is_idle() {
                self.driver.actuator_mut().request_status()?;
            }
            match self.driver.pump() {
                Ok(()) => {},
                Err(e) if e.is_recoverable() => warn!("{}", e),
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn drain(&mut self) -> Result<()> {
        self.pump_until("command queue", INIT_TIMEOUT, false, |a| a.is_idle())
    }

    pub fn initialize(&mut self) -> Result<()> {
        self.driver.actuator_mut().init_device()?;
        self.pump_until("initialization", INIT_TIMEOUT, true, |a| a.readiness().initialized)?;
        self.drain()?;
        info!("Actuator initialized");
        Ok(())
    }

    pub fn calibrate(&mut self) -> Result<()> {
        self.driver.actuator_mut().calibrate()?;
        self.pump_until("calibration", CALIBRATION_TIMEOUT, true, |a| {
            a.readiness().calibrated
        })?;
        self.drain()
    }

    pub fn print_status(&mut self) -> Result<()> {
        self.driver.actuator_mut().request_status()?;
        self.pump_until("status", INIT_TIMEOUT, false, |a| a.has_status_update())?;

        let actuator = self.driver.actuator();
        let status = actuator.status();
        let raw = actuator.raw_status();
        println!("Control mode:   {:?}", status.control_mode);
        println!("Shaft angle:    {:.3}°", status.shaft_angle);
        println!("Shaft velocity: {:.1} rpm", status.shaft_velocity);
        println!("Shaft counts:   {}", raw.shaft_position);
        println!("Control status: {:?}", raw.control_flags());
        println!("Drive status:   {:?}", raw.drive_flags());
        println!("Encoder status: {:?}", raw.encoder_flags());
        if raw.has_fault() {
            println!("⚠️  Device reports a fault");
        }
        Ok(())
    }

    pub fn print_info(&mut self) -> Result<()> {
        self.driver.actuator_mut().request_actuator_info()?;
        self.driver.actuator_mut().request_drive_status()?;
        self.pump_until("actuator info", INIT_TIMEOUT, false, |a| a.is_idle())?;

        let actuator = self.driver.actuator();
        let info = actuator.actuator_info();
        let drive = actuator.drive_status();
        println!("Serial number:     {}", info.serial_number);
        println!("Firmware revision: {}", info.firmware_revision);
        println!("Drive status:      0x{:02X}", drive.drive_status);
        println!("Drive protect:     0x{:04X}", drive.drive_protect_status);
        println!("System protect:    0x{:04X}", drive.system_protect_status);
        Ok(())
    }

    pub fn print_boundaries(&self) {
        let bounds = self.driver.actuator().boundaries();
        println!("✅ Calibrated: [{:.3}°, {:.3}°]", bounds.min, bounds.max);
    }

    pub fn move_to(&mut self, angle: f64, speed: f64) -> Result<()> {
        let actuator = self.driver.actuator_mut();
        actuator.set_control_mode(ControlMode::Position)?;
        actuator.set_angle_pos(angle, speed)?;

        let bounds = actuator.boundaries();
        let target = angle.clamp(bounds.min, bounds.max);
        if target != angle {
            warn!("Target {:.3}° clamped to {:.3}°", angle, target);
        }

        self.pump_until("target position", MOVE_TIMEOUT, true, |a| {
            a.is_idle() && (a.status().shaft_angle - target).abs() <= POSITION_TOLERANCE_DEG
        })?;
        println!("✅ Reached {:.3}°", self.driver.actuator().status().shaft_angle);
        Ok(())
    }

    pub fn run_velocity(&mut self, rpm: f64, duration: Option<f64>) -> Result<()> {
        let actuator = self.driver.actuator_mut();
        actuator.set_control_mode(ControlMode::Velocity)?;
        actuator.set_velocity(rpm)?;
        println!("Running at {} rpm, press Ctrl+C to stop", rpm);

        let limit = match duration {
            Some(secs) => Duration::try_from_secs_f64(secs)
                .with_context(|| format!("Invalid run duration {}", secs))?,
            None => Duration::MAX,
        };
        let result = self.pump_until("velocity run", limit, true, |_| false);
        if let Err(e) = result {
            info!("Stopping: {}", e);
        }

        // 中断后仍需停止执行器
        self.running.store(true, Ordering::SeqCst);
        self.driver.actuator_mut().set_velocity(0.0)?;
        self.drain()?;
        println!("✅ Stopped at {:.3}°", self.driver.actuator().status().shaft_angle);
        Ok(())
    }
}
