//! 集成测试公共设施：仿真执行器
//!
//! `SimulatedActuator` 作为 `MockTransport` 的应答器，按指令表回复 ACK 或数据应答。
//! 输出轴在每次 get-status 时向目标移动一步，并被机械限位截住。

#![allow(dead_code)]

use schilling_driver::{Actuator, ActuatorConfig, ActuatorDriver, DriverConfig};
use schilling_protocol::{
    ACK, Command, ControlMode, MARKER_REPLY_CHANGED, MARKER_REPLY_UNCHANGED, NAK, SchillingFrame,
    build_reply, build_status_reply,
};
use schilling_transport::MockTransport;
use std::sync::{Arc, Mutex, MutexGuard};

pub struct SimulatedActuator {
    /// 绝对位置（编码器计数）
    pub position: i32,
    /// clear-shaft-position 设定的原点（绝对计数）
    pub origin: i32,
    pub target: i32,
    pub limits: (i32, i32),
    /// 每次 get-status 的最大移动量
    pub step: i32,
    pub control_mode: ControlMode,
    /// 为真时输出轴不动，位置完全由测试设定
    pub frozen: bool,
    /// 下一次遇到该指令时回复 NAK
    pub nak_on: Option<Command>,
    pub received: Vec<Command>,
}

impl SimulatedActuator {
    pub fn new(limits: (i32, i32)) -> Self {
        Self {
            position: 0,
            origin: 0,
            target: 0,
            limits,
            step: 20_000,
            control_mode: ControlMode::None,
            frozen: false,
            nak_on: None,
            received: Vec::new(),
        }
    }

    /// 相对原点的位置（执行器上报值）
    pub fn reported_position(&self) -> i32 {
        self.position - self.origin
    }

    fn advance(&mut self) {
        if self.frozen {
            return;
        }
        let delta = (self.target - self.position).clamp(-self.step, self.step);
        self.position = (self.position + delta).clamp(self.limits.0, self.limits.1);
    }

    pub fn respond(&mut self, bytes: &[u8]) -> Vec<u8> {
        let frame = SchillingFrame::from_bytes(bytes);
        if frame.validate().is_err() {
            return vec![NAK];
        }
        let Some(command) = frame.command() else {
            return vec![NAK];
        };
        self.received.push(command);
        if self.nak_on == Some(command) {
            self.nak_on = None;
            return vec![NAK];
        }

        match command {
            Command::GetStatus => {
                self.advance();
                build_status_reply(0, 0, self.control_mode, self.reported_position(), 0)
                    .as_bytes()
                    .to_vec()
            },
            Command::GetPosition => {
                let pos = self.reported_position().to_be_bytes();
                build_reply(
                    MARKER_REPLY_UNCHANGED,
                    &[0x00, 0x01, 0x00, pos[0], pos[1], pos[2], pos[3], 0x00, 0x02, 0x00],
                )
                .as_bytes()
                .to_vec()
            },
            Command::GetDriveStatus => build_reply(
                MARKER_REPLY_UNCHANGED,
                &[0x00, 0x00, 0x10, 0x00, 0x20, 0x00, 0x30, 0x00, 0x40],
            )
            .as_bytes()
            .to_vec(),
            Command::GetActuatorInfo => build_reply(
                MARKER_REPLY_CHANGED,
                &[0x00, 0x00, 0x00, 0x00, 0x30, 0x39, 0x11, 0x00, 0x00],
            )
            .as_bytes()
            .to_vec(),
            Command::SetShaftPosition => {
                let target = frame.argument() as i32 + self.origin;
                self.target = target.clamp(self.limits.0, self.limits.1);
                vec![ACK]
            },
            Command::ClearShaftPosition => {
                self.origin = self.position;
                self.target = self.position;
                vec![ACK]
            },
            Command::SetControlMode => {
                self.control_mode = ControlMode::from(frame.argument() as u8);
                vec![ACK]
            },
            _ => vec![ACK],
        }
    }
}

pub type SharedSim = Arc<Mutex<SimulatedActuator>>;

pub fn lock(sim: &SharedSim) -> MutexGuard<'_, SimulatedActuator> {
    sim.lock().unwrap()
}

/// 构建连接到仿真执行器的驱动
pub fn simulated_driver(
    config: ActuatorConfig,
    limits: (i32, i32),
) -> (ActuatorDriver<MockTransport>, MockTransport, SharedSim) {
    let sim = Arc::new(Mutex::new(SimulatedActuator::new(limits)));
    let mock = MockTransport::new();
    let responder_sim = Arc::clone(&sim);
    mock.set_responder(move |bytes| responder_sim.lock().unwrap().respond(bytes));
    let driver = ActuatorDriver::new(Actuator::new(config), mock.clone(), DriverConfig::default());
    (driver, mock, sim)
}

/// 宿主循环：空闲时请求状态，直到条件成立或循环次数用完
pub fn run_until(
    driver: &mut ActuatorDriver<MockTransport>,
    max_cycles: usize,
    mut done: impl FnMut(&Actuator) -> bool,
) -> bool {
    for _ in 0..max_cycles {
        if done(driver.actuator()) {
            return true;
        }
        if driver.actuator().is_idle() {
            driver.actuator_mut().request_status().unwrap();
        }
        driver.pump().unwrap();
    }
    done(driver.actuator())
}

/// 执行一次 get-status 轮询（连同排在前面的指令一起处理完）
pub fn poll_status(driver: &mut ActuatorDriver<MockTransport>) {
    driver.actuator_mut().request_status().unwrap();
    let cycles = driver.pump_until_idle(64).unwrap();
    assert!(cycles.is_some(), "driver did not become idle");
}

/// 初始化并等待进入 Initialized
pub fn initialize(driver: &mut ActuatorDriver<MockTransport>) {
    driver.actuator_mut().init_device().unwrap();
    assert!(run_until(driver, 64, |a| a.readiness().initialized));
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("schilling_driver=debug")),
        )
        .with_test_writer()
        .try_init();
}
