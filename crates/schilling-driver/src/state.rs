//! 执行器状态定义
//!
//! 所有状态记录由 [`Actuator`](crate::Actuator) 独占持有，每次收到对应应答时整体覆盖。

use schilling_protocol::{
    ActuatorInfoReply, ControlMode, ControlStatus, DriveStatusFlags, DriveStatusReply, EncoderStatus,
    PositionReply, StatusReply,
};
use std::time::{SystemTime, UNIX_EPOCH};

/// 当前时间（微秒，Unix 纪元）
pub(crate) fn now_us() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros() as u64)
        .unwrap_or(0)
}

/// 运行状态（来自 get-status）
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OperationalStatus {
    pub timestamp_us: u64,
    pub control_mode: ControlMode,
    /// 输出轴角度（度）
    pub shaft_angle: f64,
    /// 输出轴速度（RPM）
    pub shaft_velocity: f64,
}

/// 原始设备状态
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawDeviceStatus {
    pub timestamp_us: u64,
    pub control_status: u8,
    pub drive_status: u8,
    /// 输出轴编码器状态（来自 get-position）
    pub encoder_status: u8,
    /// 输出轴位置（编码器计数）
    pub shaft_position: i32,
}

impl RawDeviceStatus {
    pub fn control_flags(&self) -> ControlStatus {
        ControlStatus::from(self.control_status)
    }

    pub fn drive_flags(&self) -> DriveStatusFlags {
        DriveStatusFlags::from(self.drive_status)
    }

    pub fn encoder_flags(&self) -> EncoderStatus {
        EncoderStatus::from(self.encoder_status)
    }

    pub fn has_fault(&self) -> bool {
        self.control_flags().has_fault() || self.drive_flags().has_fault() || self.encoder_flags().has_fault()
    }
}

/// 扩展位置（来自 get-position）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExtendedPosition {
    pub timestamp_us: u64,
    pub ext_encoder_status: u8,
    pub ext_abs_position: u16,
    pub shaft_position: i32,
    pub shaft_encoder_status: u8,
    pub shaft_abs_position: u16,
}

impl From<(PositionReply, u64)> for ExtendedPosition {
    fn from((reply, timestamp_us): (PositionReply, u64)) -> Self {
        Self {
            timestamp_us,
            ext_encoder_status: reply.ext_encoder_status,
            ext_abs_position: reply.ext_abs_position,
            shaft_position: reply.shaft_position,
            shaft_encoder_status: reply.shaft_encoder_status,
            shaft_abs_position: reply.shaft_abs_position,
        }
    }
}

/// 驱动器状态（来自 get-drive-status）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriveStatus {
    pub timestamp_us: u64,
    pub drive_status: u8,
    pub drive_protect_status: u16,
    pub system_protect_status: u16,
    pub drive_system_status1: u16,
    pub drive_system_status2: u16,
}

impl From<(DriveStatusReply, u64)> for DriveStatus {
    fn from((reply, timestamp_us): (DriveStatusReply, u64)) -> Self {
        Self {
            timestamp_us,
            drive_status: reply.drive_status,
            drive_protect_status: reply.drive_protect_status,
            system_protect_status: reply.system_protect_status,
            drive_system_status1: reply.drive_system_status1,
            drive_system_status2: reply.drive_system_status2,
        }
    }
}

/// 执行器信息（来自 get-actuator-info）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActuatorInfo {
    pub timestamp_us: u64,
    pub serial_number: u16,
    pub firmware_revision: u8,
}

impl From<(ActuatorInfoReply, u64)> for ActuatorInfo {
    fn from((reply, timestamp_us): (ActuatorInfoReply, u64)) -> Self {
        Self {
            timestamp_us,
            serial_number: reply.serial_number,
            firmware_revision: reply.firmware_revision,
        }
    }
}

pub(crate) fn operational_from(reply: &StatusReply, timestamp_us: u64) -> OperationalStatus {
    OperationalStatus {
        timestamp_us,
        control_mode: reply.control_mode,
        shaft_angle: reply.shaft_angle(),
        shaft_velocity: reply.shaft_velocity(),
    }
}

/// 标定得到的行程边界（度）
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct CalibrationBoundaries {
    pub min: f64,
    pub max: f64,
}

impl CalibrationBoundaries {
    pub fn contains(&self, angle: f64) -> bool {
        (self.min..=self.max).contains(&angle)
    }
}

/// 标定/就绪状态机的阶段
///
/// 变体顺序即状态推进顺序，`Ord` 比较依赖该顺序。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RunState {
    #[default]
    Reset,
    Init,
    Initialized,
    FindMin,
    FindMax,
    SetZero,
    GoHome,
    Running,
}

impl RunState {
    /// 处于 Initialized 与 Running 之间（标定进行中）
    pub fn is_calibrating(self) -> bool {
        self > RunState::Initialized && self < RunState::Running
    }
}

/// 就绪标志
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReadinessFlags {
    pub initialized: bool,
    pub calibrated: bool,
}

impl ReadinessFlags {
    /// 两个标志都为真时运动指令才被认为是安全的
    pub fn is_ready(&self) -> bool {
        self.initialized && self.calibrated
    }
}

/// 应答到达标志（读取即清除）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct UpdateFlags {
    pub status: bool,
    pub position: bool,
    pub drive_status: bool,
    pub act_info: bool,
}
