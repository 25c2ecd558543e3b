//! 应答帧结构体定义
//!
//! 数据类指令（get-status / get-position / get-drive-status / get-actuator-info）
//! 的应答只能结合当前未完成的指令来解析：应答帧本身不携带操作码。

use crate::constants::{VELOCITY_SCALE, counts_to_angle};
use crate::{
    Command, ControlMode, ProtocolError, SchillingFrame, bytes_to_i16_be, bytes_to_i32_be,
    bytes_to_u16_be,
};
use bilge::prelude::*;

// ============================================================================
// 位域结构定义（使用 bilge）
// ============================================================================

/// 控制状态位域（get-status 应答 Byte 2）
#[bitsize(8)]
#[derive(FromBits, DebugBits, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlStatus {
    pub watchdog_timeout: bool,      // Bit 0: 看门狗超时
    pub ext_encoder_magnet: bool,    // Bit 1: 外部编码器磁场异常
    pub ext_encoder_comm: bool,      // Bit 2: 外部编码器通信异常
    pub shaft_encoder_magnet: bool,  // Bit 3: 输出轴编码器磁场异常
    pub water_ingress: bool,         // Bit 4: 进水
    pub shaft_encoder_comm: bool,    // Bit 5: 输出轴编码器通信异常
    pub reserved: u2,                // Bit 6-7: 保留
}

impl ControlStatus {
    pub fn has_fault(&self) -> bool {
        self.watchdog_timeout()
            || self.ext_encoder_magnet()
            || self.ext_encoder_comm()
            || self.shaft_encoder_magnet()
            || self.water_ingress()
            || self.shaft_encoder_comm()
    }
}

/// 驱动状态位域（get-status 应答 Byte 3）
#[bitsize(8)]
#[derive(FromBits, DebugBits, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriveStatusFlags {
    pub reserved0: bool,         // Bit 0: 保留
    pub command_incomplete: bool, // Bit 1: 指令未完成
    pub command_invalid: bool,   // Bit 2: 指令无效
    pub frame_error: bool,       // Bit 3: 帧错误
    pub voltage_temperature: bool, // Bit 4: 电压/温度故障
    pub commutation_phase: bool, // Bit 5: 换相故障
    pub reserved: u2,            // Bit 6-7: 保留
}

impl DriveStatusFlags {
    /// 指令未完成属于运动中的正常状态，不计为故障
    pub fn has_fault(&self) -> bool {
        self.command_invalid()
            || self.frame_error()
            || self.voltage_temperature()
            || self.commutation_phase()
    }
}

/// 编码器状态位域（get-position 应答 Byte 9）
#[bitsize(8)]
#[derive(FromBits, DebugBits, Clone, Copy, Default, PartialEq, Eq)]
pub struct EncoderStatus {
    pub reserved_low: u3,     // Bit 0-2: 保留
    pub linearity_alarm: bool, // Bit 3: 线性度报警
    pub range_error: bool,    // Bit 4: 量程错误
    pub reserved_high: u3,    // Bit 5-7: 保留
}

impl EncoderStatus {
    pub fn has_fault(&self) -> bool {
        self.linearity_alarm() || self.range_error()
    }
}

// ============================================================================
// 应答结构体
// ============================================================================

/// 运行状态应答（get-status，12 字节）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusReply {
    pub control_status: u8,   // Byte 2
    pub drive_status: u8,     // Byte 3
    pub control_mode: ControlMode, // Byte 4
    pub shaft_position: i32,  // Byte 5-8: 编码器计数
    pub raw_velocity: i16,    // Byte 9-10: 原始速度
}

impl StatusReply {
    pub fn control_flags(&self) -> ControlStatus {
        ControlStatus::from(self.control_status)
    }

    pub fn drive_flags(&self) -> DriveStatusFlags {
        DriveStatusFlags::from(self.drive_status)
    }

    /// 输出轴角度（度）
    pub fn shaft_angle(&self) -> f64 {
        counts_to_angle(self.shaft_position)
    }

    /// 输出轴速度（物理单位）
    pub fn shaft_velocity(&self) -> f64 {
        self.raw_velocity as f64 / VELOCITY_SCALE
    }

    fn parse(data: &[u8]) -> Self {
        Self {
            control_status: data[2],
            drive_status: data[3],
            control_mode: ControlMode::from(data[4]),
            shaft_position: bytes_to_i32_be([data[5], data[6], data[7], data[8]]),
            raw_velocity: bytes_to_i16_be([data[9], data[10]]),
        }
    }
}

/// 位置应答（get-position，13 字节）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PositionReply {
    pub ext_encoder_status: u8,  // Byte 2
    pub ext_abs_position: u16,   // Byte 3-4
    pub shaft_position: i32,     // Byte 5-8
    pub shaft_encoder_status: u8, // Byte 9
    pub shaft_abs_position: u16, // Byte 10-11
}

impl PositionReply {
    pub fn shaft_encoder_flags(&self) -> EncoderStatus {
        EncoderStatus::from(self.shaft_encoder_status)
    }

    fn parse(data: &[u8]) -> Self {
        Self {
            ext_encoder_status: data[2],
            ext_abs_position: bytes_to_u16_be([data[3], data[4]]),
            shaft_position: bytes_to_i32_be([data[5], data[6], data[7], data[8]]),
            shaft_encoder_status: data[9],
            shaft_abs_position: bytes_to_u16_be([data[10], data[11]]),
        }
    }
}

/// 驱动器状态应答（get-drive-status，12 字节）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriveStatusReply {
    pub drive_status: u8,           // Byte 2
    pub drive_protect_status: u16,  // Byte 3-4
    pub system_protect_status: u16, // Byte 5-6
    pub drive_system_status1: u16,  // Byte 7-8
    pub drive_system_status2: u16,  // Byte 9-10
}

impl DriveStatusReply {
    fn parse(data: &[u8]) -> Self {
        Self {
            drive_status: data[2],
            drive_protect_status: bytes_to_u16_be([data[3], data[4]]),
            system_protect_status: bytes_to_u16_be([data[5], data[6]]),
            drive_system_status1: bytes_to_u16_be([data[7], data[8]]),
            drive_system_status2: bytes_to_u16_be([data[9], data[10]]),
        }
    }
}

/// 执行器信息应答（get-actuator-info，12 字节）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActuatorInfoReply {
    pub serial_number: u16,    // Byte 6-7
    pub firmware_revision: u8, // Byte 8
}

impl ActuatorInfoReply {
    fn parse(data: &[u8]) -> Self {
        Self {
            serial_number: bytes_to_u16_be([data[6], data[7]]),
            firmware_revision: data[8],
        }
    }
}

/// 已解码的应答
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Status(StatusReply),
    Position(PositionReply),
    DriveStatus(DriveStatusReply),
    ActuatorInfo(ActuatorInfoReply),
}

impl Reply {
    /// 结合未完成指令解码应答帧
    ///
    /// 先校验校验和，再核对应答长度。未完成指令不属于数据类指令时返回 `Ok(None)`。
    pub fn decode(frame: &SchillingFrame, outstanding: Command) -> Result<Option<Self>, ProtocolError> {
        frame.validate()?;

        let Some(expected) = outstanding.reply_len() else {
            return Ok(None);
        };
        let actual = frame.declared_len().unwrap_or(0);
        if actual != expected || frame.len() != expected {
            return Err(ProtocolError::UnexpectedReplyLength {
                command: outstanding,
                expected,
                actual,
            });
        }

        let data = frame.as_bytes();
        let reply = match outstanding {
            Command::GetStatus => Reply::Status(StatusReply::parse(data)),
            Command::GetPosition => Reply::Position(PositionReply::parse(data)),
            Command::GetDriveStatus => Reply::DriveStatus(DriveStatusReply::parse(data)),
            Command::GetActuatorInfo => Reply::ActuatorInfo(ActuatorInfoReply::parse(data)),
            _ => return Ok(None),
        };
        Ok(Some(reply))
    }
}

/// 应答帧构建（用于测试与仿真）
///
/// 按给定标记和数据字节生成带正确长度与校验和的应答帧。
pub fn build_reply(marker: u8, data: &[u8]) -> SchillingFrame {
    let mut bytes = Vec::with_capacity(data.len() + 3);
    bytes.push(marker);
    bytes.push((data.len() + 3) as u8);
    bytes.extend_from_slice(data);
    let sum = bytes.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    bytes.push(0u8.wrapping_sub(sum));
    SchillingFrame::from_bytes(&bytes)
}

/// 构建 get-status 应答帧
pub fn build_status_reply(
    control_status: u8,
    drive_status: u8,
    control_mode: ControlMode,
    shaft_position: i32,
    raw_velocity: i16,
) -> SchillingFrame {
    let pos = shaft_position.to_be_bytes();
    let vel = raw_velocity.to_be_bytes();
    build_reply(
        crate::MARKER_REPLY_CHANGED,
        &[
            control_status,
            drive_status,
            control_mode.into(),
            pos[0],
            pos[1],
            pos[2],
            pos[3],
            vel[0],
            vel[1],
        ],
    )
}
