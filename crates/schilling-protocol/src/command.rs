//! 指令操作码定义
//!
//! 操作码、参数宽度以及数据类指令的应答长度均由执行器指令表确定。

use num_enum::{FromPrimitive, IntoPrimitive, TryFromPrimitive};

/// 指令操作码
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[repr(u8)]
pub enum Command {
    /// 无指令（空闲占位）
    None = 0x00,
    /// 清除错误
    ClearError = 0x03,
    /// 设置控制模式（1 字节参数）
    SetControlMode = 0x04,
    /// 读取执行器信息（序列号、固件版本）
    GetActuatorInfo = 0x05,
    /// 旧版状态读取（保留，不主动发送）
    GetOldStatus = 0x06,
    /// 清零输出轴位置（将当前位置设为原点）
    ClearShaftPosition = 0x07,
    /// 设置看门狗（2 字节参数）
    SetWatchdog = 0x09,
    /// 设置梯形速度（3 字节参数）
    SetTrapezoidalVelocity = 0x0C,
    /// 设置梯形位置（4 字节参数）
    SetTrapezoidalPosition = 0x0D,
    /// 读取位置（外部编码器 + 输出轴编码器）
    GetPosition = 0x20,
    /// 读取运行状态
    GetStatus = 0x21,
    /// 读取驱动器状态
    GetDriveStatus = 0x22,
    /// 设置速度（4 字节参数）
    SetVelocity = 0x30,
    /// 设置输出轴目标位置（4 字节参数，编码器计数）
    SetShaftPosition = 0x31,
}

impl Command {
    /// 指令参数宽度（字节）
    pub const fn arg_len(self) -> usize {
        match self {
            Command::SetControlMode => 1,
            Command::SetWatchdog => 2,
            Command::SetTrapezoidalVelocity => 3,
            Command::SetTrapezoidalPosition | Command::SetVelocity | Command::SetShaftPosition => 4,
            _ => 0,
        }
    }

    /// 数据类指令的应答帧长度
    ///
    /// 返回 `None` 表示该指令只以 ACK/NAK 应答。
    pub const fn reply_len(self) -> Option<usize> {
        match self {
            Command::GetStatus | Command::GetDriveStatus | Command::GetActuatorInfo => Some(12),
            Command::GetPosition => Some(13),
            _ => None,
        }
    }

    /// 参数值能否以 `arg_len` 字节表示
    ///
    /// 有符号和无符号两种解释都接受，例如 1 字节参数允许 -128..=255。
    pub fn fits(self, value: i64) -> bool {
        fits_width(value, self.arg_len())
    }
}

/// 参数值能否以 `width` 字节表示（有符号或无符号）
pub fn fits_width(value: i64, width: usize) -> bool {
    if width == 0 {
        return value == 0;
    }
    if width >= 8 {
        return true;
    }
    let bits = (width * 8) as u32;
    let min = -(1i64 << (bits - 1));
    let max = (1i64 << bits) - 1;
    (min..=max).contains(&value)
}

/// 控制模式（执行器寄存器镜像）
///
/// `None` 时执行器的运动指令被禁用。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
#[repr(u8)]
pub enum ControlMode {
    #[default]
    None = 0,
    Position = 1,
    Velocity = 2,
}
