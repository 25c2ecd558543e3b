//! # Schilling Protocol
//!
//! 旋转执行器串口二进制指令集（Schilling Command List）定义（无硬件依赖）
//!
//! ## 模块
//!
//! - `command`: 指令操作码及参数宽度
//! - `constants`: 协议常量定义
//! - `frame`: 帧编码与校验和
//! - `extract`: 字节流分帧（同步/重同步）
//! - `feedback`: 应答帧解析
//!
//! ## 帧格式
//!
//! ```text
//! +--------+--------+---------+------------------+----------+
//! | marker | length | command | argument (0..4B) | checksum |
//! +--------+--------+---------+------------------+----------+
//! ```
//!
//! `length` 为包含头部和校验和在内的整帧长度。校验和使全部字节之和（mod 256）为 0。
//!
//! ## 字节序
//!
//! 协议使用大端字节序（高位在前），本模块提供了字节序转换工具函数。

pub mod command;
pub mod constants;
pub mod extract;
pub mod feedback;
pub mod frame;

// 重新导出常用类型
pub use command::*;
pub use constants::*;
pub use extract::*;
pub use feedback::*;
pub use frame::*;

use thiserror::Error;

/// 协议解析错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// 帧过短或头部不可用，无法携带校验和
    #[error("Malformed frame: {len} byte(s) cannot carry a checksum")]
    Framing { len: usize },

    #[error("Checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    Checksum { expected: u8, actual: u8 },

    /// 应答长度与当前未完成指令的预期长度不符
    #[error("Unexpected reply length for {command:?}: expected {expected}, got {actual}")]
    UnexpectedReplyLength {
        command: Command,
        expected: usize,
        actual: usize,
    },

    /// 参数超出指令参数宽度
    #[error("Argument {value} does not fit the {width}-byte argument of {command:?}")]
    InvalidArgument {
        command: Command,
        value: i64,
        width: usize,
    },

    #[error("Unknown frame marker: 0x{marker:02X}")]
    UnknownMarker { marker: u8 },
}

/// 字节序转换工具函数
///
/// 大端字节序转 i32
pub fn bytes_to_i32_be(bytes: [u8; 4]) -> i32 {
    i32::from_be_bytes(bytes)
}

/// 大端字节序转 i16
pub fn bytes_to_i16_be(bytes: [u8; 2]) -> i16 {
    i16::from_be_bytes(bytes)
}

/// 大端字节序转 u16
pub fn bytes_to_u16_be(bytes: [u8; 2]) -> u16 {
    u16::from_be_bytes(bytes)
}
