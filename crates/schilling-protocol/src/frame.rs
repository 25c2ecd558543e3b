//! 帧编码与校验和
//!
//! 指令帧：`[marker, length, command, arg.., checksum]`，`length = 4 + arg_len`。
//! 应答帧：`[marker, length, data.., checksum]`，第 3 字节起即为数据。
//! ACK / NAK 为不带校验和的单字节帧。

use crate::constants::*;
use crate::{Command, ProtocolError};
use smallvec::SmallVec;

/// 帧字节缓冲区
///
/// 最长帧 16 字节，栈上存放，避免每帧一次堆分配。
pub type FrameBytes = SmallVec<[u8; MAX_FRAME_LEN]>;

/// 一条完整的协议消息（指令帧、应答帧或单字节 ACK/NAK）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchillingFrame {
    bytes: FrameBytes,
}

impl SchillingFrame {
    /// 编码指令帧
    ///
    /// `value` 按大端补码写入低 `arg_len` 字节，超出宽度的高位被静默丢弃
    /// （与执行器行为一致，宽度检查由调用方负责）。
    pub fn encode(command: Command, value: i64, arg_len: usize) -> Self {
        let arg_len = arg_len.min(size_of::<i64>());
        let length = MIN_FRAME_LEN + arg_len;

        let mut bytes = FrameBytes::with_capacity(length);
        bytes.push(MARKER_COMMAND);
        bytes.push(length as u8);
        bytes.push(command.into());
        let be = value.to_be_bytes();
        bytes.extend_from_slice(&be[be.len() - arg_len..]);
        bytes.push(0);

        let last = bytes.len() - 1;
        bytes[last] = checksum_of(&bytes[..last]);
        Self { bytes }
    }

    /// 从接收到的原始字节构造帧（不做校验）
    pub fn from_bytes(data: &[u8]) -> Self {
        Self {
            bytes: FrameBytes::from_slice(data),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// 首字节（帧标记或 ACK/NAK）
    pub fn marker(&self) -> Option<u8> {
        self.bytes.first().copied()
    }

    /// 头部声明的帧长度
    pub fn declared_len(&self) -> Option<usize> {
        self.bytes.get(1).map(|&len| len as usize)
    }

    /// 指令帧的操作码
    ///
    /// 应答帧第 3 字节是数据而非操作码，此时返回值无意义。
    pub fn command(&self) -> Option<Command> {
        self.bytes.get(2).and_then(|&op| Command::try_from(op).ok())
    }

    /// 指令帧的参数字节
    pub fn payload(&self) -> &[u8] {
        if self.bytes.len() < MIN_FRAME_LEN {
            return &[];
        }
        &self.bytes[HEADER_LEN..self.bytes.len() - 1]
    }

    /// 指令帧参数解码为有符号整数（大端，按宽度符号扩展）
    pub fn argument(&self) -> i64 {
        let payload = self.payload();
        if payload.is_empty() {
            return 0;
        }
        let mut value: i64 = if payload[0] & 0x80 != 0 { -1 } else { 0 };
        for &b in payload {
            value = (value << 8) | b as i64;
        }
        value
    }

    pub fn checksum(&self) -> Option<u8> {
        self.bytes.last().copied()
    }

    pub fn is_ack(&self) -> bool {
        self.bytes.as_slice() == [ACK]
    }

    pub fn is_nak(&self) -> bool {
        self.bytes.as_slice() == [NAK]
    }

    /// 校验整帧
    pub fn validate(&self) -> Result<(), ProtocolError> {
        validate_checksum(&self.bytes)
    }
}

impl AsRef<[u8]> for SchillingFrame {
    fn as_ref(&self) -> &[u8] {
        &self.bytes
    }
}

fn checksum_of(data: &[u8]) -> u8 {
    let sum = data.iter().fold(0u8, |acc, &b| acc.wrapping_add(b));
    0u8.wrapping_sub(sum)
}

/// 计算帧校验和
///
/// 对除最后一个字节外的全部字节求和（mod 256），校验和 = (256 - sum) mod 256。
pub fn compute_checksum(frame: &[u8]) -> Result<u8, ProtocolError> {
    if frame.len() < 2 {
        return Err(ProtocolError::Framing { len: frame.len() });
    }
    Ok(checksum_of(&frame[..frame.len() - 1]))
}

/// 校验帧末字节是否为正确的校验和
pub fn validate_checksum(frame: &[u8]) -> Result<(), ProtocolError> {
    let expected = compute_checksum(frame)?;
    let actual = frame[frame.len() - 1];
    if expected != actual {
        return Err(ProtocolError::Checksum { expected, actual });
    }
    Ok(())
}
