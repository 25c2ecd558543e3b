//! # Schilling Transport Layer
//!
//! 字节传输抽象层：协议引擎本身不做 I/O，由宿主通过 [`Transport`] 注入具体的传输实现。
//!
//! - `serial`: 基于 `serialport` 的串口实现（feature `serial`，默认启用）
//! - `mock`: 脚本化的内存传输，用于测试与仿真（feature `mock`）

use std::time::Duration;
use thiserror::Error;

#[cfg(feature = "serial")]
pub mod serial;

#[cfg(feature = "serial")]
pub use serial::SerialTransport;

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(any(test, feature = "mock"))]
pub use mock::MockTransport;

/// 传输层统一错误类型
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Read timeout")]
    Timeout,
    #[error("Transport closed")]
    Closed,
    #[error("Serial port error: {0}")]
    Serial(String),
}

/// 可靠、有序的字节流传输
///
/// 协议不带序号，应答与指令的对应完全依赖传输层按序交付。
pub trait Transport {
    /// 发送完整的一帧字节
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// 读取最多 `max_len` 个已到达的字节
    ///
    /// 超时内没有数据时返回空缓冲区，而不是错误。
    fn receive(&mut self, max_len: usize, timeout: Duration) -> Result<Vec<u8>, TransportError>;

    /// 丢弃输入缓冲区中尚未读取的字节
    fn flush_input(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for Box<T> {
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        (**self).send(bytes)
    }

    fn receive(&mut self, max_len: usize, timeout: Duration) -> Result<Vec<u8>, TransportError> {
        (**self).receive(max_len, timeout)
    }

    fn flush_input(&mut self) -> Result<(), TransportError> {
        (**self).flush_input()
    }
}
