//! 驱动层错误类型定义

use schilling_protocol::{Command, ProtocolError};
use schilling_transport::TransportError;
use std::time::Duration;
use thiserror::Error;

/// 驱动层错误类型
///
/// 除传输层断开和配置错误外，其余错误都只影响单帧或单条指令，
/// 引擎状态保持一致，由宿主决定重试、复位还是上报。
#[derive(Error, Debug)]
pub enum DriverError {
    /// 协议错误（分帧、校验和、应答长度、参数宽度）
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 传输层错误
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// 执行器以 NAK 拒绝了指令
    #[error("Device rejected {command:?} (NAK)")]
    DeviceRejected { command: Command },

    /// 未完成指令在超时时间内没有应答
    #[error("No reply to {command:?} after {waited:?}")]
    ReplyTimeout { command: Command, waited: Duration },

    /// 配置加载或解析失败
    #[error("Configuration error: {0}")]
    Config(String),
}

impl DriverError {
    /// 是否为单帧/单指令级别的可恢复错误
    pub fn is_recoverable(&self) -> bool {
        match self {
            DriverError::Protocol(_)
            | DriverError::DeviceRejected { .. }
            | DriverError::ReplyTimeout { .. } => true,
            DriverError::Transport(e) => matches!(e, TransportError::Timeout),
            DriverError::Config(_) => false,
        }
    }
}
