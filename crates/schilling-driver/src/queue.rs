//! 指令队列
//!
//! 尚未发送的指令帧按入队顺序排列；同一时刻至多一条指令处于"未完成"状态
//! （已发送、等待 ACK/NAK 或数据应答），在它结束之前不会弹出下一帧。

use schilling_protocol::{Command, ProtocolError, SchillingFrame, fits_width};
use std::collections::VecDeque;

#[derive(Debug, Default)]
pub struct CommandQueue {
    pending: VecDeque<SchillingFrame>,
    outstanding: Option<Command>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// 编码并追加到队尾
    ///
    /// 参数值无法以 `arg_len` 字节表示时返回 `InvalidArgument`，队列不变。
    pub fn enqueue(&mut self, command: Command, value: i64, arg_len: usize) -> Result<(), ProtocolError> {
        if !fits_width(value, arg_len) {
            return Err(ProtocolError::InvalidArgument {
                command,
                value,
                width: arg_len,
            });
        }
        self.pending.push_back(SchillingFrame::encode(command, value, arg_len));
        Ok(())
    }

    /// 以指令表中的参数宽度入队
    pub fn push(&mut self, command: Command, value: i64) -> Result<(), ProtocolError> {
        self.enqueue(command, value, command.arg_len())
    }

    /// 弹出队首帧并将其标记为未完成
    ///
    /// 已有未完成指令时返回 `None`。
    pub fn pop_next(&mut self) -> Option<SchillingFrame> {
        if self.outstanding.is_some() {
            return None;
        }
        let frame = self.pending.pop_front()?;
        self.outstanding = frame.command();
        Some(frame)
    }

    /// 结束未完成指令，返回被结束的指令
    pub fn on_ack_or_reply(&mut self) -> Option<Command> {
        self.outstanding.take()
    }

    pub fn outstanding(&self) -> Option<Command> {
        self.outstanding
    }

    /// 队列为空且没有未完成指令
    pub fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.outstanding.is_none()
    }

    /// 丢弃所有未发送的帧（未完成指令保持不变）
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// 未发送帧，按发送顺序
    pub fn frames(&self) -> impl Iterator<Item = &SchillingFrame> {
        self.pending.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fifo_order() {
        let mut queue = CommandQueue::new();
        queue.push(Command::ClearError, 0).unwrap();
        queue.push(Command::SetVelocity, 625).unwrap();
        queue.push(Command::GetStatus, 0).unwrap();

        let commands: Vec<_> = queue.frames().filter_map(|f| f.command()).collect();
        assert_eq!(
            commands,
            vec![Command::ClearError, Command::SetVelocity, Command::GetStatus]
        );
    }

    #[test]
    fn test_single_outstanding() {
        let mut queue = CommandQueue::new();
        queue.push(Command::ClearError, 0).unwrap();
        queue.push(Command::GetStatus, 0).unwrap();

        let first = queue.pop_next().unwrap();
        assert_eq!(first.command(), Some(Command::ClearError));
        assert_eq!(queue.outstanding(), Some(Command::ClearError));
        // 未完成期间不得发送下一帧
        assert!(queue.pop_next().is_none());
        assert_eq!(queue.len(), 1);

        assert_eq!(queue.on_ack_or_reply(), Some(Command::ClearError));
        let second = queue.pop_next().unwrap();
        assert_eq!(second.command(), Some(Command::GetStatus));
    }

    #[test]
    fn test_is_idle_requires_both() {
        let mut queue = CommandQueue::new();
        assert!(queue.is_idle());

        queue.push(Command::GetStatus, 0).unwrap();
        assert!(!queue.is_idle());

        queue.pop_next().unwrap();
        assert!(queue.is_empty());
        assert!(!queue.is_idle());

        queue.on_ack_or_reply();
        assert!(queue.is_idle());
    }

    #[test]
    fn test_invalid_argument_rejected() {
        let mut queue = CommandQueue::new();
        let err = queue.push(Command::SetControlMode, 300).unwrap_err();
        assert_eq!(
            err,
            ProtocolError::InvalidArgument {
                command: Command::SetControlMode,
                value: 300,
                width: 1,
            }
        );
        assert!(queue.is_empty());

        assert!(queue.enqueue(Command::SetWatchdog, 70_000, 2).is_err());
        assert!(queue.enqueue(Command::SetWatchdog, 70_000, 4).is_ok());
    }

    #[test]
    fn test_clear_keeps_outstanding() {
        let mut queue = CommandQueue::new();
        queue.push(Command::GetStatus, 0).unwrap();
        queue.push(Command::GetPosition, 0).unwrap();
        queue.pop_next().unwrap();
        queue.clear();
        assert!(queue.is_empty());
        assert_eq!(queue.outstanding(), Some(Command::GetStatus));
    }

    #[test]
    fn test_encoded_argument() {
        let mut queue = CommandQueue::new();
        queue.push(Command::SetShaftPosition, -102_500).unwrap();
        let frame = queue.pop_next().unwrap();
        assert_eq!(frame.len(), 8);
        assert_eq!(frame.argument(), -102_500);
        assert!(frame.validate().is_ok());
    }
}
