//! 泵循环驱动
//!
//! [`ActuatorDriver`] 把 [`Actuator`] 与一个 [`Transport`] 组合起来：
//! 宿主在控制线程上周期性调用 [`ActuatorDriver::pump`]，
//! 先消费入站字节，再在没有未完成指令时发送下一帧。不创建线程，也不阻塞超过一次读超时。

use crate::config::{DriverConfig, SchillingConfig};
use crate::{Actuator, DriverError};
use bytes::{Buf, BytesMut};
use schilling_protocol::{Extraction, SchillingFrame, extract};
use schilling_transport::Transport;
use std::time::Instant;
use tracing::{trace, warn};

pub struct ActuatorDriver<T: Transport> {
    actuator: Actuator,
    transport: T,
    config: DriverConfig,
    inbound: BytesMut,
    /// 未完成指令的发送时刻
    sent_at: Option<Instant>,
}

impl<T: Transport> ActuatorDriver<T> {
    pub fn new(actuator: Actuator, transport: T, config: DriverConfig) -> Self {
        Self {
            actuator,
            transport,
            config,
            inbound: BytesMut::with_capacity(256),
            sent_at: None,
        }
    }

    pub fn from_config(config: &SchillingConfig, transport: T) -> Self {
        Self::new(
            Actuator::new(config.actuator.clone()),
            transport,
            config.driver.clone(),
        )
    }

    /// 读取一次入站字节并处理所有完整帧
    ///
    /// 返回遇到的第一个帧级错误，之后的字节留在缓冲区等下一次调用。
    pub fn receive(&mut self) -> Result<(), DriverError> {
        let bytes = self
            .transport
            .receive(self.config.read_chunk, self.config.receive_timeout())?;
        if !bytes.is_empty() {
            self.inbound.extend_from_slice(&bytes);
        }
        self.process_buffered()
    }

    /// 处理缓冲区中已有的完整帧
    pub fn process_buffered(&mut self) -> Result<(), DriverError> {
        loop {
            match extract(&self.inbound) {
                Extraction::Incomplete => return Ok(()),
                Extraction::Discard(n) => {
                    trace!("Discarding {} byte(s) of noise: {:02X?}", n, &self.inbound[..n]);
                    self.inbound.advance(n);
                },
                Extraction::Complete(len) => {
                    let raw = self.inbound.split_to(len);
                    let frame = SchillingFrame::from_bytes(&raw);
                    trace!("Received frame {:02X?}", frame.as_bytes());
                    if self.actuator.outstanding().is_some() {
                        self.sent_at = None;
                    }
                    self.actuator.handle_frame(&frame)?;
                },
            }
        }
    }

    /// 发送下一帧
    ///
    /// 未完成指令超过应答超时则放弃并返回 `ReplyTimeout`，下一次调用继续发送队列。
    /// 返回是否发送了一帧。
    pub fn transmit_next(&mut self) -> Result<bool, DriverError> {
        // 外部放弃的指令不再等待应答
        if self.actuator.outstanding().is_none() {
            self.sent_at = None;
        }
        if let Some(sent_at) = self.sent_at {
            let waited = sent_at.elapsed();
            if waited <= self.config.reply_timeout() {
                return Ok(false);
            }
            self.sent_at = None;
            if let Some(command) = self.actuator.abandon_outstanding() {
                warn!("No reply to {:?} after {:?}, abandoning", command, waited);
                return Err(DriverError::ReplyTimeout { command, waited });
            }
        }

        let Some(frame) = self.actuator.next_frame() else {
            return Ok(false);
        };
        trace!("Sending frame {:02X?}", frame.as_bytes());
        if let Err(e) = self.transport.send(frame.as_bytes()) {
            self.actuator.abandon_outstanding();
            return Err(e.into());
        }
        self.sent_at = Some(Instant::now());
        Ok(true)
    }

    /// 一个泵循环：先接收，再发送
    pub fn pump(&mut self) -> Result<(), DriverError> {
        self.receive()?;
        self.transmit_next()?;
        Ok(())
    }

    /// 反复泵循环直到空闲，返回使用的循环次数
    ///
    /// 超过 `max_cycles` 仍未空闲时返回 `Ok(None)`；遇到错误立即返回。
    pub fn pump_until_idle(&mut self, max_cycles: usize) -> Result<Option<usize>, DriverError> {
        for cycle in 0..max_cycles {
            if self.actuator.is_idle() {
                return Ok(Some(cycle));
            }
            self.pump()?;
        }
        Ok(self.actuator.is_idle().then_some(max_cycles))
    }

    /// 强制复位状态并清空入站数据
    pub fn reset(&mut self) -> Result<(), DriverError> {
        self.actuator.set_reset_state();
        self.inbound.clear();
        self.transport.flush_input()?;
        Ok(())
    }

    pub fn actuator(&self) -> &Actuator {
        &self.actuator
    }

    pub fn actuator_mut(&mut self) -> &mut Actuator {
        &mut self.actuator
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    /// 缓冲区中尚未成帧的字节数
    pub fn buffered_len(&self) -> usize {
        self.inbound.len()
    }

    pub fn into_parts(self) -> (Actuator, T) {
        (self.actuator, self.transport)
    }
}
