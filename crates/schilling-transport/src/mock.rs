//! Mock 传输
//!
//! 内存中的脚本化字节流：测试代码预先注入入站字节，或注册一个应答器在每次发送后
//! 模拟执行器回复；所有出站帧都会被记录下来供断言。
//!
//! `MockTransport` 的克隆共享同一份内部状态，因此在把一个克隆交给驱动之后，
//! 测试仍可通过另一个克隆继续注入数据和检查发送记录。

use crate::{Transport, TransportError};
use schilling_protocol::SchillingFrame;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tracing::trace;

/// 应答器：输入为发送的一帧字节，输出为执行器的回复字节（可为空）
pub type Responder = Box<dyn FnMut(&[u8]) -> Vec<u8> + Send>;

#[derive(Default)]
struct MockState {
    inbound: VecDeque<u8>,
    sent: Vec<Vec<u8>>,
    responder: Option<Responder>,
    closed: bool,
    flush_count: usize,
}

#[derive(Clone, Default)]
pub struct MockTransport {
    state: Arc<Mutex<MockState>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        // 测试线程 panic 后仍允许读取记录
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// 追加入站字节
    pub fn push_inbound(&self, bytes: &[u8]) {
        self.lock().inbound.extend(bytes.iter().copied());
    }

    /// 追加一帧入站数据
    pub fn push_frame(&self, frame: &SchillingFrame) {
        self.push_inbound(frame.as_bytes());
    }

    /// 注册应答器（替换已有的应答器）
    pub fn set_responder(&self, responder: impl FnMut(&[u8]) -> Vec<u8> + Send + 'static) {
        self.lock().responder = Some(Box::new(responder));
    }

    pub fn clear_responder(&self) {
        self.lock().responder = None;
    }

    /// 模拟链路断开：之后的收发都返回 `Closed`
    pub fn close(&self) {
        self.lock().closed = true;
    }

    /// 已发送的原始字节（每次 `send` 一项）
    pub fn sent_bytes(&self) -> Vec<Vec<u8>> {
        self.lock().sent.clone()
    }

    /// 已发送的帧
    pub fn sent_frames(&self) -> Vec<SchillingFrame> {
        self.lock()
            .sent
            .iter()
            .map(|bytes| SchillingFrame::from_bytes(bytes))
            .collect()
    }

    /// 清空发送记录
    pub fn clear_sent(&self) {
        self.lock().sent.clear();
    }

    /// 尚未被读取的入站字节数
    pub fn pending_inbound(&self) -> usize {
        self.lock().inbound.len()
    }

    pub fn flush_count(&self) -> usize {
        self.lock().flush_count
    }
}

impl Transport for MockTransport {
    fn send(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let mut guard = self.lock();
        let state = &mut *guard;
        if state.closed {
            return Err(TransportError::Closed);
        }
        trace!("mock send: {:02X?}", bytes);
        state.sent.push(bytes.to_vec());
        if let Some(responder) = state.responder.as_mut() {
            let reply = responder(bytes);
            state.inbound.extend(reply);
        }
        Ok(())
    }

    fn receive(&mut self, max_len: usize, _timeout: Duration) -> Result<Vec<u8>, TransportError> {
        let mut state = self.lock();
        if state.closed {
            return Err(TransportError::Closed);
        }
        let n = max_len.min(state.inbound.len());
        Ok(state.inbound.drain(..n).collect())
    }

    fn flush_input(&mut self) -> Result<(), TransportError> {
        let mut state = self.lock();
        state.inbound.clear();
        state.flush_count += 1;
        Ok(())
    }
}
