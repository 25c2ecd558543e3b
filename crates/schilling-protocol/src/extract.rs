//! 字节流分帧
//!
//! 从接收缓冲区中定位完整、同步的帧，容忍噪声和不完整数据。
//! 分帧器不消耗数据，只告诉调用方应当如何处理缓冲区头部。

use crate::constants::*;

/// 分帧结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Extraction {
    /// 尚无可识别的帧，或帧头已找到但数据不足，需要等待更多字节
    Incomplete,
    /// 缓冲区开头为一个长度为 `len` 的完整帧
    Complete(usize),
    /// 缓冲区开头 `n` 个字节是噪声，应丢弃后重新扫描
    Discard(usize),
}

/// 扫描缓冲区
///
/// - ACK / NAK 单字节：位于开头即为完整帧，位于偏移 i>0 时前 i 字节为噪声
/// - 应答帧标记：位于开头且至少 2 字节可读时，按头部长度字段判断完整性；
///   位于偏移 i>0 时前 i 字节为噪声
/// - 整个缓冲区都没有可识别字节：全部丢弃
///
/// 头部长度字段不在合法范围内时，认为该标记字节本身是噪声，丢弃 1 字节后重新同步。
pub fn extract(buffer: &[u8]) -> Extraction {
    for (i, &byte) in buffer.iter().enumerate() {
        if is_handshake(byte) {
            if i > 0 {
                return Extraction::Discard(i);
            }
            return Extraction::Complete(1);
        }
        if is_reply_marker(byte) {
            if i > 0 {
                return Extraction::Discard(i);
            }
            let Some(&declared) = buffer.get(1) else {
                return Extraction::Incomplete;
            };
            let len = declared as usize;
            if !(MIN_FRAME_LEN..=MAX_FRAME_LEN).contains(&len) {
                return Extraction::Discard(1);
            }
            if buffer.len() >= len {
                return Extraction::Complete(len);
            }
            return Extraction::Incomplete;
        }
    }
    if buffer.is_empty() {
        Extraction::Incomplete
    } else {
        Extraction::Discard(buffer.len())
    }
}
