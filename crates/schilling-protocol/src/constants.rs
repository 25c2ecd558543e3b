//! 协议常量定义

/// 应答：指令已接受（单字节帧）
pub const ACK: u8 = 0x06;

/// 应答：指令被拒绝（单字节帧）
pub const NAK: u8 = 0x15;

/// 指令帧标记（主机 -> 执行器）
pub const MARKER_COMMAND: u8 = 0xF0;

/// 应答帧标记：状态未变化
pub const MARKER_REPLY_UNCHANGED: u8 = 0xF1;

/// 应答帧标记：状态已变化（与未变化应答解析方式相同）
pub const MARKER_REPLY_CHANGED: u8 = 0xF2;

/// 帧头长度（marker + length + command）
pub const HEADER_LEN: usize = 3;

/// 最短带校验和帧长度（无参数指令帧）
pub const MIN_FRAME_LEN: usize = HEADER_LEN + 1;

/// 最长帧长度（应答最长 13 字节）
pub const MAX_FRAME_LEN: usize = 16;

/// 输出轴一整圈对应的编码器计数
pub const FULL_TURN_COUNTS: i32 = 205_000;

/// 速度比例：原始速度 = VELOCITY_SCALE × RPM
pub const VELOCITY_SCALE: f64 = 0.5;

/// 最大指令速度（RPM）
pub const MAX_RPM: f64 = 960_000.0;

/// 单个编码器计数对应的角度分辨率（度）
pub const COUNT_RESOLUTION_DEG: f64 = 360.0 / FULL_TURN_COUNTS as f64;

/// 判断是否为应答帧标记
#[inline]
pub fn is_reply_marker(byte: u8) -> bool {
    byte == MARKER_REPLY_UNCHANGED || byte == MARKER_REPLY_CHANGED
}

/// 判断是否为单字节应答（ACK / NAK）
#[inline]
pub fn is_handshake(byte: u8) -> bool {
    byte == ACK || byte == NAK
}

/// 角度（度）转编码器计数（向零截断）
pub fn angle_to_counts(angle_deg: f64) -> i32 {
    (angle_deg * FULL_TURN_COUNTS as f64 / 360.0) as i32
}

/// 编码器计数转角度（度）
pub fn counts_to_angle(counts: i32) -> f64 {
    counts as f64 * 360.0 / FULL_TURN_COUNTS as f64
}
