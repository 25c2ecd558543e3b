//! 执行器协议引擎
//!
//! [`Actuator`] 不做任何 IO：高层请求被翻译为指令帧压入 [`CommandQueue`]，
//! 宿主通过 [`Actuator::next_frame`] 取帧发送，再把收到的完整帧交给
//! [`Actuator::handle_frame`]。所有状态都保存在这个结构体里，多个实例互不影响。

use crate::calibration::StillnessDetector;
use crate::config::ActuatorConfig;
use crate::queue::CommandQueue;
use crate::state::{
    ActuatorInfo, CalibrationBoundaries, DriveStatus, ExtendedPosition, OperationalStatus,
    RawDeviceStatus, ReadinessFlags, RunState, UpdateFlags, now_us, operational_from,
};
use crate::DriverError;
use schilling_protocol::{
    Command, ControlMode, MAX_RPM, PositionReply, ProtocolError, Reply, SchillingFrame, StatusReply,
    VELOCITY_SCALE, angle_to_counts, is_reply_marker,
};
use tracing::{debug, trace, warn};

#[derive(Debug)]
pub struct Actuator {
    pub(crate) config: ActuatorConfig,
    pub(crate) queue: CommandQueue,
    pub(crate) run_state: RunState,
    pub(crate) readiness: ReadinessFlags,
    pub(crate) boundaries: CalibrationBoundaries,
    /// FindMin 阶段记录的负限位（编码器计数）
    pub(crate) find_min_counts: i32,
    pub(crate) stillness: StillnessDetector,
    status: OperationalStatus,
    raw_status: RawDeviceStatus,
    position: ExtendedPosition,
    drive_status: DriveStatus,
    info: ActuatorInfo,
    updates: UpdateFlags,
}

impl Actuator {
    pub fn new(config: ActuatorConfig) -> Self {
        let status = OperationalStatus {
            control_mode: config.control_mode,
            ..Default::default()
        };
        Self {
            config,
            queue: CommandQueue::new(),
            run_state: RunState::Reset,
            readiness: ReadinessFlags::default(),
            boundaries: CalibrationBoundaries::default(),
            find_min_counts: 0,
            stillness: StillnessDetector::default(),
            status,
            raw_status: RawDeviceStatus::default(),
            position: ExtendedPosition::default(),
            drive_status: DriveStatus::default(),
            info: ActuatorInfo::default(),
            updates: UpdateFlags::default(),
        }
    }

    // ==================== 高层请求 ====================

    /// 初始化设备
    ///
    /// 进入 `Init`，清空未发送队列并压入启动序列：
    /// clear-error ×2、set-trapezoidal-velocity(0)、set-control-mode(配置模式)、get-status。
    pub fn init_device(&mut self) -> Result<(), DriverError> {
        debug!("Initializing actuator (mode {:?})", self.config.control_mode);
        self.run_state = RunState::Init;
        self.readiness = ReadinessFlags::default();
        self.queue.clear();
        self.queue.push(Command::ClearError, 0)?;
        self.queue.push(Command::ClearError, 0)?;
        self.queue.push(Command::SetTrapezoidalVelocity, 0)?;
        self.queue
            .push(Command::SetControlMode, u8::from(self.config.control_mode) as i64)?;
        self.queue.push(Command::GetStatus, 0)?;
        Ok(())
    }

    /// 请求运行状态（get-status + get-position）
    pub fn request_status(&mut self) -> Result<(), DriverError> {
        self.queue.push(Command::GetStatus, 0)?;
        self.queue.push(Command::GetPosition, 0)?;
        Ok(())
    }

    pub fn request_position(&mut self) -> Result<(), DriverError> {
        self.queue.push(Command::GetPosition, 0)?;
        Ok(())
    }

    pub fn request_drive_status(&mut self) -> Result<(), DriverError> {
        self.queue.push(Command::GetDriveStatus, 0)?;
        Ok(())
    }

    pub fn request_actuator_info(&mut self) -> Result<(), DriverError> {
        self.queue.push(Command::GetActuatorInfo, 0)?;
        Ok(())
    }

    /// 队列为空且没有未完成指令
    pub fn is_idle(&self) -> bool {
        self.queue.is_idle()
    }

    /// 移动到目标位置（编码器计数）
    ///
    /// 标定进行中忽略。`vel_coeff` 为相对配置巡航速度的系数。
    pub fn set_pos(&mut self, count: i32, vel_coeff: f64) -> Result<(), DriverError> {
        if self.run_state.is_calibrating() {
            debug!("set_pos ignored during calibration ({:?})", self.run_state);
            return Ok(());
        }
        self.command_position(count, vel_coeff)
    }

    /// 移动到目标角度（度）
    pub fn set_angle_pos(&mut self, angle: f64, vel_coeff: f64) -> Result<(), DriverError> {
        self.set_pos(angle_to_counts(angle), vel_coeff)
    }

    /// 设置速度（RPM），超出 ±MAX_RPM 时截断
    pub fn set_velocity(&mut self, rpm: f64) -> Result<(), DriverError> {
        if self.run_state.is_calibrating() {
            debug!("set_velocity ignored during calibration ({:?})", self.run_state);
            return Ok(());
        }
        self.command_velocity(rpm)
    }

    /// 切换控制模式并更新配置模式
    pub fn set_control_mode(&mut self, mode: ControlMode) -> Result<(), DriverError> {
        if self.run_state.is_calibrating() {
            debug!("set_control_mode ignored during calibration ({:?})", self.run_state);
            return Ok(());
        }
        if mode == self.config.control_mode {
            return Ok(());
        }
        if mode == ControlMode::Velocity {
            self.command_velocity(0.0)?;
        }
        self.queue.push(Command::SetControlMode, u8::from(mode) as i64)?;
        debug!("Control mode {:?} -> {:?}", self.config.control_mode, mode);
        self.config.control_mode = mode;
        Ok(())
    }

    /// 强制回到 `Reset`
    ///
    /// 不会结束未完成指令；宿主还需要清空传输层缓冲区。
    pub fn set_reset_state(&mut self) {
        debug!("Run state {:?} -> Reset", self.run_state);
        self.readiness = ReadinessFlags::default();
        self.run_state = RunState::Reset;
    }

    // ==================== 内部运动指令（不受标定保护） ====================

    pub(crate) fn command_angle(&mut self, angle: f64, vel_coeff: f64) -> Result<(), DriverError> {
        self.command_position(angle_to_counts(angle), vel_coeff)
    }

    pub(crate) fn command_position(&mut self, count: i32, vel_coeff: f64) -> Result<(), DriverError> {
        if self.run_state == RunState::Running && self.config.control_mode == ControlMode::Velocity {
            debug!("Position target ignored in velocity mode");
            return Ok(());
        }

        let mut target = count;
        if self.run_state == RunState::Running {
            let lo = angle_to_counts(self.boundaries.min);
            let hi = angle_to_counts(self.boundaries.max);
            target = target.max(lo).min(hi);
            if target != count {
                debug!("Position {} clamped to {} (bounds [{}, {}])", count, target, lo, hi);
            }
        }

        self.stillness.reset_count();
        self.queue.push(Command::ClearError, 0)?;
        self.queue.push(Command::SetShaftPosition, target as i64)?;
        self.command_velocity(self.config.velocity as f64 * vel_coeff)?;
        self.queue.push(Command::ClearError, 0)?;
        Ok(())
    }

    pub(crate) fn command_velocity(&mut self, rpm: f64) -> Result<(), DriverError> {
        let rpm = rpm.clamp(-MAX_RPM, MAX_RPM);
        let raw = (VELOCITY_SCALE * rpm) as i64;
        self.queue.push(Command::SetVelocity, raw)?;
        Ok(())
    }

    // ==================== 帧处理 ====================

    /// 取出下一帧用于发送（存在未完成指令时返回 `None`）
    pub fn next_frame(&mut self) -> Option<SchillingFrame> {
        let frame = self.queue.pop_next()?;
        trace!("Outstanding command: {:?}", frame.command());
        Some(frame)
    }

    pub fn outstanding(&self) -> Option<Command> {
        self.queue.outstanding()
    }

    /// 放弃未完成指令（例如应答超时）
    pub fn abandon_outstanding(&mut self) -> Option<Command> {
        self.queue.on_ack_or_reply()
    }

    /// 处理一帧完整的入站数据
    ///
    /// 任何完整帧都会结束未完成指令；只有校验通过且长度正确的数据应答才会修改状态。
    pub fn handle_frame(&mut self, frame: &SchillingFrame) -> Result<(), DriverError> {
        if frame.is_ack() {
            match self.queue.on_ack_or_reply() {
                Some(command) => trace!("ACK for {:?}", command),
                None => debug!("Unsolicited ACK ignored"),
            }
            return Ok(());
        }

        if frame.is_nak() {
            let command = self.queue.on_ack_or_reply().unwrap_or(Command::None);
            warn!("Device rejected {:?}", command);
            return Err(DriverError::DeviceRejected { command });
        }

        match frame.marker() {
            Some(marker) if is_reply_marker(marker) => {},
            Some(marker) => return Err(ProtocolError::UnknownMarker { marker }.into()),
            None => return Err(ProtocolError::Framing { len: 0 }.into()),
        }

        let Some(command) = self.queue.on_ack_or_reply() else {
            frame.validate()?;
            debug!("Reply without outstanding command ignored: {:02X?}", frame.as_bytes());
            return Ok(());
        };

        let reply = Reply::decode(frame, command).inspect_err(|e| {
            warn!("Dropping reply to {:?}: {}", command, e);
        })?;

        match reply {
            Some(reply) => self.apply_reply(reply),
            None => {
                debug!("Data reply to {:?} ignored", command);
                Ok(())
            },
        }
    }

    fn apply_reply(&mut self, reply: Reply) -> Result<(), DriverError> {
        let timestamp_us = now_us();
        match reply {
            Reply::Status(status) => self.apply_status(&status, timestamp_us)?,
            Reply::Position(position) => self.apply_position(position, timestamp_us),
            Reply::DriveStatus(drive) => {
                self.drive_status = DriveStatus::from((drive, timestamp_us));
                self.updates.drive_status = true;
            },
            Reply::ActuatorInfo(info) => {
                self.info = ActuatorInfo::from((info, timestamp_us));
                self.updates.act_info = true;
                debug!(
                    "Actuator serial {} firmware rev {}",
                    info.serial_number, info.firmware_revision
                );
            },
        }
        Ok(())
    }

    fn apply_status(&mut self, status: &StatusReply, timestamp_us: u64) -> Result<(), DriverError> {
        self.status = operational_from(status, timestamp_us);
        self.raw_status.timestamp_us = timestamp_us;
        self.raw_status.control_status = status.control_status;
        self.raw_status.drive_status = status.drive_status;
        self.raw_status.shaft_position = status.shaft_position;

        let control = status.control_flags();
        if control.has_fault() {
            warn!("Control status fault: {:?}", control);
        }
        let drive = status.drive_flags();
        if drive.has_fault() {
            warn!("Drive status fault: {:?}", drive);
        }

        let result = if self.run_state < RunState::Running {
            self.advance_run_state(status.shaft_position)
        } else {
            Ok(())
        };
        self.stillness.record(status.shaft_position);
        self.updates.status = true;
        result
    }

    fn apply_position(&mut self, position: PositionReply, timestamp_us: u64) {
        self.position = ExtendedPosition::from((position, timestamp_us));
        self.raw_status.encoder_status = position.shaft_encoder_status;
        let encoder = position.shaft_encoder_flags();
        if encoder.has_fault() {
            warn!("Shaft encoder fault: {:?}", encoder);
        }
        self.updates.position = true;
    }

    // ==================== 状态读取 ====================

    pub fn status(&self) -> OperationalStatus {
        self.status
    }

    pub fn raw_status(&self) -> RawDeviceStatus {
        self.raw_status
    }

    pub fn position(&self) -> ExtendedPosition {
        self.position
    }

    pub fn drive_status(&self) -> DriveStatus {
        self.drive_status
    }

    pub fn actuator_info(&self) -> ActuatorInfo {
        self.info
    }

    pub fn boundaries(&self) -> CalibrationBoundaries {
        self.boundaries
    }

    /// FindMin 阶段记录的负限位计数
    pub fn find_min_counts(&self) -> i32 {
        self.find_min_counts
    }

    pub fn readiness(&self) -> ReadinessFlags {
        self.readiness
    }

    pub fn run_state(&self) -> RunState {
        self.run_state
    }

    pub fn config(&self) -> &ActuatorConfig {
        &self.config
    }

    /// 未发送的帧，按发送顺序
    pub fn queued_frames(&self) -> impl Iterator<Item = &SchillingFrame> {
        self.queue.frames()
    }

    pub fn queued_len(&self) -> usize {
        self.queue.len()
    }

    /// 自上次返回 `true` 以来是否同时收到了 get-status 与 get-position 应答
    pub fn has_status_update(&mut self) -> bool {
        if self.updates.status && self.updates.position {
            self.updates.status = false;
            self.updates.position = false;
            return true;
        }
        false
    }

    pub fn has_position_update(&mut self) -> bool {
        std::mem::take(&mut self.updates.position)
    }

    pub fn has_drive_status_update(&mut self) -> bool {
        std::mem::take(&mut self.updates.drive_status)
    }

    pub fn has_actuator_info_update(&mut self) -> bool {
        std::mem::take(&mut self.updates.act_info)
    }
}
