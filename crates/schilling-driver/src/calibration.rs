//! 标定状态机
//!
//! 完全由 get-status 应答驱动（无定时器）：依次把输出轴推到负限位、正限位，
//! 计算机械中点并清零编码器原点，再回到配置的零位角度。
//!
//! ```text
//! Init ──status──▶ Initialized ──calibrate()──▶ FindMin ──stop──▶ FindMax
//!                                                                   │ stop
//!                   Running ◀──stop── GoHome ◀──stop── SetZero ◀────┘
//! ```

use crate::{Actuator, DriverError, RunState};
use schilling_protocol::{Command, ControlMode, angle_to_counts, counts_to_angle};
use tracing::{debug, info};

/// 连续相同读数达到该次数即认为输出轴已停止
pub const STILLNESS_THRESHOLD: u32 = 5;

/// 标定运动使用的速度系数（相对配置巡航速度）
pub const CALIBRATION_VELOCITY_COEFF: f64 = 0.5;

/// 静止检测器
///
/// 每次新读数与上一次读数比较，相等则计数加一，不等则清零；
/// 计数达到 [`STILLNESS_THRESHOLD`] 时判定为停止并清零计数。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StillnessDetector {
    last_position: i32,
    count: u32,
}

impl StillnessDetector {
    /// 输出轴是否仍在运动
    pub fn is_moving(&mut self, position: i32) -> bool {
        if position != self.last_position {
            self.count = 0;
            return true;
        }
        self.count += 1;
        if self.count >= STILLNESS_THRESHOLD {
            self.count = 0;
            return false;
        }
        true
    }

    /// 记录最新读数（在状态机处理之后调用）
    pub fn record(&mut self, position: i32) {
        self.last_position = position;
    }

    pub fn reset_count(&mut self) {
        self.count = 0;
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub fn last_position(&self) -> i32 {
        self.last_position
    }
}

impl Actuator {
    /// 以最新输出轴位置推进状态机
    pub(crate) fn advance_run_state(&mut self, position: i32) -> Result<(), DriverError> {
        match self.run_state {
            RunState::Init => {
                self.run_state = RunState::Initialized;
                self.readiness.initialized = true;
                info!("Actuator initialized at {} counts", position);
            },
            RunState::FindMin => {
                if !self.stillness.is_moving(position) {
                    self.find_min_counts = position;
                    self.run_state = RunState::FindMax;
                    info!("Negative limit found at {} counts", position);
                    self.command_angle(360.0, CALIBRATION_VELOCITY_COEFF)?;
                }
            },
            RunState::FindMax => {
                if !self.stillness.is_moving(position) {
                    self.run_state = RunState::SetZero;
                    let range = position as i64 - self.find_min_counts as i64;
                    let half = (range / 2) as i32;
                    let center = (self.find_min_counts as i64 + range / 2) as i32;
                    self.command_position(center, 1.0)?;
                    self.boundaries.max = counts_to_angle(half);
                    self.boundaries.min = -self.boundaries.max;
                    info!(
                        "Positive limit found at {} counts, travel ±{:.3}°, centering at {} counts",
                        position, self.boundaries.max, center
                    );
                }
            },
            RunState::SetZero => {
                if !self.stillness.is_moving(position) {
                    self.run_state = RunState::GoHome;
                    self.queue.push(Command::ClearShaftPosition, 0)?;
                    let home = angle_to_counts(self.config.home_position);
                    debug!("Shaft origin cleared, homing to {} counts", home);
                    self.command_position(home, 1.0)?;
                }
            },
            RunState::GoHome => {
                if !self.stillness.is_moving(position) {
                    self.command_velocity(0.0)?;
                    let mode: u8 = self.config.control_mode.into();
                    self.queue.push(Command::SetControlMode, mode as i64)?;
                    self.run_state = RunState::Running;
                    self.readiness.calibrated = true;
                    info!(
                        "Calibration complete: boundaries [{:.3}°, {:.3}°], mode {:?}",
                        self.boundaries.min, self.boundaries.max, self.config.control_mode
                    );
                }
            },
            RunState::Reset | RunState::Initialized | RunState::Running => {},
        }
        Ok(())
    }

    /// 启动标定
    ///
    /// 仅在 `Initialized` 或 `Running`（重新标定）时生效；配置控制模式为 `None` 时忽略。
    pub fn calibrate(&mut self) -> Result<(), DriverError> {
        if self.config.control_mode == ControlMode::None {
            debug!("Calibration ignored: control mode is None");
            return Ok(());
        }
        if self.run_state != RunState::Initialized && self.run_state < RunState::Running {
            debug!("Calibration ignored in state {:?}", self.run_state);
            return Ok(());
        }

        info!("Starting calibration from {:?}", self.run_state);
        self.run_state = RunState::FindMin;
        self.readiness.calibrated = false;
        self.queue.push(Command::SetControlMode, u8::from(ControlMode::Position) as i64)?;
        self.command_angle(-360.0, CALIBRATION_VELOCITY_COEFF)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stillness_needs_consecutive_equal_readings() {
        let mut detector = StillnessDetector::default();
        detector.record(100);
        for _ in 0..STILLNESS_THRESHOLD - 1 {
            assert!(detector.is_moving(100));
            detector.record(100);
        }
        assert!(!detector.is_moving(100));
        assert_eq!(detector.count(), 0);
    }

    #[test]
    fn test_stillness_reset_by_differing_reading() {
        let mut detector = StillnessDetector::default();
        for _ in 0..STILLNESS_THRESHOLD - 1 {
            assert!(detector.is_moving(0));
            detector.record(0);
        }
        assert_eq!(detector.count(), STILLNESS_THRESHOLD - 1);

        assert!(detector.is_moving(1));
        detector.record(1);
        assert_eq!(detector.count(), 0);

        for _ in 0..STILLNESS_THRESHOLD - 1 {
            assert!(detector.is_moving(1));
            detector.record(1);
        }
        assert!(!detector.is_moving(1));
    }

    #[test]
    fn test_reset_count() {
        let mut detector = StillnessDetector::default();
        detector.is_moving(0);
        detector.is_moving(0);
        detector.reset_count();
        assert_eq!(detector.count(), 0);
        assert_eq!(detector.last_position(), 0);
    }
}
