//! 标定状态机的端到端测试（仿真执行器）

mod common;

use common::*;
use schilling_driver::{ActuatorConfig, RunState, STILLNESS_THRESHOLD};
use schilling_protocol::{COUNT_RESOLUTION_DEG, Command, ControlMode, angle_to_counts, counts_to_angle};

const MAX_CYCLES: usize = 4000;

#[test]
fn test_full_calibration_symmetric_travel() {
    init_tracing();
    let (mut driver, _mock, sim) = simulated_driver(ActuatorConfig::default(), (-102_500, 102_500));
    initialize(&mut driver);

    driver.actuator_mut().calibrate().unwrap();
    assert_eq!(driver.actuator().run_state(), RunState::FindMin);

    assert!(run_until(&mut driver, MAX_CYCLES, |a| a.run_state() == RunState::FindMax));
    assert_eq!(lock(&sim).reported_position(), -102_500);
    assert_eq!(driver.actuator().find_min_counts(), -102_500);

    assert!(run_until(&mut driver, MAX_CYCLES, |a| a.run_state() == RunState::SetZero));
    let bounds = driver.actuator().boundaries();
    assert!((bounds.max - 180.0).abs() <= COUNT_RESOLUTION_DEG);
    assert!((bounds.min + 180.0).abs() <= COUNT_RESOLUTION_DEG);

    assert!(run_until(&mut driver, MAX_CYCLES, |a| a.run_state() == RunState::Running));
    driver.pump_until_idle(64).unwrap();

    let actuator = driver.actuator();
    assert!(actuator.readiness().initialized);
    assert!(actuator.readiness().calibrated);
    assert!(actuator.readiness().is_ready());
    assert_eq!(actuator.boundaries(), bounds);

    // 标定结束后恢复配置的速度模式
    let sim = lock(&sim);
    assert_eq!(sim.control_mode, ControlMode::Velocity);
    assert_eq!(sim.reported_position(), 0);
    assert!(sim.received.contains(&Command::ClearShaftPosition));
}

#[test]
fn test_calibration_asymmetric_travel_and_home() {
    let config = ActuatorConfig {
        velocity: 1250,
        control_mode: ControlMode::Position,
        home_position: 10.0,
    };
    let (mut driver, _mock, sim) = simulated_driver(config, (-30_000, 90_000));
    initialize(&mut driver);
    driver.actuator_mut().calibrate().unwrap();
    assert!(run_until(&mut driver, MAX_CYCLES, |a| a.run_state() == RunState::Running));
    driver.pump_until_idle(64).unwrap();

    // 行程 120000 计数，中点 30000 成为新原点
    let bounds = driver.actuator().boundaries();
    assert_eq!(bounds.max, counts_to_angle(60_000));
    assert_eq!(bounds.min, -bounds.max);

    let sim = lock(&sim);
    assert_eq!(sim.origin, 30_000);
    assert_eq!(sim.reported_position(), angle_to_counts(10.0));
    assert_eq!(sim.control_mode, ControlMode::Position);

    let angle = driver.actuator().status().shaft_angle;
    assert!((angle - 10.0).abs() <= COUNT_RESOLUTION_DEG);
}

#[test]
fn test_stillness_counter_reset_by_differing_reading() {
    let (mut driver, _mock, sim) = simulated_driver(ActuatorConfig::default(), (-102_500, 102_500));
    initialize(&mut driver);
    lock(&sim).frozen = true;

    driver.actuator_mut().calibrate().unwrap();

    for _ in 0..STILLNESS_THRESHOLD - 1 {
        poll_status(&mut driver);
        assert_eq!(driver.actuator().run_state(), RunState::FindMin);
    }

    // 一次不同的读数使计数清零
    lock(&sim).position = 1;
    poll_status(&mut driver);
    assert_eq!(driver.actuator().run_state(), RunState::FindMin);

    for _ in 0..STILLNESS_THRESHOLD - 1 {
        poll_status(&mut driver);
        assert_eq!(driver.actuator().run_state(), RunState::FindMin);
    }
    poll_status(&mut driver);
    assert_eq!(driver.actuator().run_state(), RunState::FindMax);
}

#[test]
fn test_commands_ignored_during_calibration() {
    let (mut driver, _mock, _sim) = simulated_driver(ActuatorConfig::default(), (-102_500, 102_500));
    initialize(&mut driver);
    driver.actuator_mut().calibrate().unwrap();
    driver.pump_until_idle(64).unwrap();

    let actuator = driver.actuator_mut();
    actuator.set_angle_pos(45.0, 1.0).unwrap();
    actuator.set_velocity(500.0).unwrap();
    actuator.set_control_mode(ControlMode::Position).unwrap();
    actuator.calibrate().unwrap();
    assert_eq!(actuator.queued_len(), 0);
    assert_eq!(actuator.run_state(), RunState::FindMin);
    assert_eq!(actuator.config().control_mode, ControlMode::Velocity);
}

#[test]
fn test_recalibration_from_running() {
    let (mut driver, _mock, _sim) = simulated_driver(ActuatorConfig::default(), (-51_250, 51_250));
    initialize(&mut driver);
    driver.actuator_mut().calibrate().unwrap();
    assert!(run_until(&mut driver, MAX_CYCLES, |a| a.run_state() == RunState::Running));

    driver.actuator_mut().calibrate().unwrap();
    assert_eq!(driver.actuator().run_state(), RunState::FindMin);
    assert!(!driver.actuator().readiness().calibrated);

    assert!(run_until(&mut driver, MAX_CYCLES, |a| a.readiness().calibrated));
    assert_eq!(driver.actuator().boundaries().max, 90.0);
}

#[test]
fn test_clamping_when_running() {
    let config = ActuatorConfig {
        control_mode: ControlMode::Position,
        ..Default::default()
    };
    let (mut driver, _mock, sim) = simulated_driver(config, (-51_250, 51_250));
    initialize(&mut driver);
    driver.actuator_mut().calibrate().unwrap();
    assert!(run_until(&mut driver, MAX_CYCLES, |a| a.run_state() == RunState::Running));
    driver.pump_until_idle(64).unwrap();

    let bounds = driver.actuator().boundaries();
    assert_eq!(bounds.min, -90.0);
    assert_eq!(bounds.max, 90.0);

    driver.actuator_mut().set_angle_pos(200.0, 1.0).unwrap();
    let target = driver
        .actuator()
        .queued_frames()
        .find(|f| f.command() == Some(Command::SetShaftPosition))
        .map(|f| f.argument());
    assert_eq!(target, Some(angle_to_counts(90.0) as i64));

    driver.pump_until_idle(64).unwrap();
    assert_eq!(lock(&sim).target, 51_250);

    driver.actuator_mut().set_angle_pos(-200.0, 1.0).unwrap();
    let target = driver
        .actuator()
        .queued_frames()
        .find(|f| f.command() == Some(Command::SetShaftPosition))
        .map(|f| f.argument());
    assert_eq!(target, Some(-51_250));
}

#[test]
fn test_position_ignored_in_velocity_mode_when_running() {
    let (mut driver, _mock, _sim) = simulated_driver(ActuatorConfig::default(), (-51_250, 51_250));
    initialize(&mut driver);
    driver.actuator_mut().calibrate().unwrap();
    assert!(run_until(&mut driver, MAX_CYCLES, |a| a.run_state() == RunState::Running));
    driver.pump_until_idle(64).unwrap();

    driver.actuator_mut().set_angle_pos(30.0, 1.0).unwrap();
    assert_eq!(driver.actuator().queued_len(), 0);

    driver.actuator_mut().set_velocity(1000.0).unwrap();
    let args: Vec<_> = driver.actuator().queued_frames().map(|f| f.argument()).collect();
    assert_eq!(args, vec![500]);
}
