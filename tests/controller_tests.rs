//! Integration tests for the auxiliary controller and its effects

use loco_aux::effect::{
    Dimming, FanMode, Flicker, MarsLight, NeonPhase, NeonTube, ServoEffect, ServoMode,
    SmokeGenerator, SoftStartStop, Steady, Strobe,
};
use loco_aux::hal::{FixedRng, MockCvStore, MockDriver, RecordingSink};
use loco_aux::{
    cv, AuxConfig, AuxController, Condition, ConditionVariable, Direction, Effect, EffectContext,
    LogicalFunction, MappingAction, MappingRule, OutputKind, PhysicalOutput,
};

/// Run one effect update into a one-slot sink and return the level.
fn level(effect: &mut Effect, delta_ms: u32) -> u8 {
    let mut sink = RecordingSink::new(1);
    let mut rng = FixedRng::new(50);
    let mut ctx = EffectContext::new(0, &mut rng);
    effect.update(delta_ms, &mut sink, &mut ctx).unwrap();
    sink.first()
}

/// Controller with one function on output 1 (pin 5) that follows F1.
fn single_function(effect: impl Into<Effect>, kind: OutputKind) -> AuxController<MockDriver, FixedRng> {
    let mut controller = AuxController::with_rng(MockDriver::new(), FixedRng::new(50));
    controller.add_output(PhysicalOutput::new(5, kind)).unwrap();
    let target = controller.add_logical_function(LogicalFunction::new(effect).with_output(0));
    controller.add_condition_variable(
        ConditionVariable::new(1).with_condition(Condition::function_on(1)),
    );
    controller.add_mapping_rule(MappingRule::new(target, MappingAction::Activate).with_positive(1));
    controller
}

// ============================================================================
// Effect scenarios
// ============================================================================

#[test]
fn steady_scenario() {
    let mut effect = Effect::from(Steady::new(128));
    assert_eq!(level(&mut effect, 10), 0);
    effect.set_active(true);
    assert_eq!(level(&mut effect, 10), 128);
}

#[test]
fn strobe_scenario() {
    let mut effect = Effect::from(Strobe::new(10, 25, 255));
    effect.set_active(true);
    assert_eq!(level(&mut effect, 10), 255);
    assert_eq!(level(&mut effect, 15), 0);
    assert_eq!(level(&mut effect, 75), 255);
}

#[test]
fn soft_start_stop_scenario() {
    let mut effect = Effect::from(SoftStartStop::new(100, 50, 200));
    effect.set_active(true);
    assert_eq!(level(&mut effect, 50), 100);
    assert_eq!(level(&mut effect, 50), 200);
    effect.set_active(false);
    assert_eq!(level(&mut effect, 25), 100);
    assert_eq!(level(&mut effect, 25), 0);
}

#[test]
fn inactive_light_effects_write_zero() {
    let mut effects: Vec<Effect> = vec![
        Steady::new(255).into(),
        Dimming::new(255, 80).into(),
        Flicker::new(200, 100, 128).into(),
        Strobe::new(5, 50, 255).into(),
        MarsLight::new(1000, 255, 0).into(),
    ];
    for effect in &mut effects {
        effect.set_active(true);
        level(effect, 100);
        effect.set_active(false);
        assert_eq!(level(effect, 100), 0, "{:?} inactive", effect.kind());
    }
}

#[test]
fn inactive_soft_start_ramps_down() {
    let mut effect = Effect::from(SoftStartStop::new(0, 100, 200));
    effect.set_active(true);
    assert_eq!(level(&mut effect, 20), 200);
    effect.set_active(false);
    let first = level(&mut effect, 20);
    assert!(first > 0 && first < 200);
    assert_eq!(level(&mut effect, 100), 0);
}

#[test]
fn inactive_servo_holds_position() {
    let mut effect = Effect::from(ServoEffect::new(10, 80, 0, ServoMode::Latching));
    let mut sink = RecordingSink::new(1);
    let mut rng = FixedRng::new(0);
    let mut ctx = EffectContext::new(0, &mut rng);

    effect.set_active(true);
    effect.update(20, &mut sink, &mut ctx).unwrap();
    assert_eq!(sink.angles[0], Some(80));

    effect.set_active(false);
    effect.update(20, &mut sink, &mut ctx).unwrap();
    assert_eq!(sink.angles[0], Some(80));
}

#[test]
fn inactive_neon_is_off_immediately() {
    let mut neon = NeonTube::new(0, 200);
    let mut sink = RecordingSink::new(1);
    let mut rng = FixedRng::new(50);
    let mut ctx = EffectContext::new(0, &mut rng);

    neon.set_active(true);
    neon.update(10, &mut sink, &mut ctx).unwrap();
    neon.update(10, &mut sink, &mut ctx).unwrap();
    assert_eq!(neon.phase(), NeonPhase::Steady);
    assert_eq!(sink.first(), 200);

    neon.set_active(false);
    neon.update(10, &mut sink, &mut ctx).unwrap();
    assert_eq!(neon.phase(), NeonPhase::Off);
    assert_eq!(sink.first(), 0);
}

// ============================================================================
// Controller with hand-built graphs
// ============================================================================

#[test]
fn high_side_output_is_inverted() {
    let mut controller = single_function(Steady::new(255), OutputKind::PwmHighSide);
    controller.update(20).unwrap();
    assert_eq!(controller.driver().pwm(5), Some(255));

    controller.set_function_state(1, true);
    controller.update(20).unwrap();
    assert_eq!(controller.driver().pwm(5), Some(0));
}

#[test]
fn on_off_output_uses_digital_writes() {
    let mut controller = single_function(Steady::new(200), OutputKind::OnOff);
    controller.set_function_state(1, true);
    controller.update(20).unwrap();
    assert_eq!(controller.driver().digital(5), Some(true));

    controller.set_function_state(1, false);
    controller.update(20).unwrap();
    assert_eq!(controller.driver().digital(5), Some(false));
}

#[test]
fn servo_through_controller_latches() {
    let mut controller = single_function(
        ServoEffect::new(0, 90, 255, ServoMode::Latching),
        OutputKind::Servo,
    );
    controller.update(20).unwrap();
    assert_eq!(controller.driver().servo(5), Some(0));

    controller.set_function_state(1, true);
    for _ in 0..20 {
        controller.update(20).unwrap();
    }
    assert_eq!(controller.driver().servo(5), Some(90));

    // Release keeps the position, the next press travels back
    controller.set_function_state(1, false);
    controller.update(20).unwrap();
    assert_eq!(controller.driver().servo(5), Some(90));
    controller.set_function_state(1, true);
    for _ in 0..20 {
        controller.update(20).unwrap();
    }
    assert_eq!(controller.driver().servo(5), Some(0));
}

#[test]
fn servo_travels_at_configured_rate() {
    // 255 -> 360 degrees per second
    let mut controller = single_function(
        ServoEffect::new(0, 180, 255, ServoMode::Momentary),
        OutputKind::Servo,
    );
    controller.set_function_state(1, true);
    controller.update(250).unwrap();
    assert_eq!(controller.driver().servo(5), Some(90));
    controller.update(250).unwrap();
    assert_eq!(controller.driver().servo(5), Some(180));

    controller.set_function_state(1, false);
    controller.update(250).unwrap();
    assert_eq!(controller.driver().servo(5), Some(90));
}

#[test]
fn smoke_fan_follows_speed() {
    let mut controller = AuxController::with_rng(MockDriver::new(), FixedRng::new(0));
    controller
        .add_output(PhysicalOutput::new(1, OutputKind::OnOff))
        .unwrap();
    controller
        .add_output(PhysicalOutput::new(2, OutputKind::PwmLowSide))
        .unwrap();
    let target = controller.add_logical_function(
        LogicalFunction::new(SmokeGenerator::new(true, FanMode::SpeedSync { max: 255 }))
            .with_output(0)
            .with_output(1),
    );
    controller.add_condition_variable(ConditionVariable::new(1).with_condition(Condition::speed_above(0)));
    controller.add_mapping_rule(MappingRule::new(target, MappingAction::Activate).with_positive(1));

    controller.update(20).unwrap();
    assert_eq!(controller.driver().digital(1), Some(false));
    assert_eq!(controller.driver().pwm(2), Some(0));

    controller.set_speed(7);
    controller.update(20).unwrap();
    assert_eq!(controller.driver().digital(1), Some(true));
    assert_eq!(controller.driver().pwm(2), Some(63));
}

#[test]
fn later_deactivate_rule_wins() {
    let mut controller = single_function(Steady::new(255), OutputKind::PwmLowSide);
    controller.add_condition_variable(
        ConditionVariable::new(2).with_condition(Condition::direction_is(Direction::Reverse)),
    );
    controller.add_mapping_rule(MappingRule::new(0, MappingAction::Deactivate).with_positive(2));

    controller.set_function_state(1, true);
    controller.update(20).unwrap();
    assert_eq!(controller.driver().pwm(5), Some(255));

    controller.set_direction(Direction::Reverse);
    controller.update(20).unwrap();
    assert_eq!(controller.driver().pwm(5), Some(0));
}

#[test]
fn clean_tick_skips_evaluation() {
    let mut controller = single_function(Steady::new(255), OutputKind::PwmLowSide);
    controller.set_function_state(1, true);
    controller.update(20).unwrap();
    assert!(controller.condition_variable_state(1));
    assert!(!controller.is_dirty());

    // Same value again: nothing to re-evaluate, output unchanged
    controller.set_function_state(1, true);
    assert!(!controller.is_dirty());
    controller.update(20).unwrap();
    assert_eq!(controller.driver().pwm(5), Some(255));
}

// ============================================================================
// Factory defaults and configuration
// ============================================================================

#[test]
fn factory_defaults_drive_headlights() {
    let mut controller = AuxController::new(MockDriver::new());
    controller
        .add_output(PhysicalOutput::new(26, OutputKind::PwmLowSide))
        .unwrap();
    controller
        .add_output(PhysicalOutput::new(27, OutputKind::PwmLowSide))
        .unwrap();

    let mut store = MockCvStore::new();
    cv::write_factory_defaults(&mut store);
    controller.load_from_cvs(&mut store);

    controller.set_function_state(0, true);
    controller.update(10).unwrap();
    assert_eq!(controller.driver().pwm(26), Some(255));
    assert_eq!(controller.driver().pwm(27), Some(0));

    controller.set_direction(Direction::Reverse);
    controller.update(10).unwrap();
    assert_eq!(controller.driver().pwm(26), Some(0));
    assert_eq!(controller.driver().pwm(27), Some(255));
}

#[test]
fn default_pinout_with_factory_defaults() {
    let mut controller =
        AuxController::from_config(MockDriver::new(), &AuxConfig::default_pinout()).unwrap();
    let mut store = MockCvStore::new();
    cv::write_factory_defaults(&mut store);
    let report = controller.load_from_cvs(&mut store);

    assert_eq!(report.logical_functions, 2);
    controller.set_function_state(0, true);
    controller.update(20).unwrap();
    assert_eq!(controller.driver().pwm(26), Some(255));
    assert_eq!(controller.driver().pwm(28), Some(0));
}

#[test]
fn same_seed_gives_same_flicker() {
    let run = || {
        let mut controller = AuxController::new(MockDriver::new());
        controller
            .add_output(PhysicalOutput::new(3, OutputKind::PwmLowSide))
            .unwrap();
        let mut store = MockCvStore::new().with_cv(96, 0);
        store.set_block(200, &[3, 180, 120, 200, 1, 0, 0, 0]);
        store.set_block(500, &[1, 8, 0, 0]);
        store.set_block(700, &[1, 1, 0, 1]);
        controller.load_from_cvs(&mut store);
        controller.set_function_state(0, true);
        (0..10)
            .map(|_| {
                controller.update(20).unwrap();
                controller.driver().pwm(3).unwrap()
            })
            .collect::<Vec<_>>()
    };
    assert_eq!(run(), run());
}
