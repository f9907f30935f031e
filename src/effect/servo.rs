//! Servo movement between two endpoints.

use crate::output::OutputSink;

/// How activation maps to a servo endpoint.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ServoMode {
    /// Every activation moves to the other endpoint (uncoupler, turntable
    /// door). Deactivation does not move.
    #[default]
    Latching,
    /// Endpoint B while active, endpoint A otherwise (pantograph).
    Momentary,
}

/// Servo travelling between endpoint A and endpoint B at a fixed rate.
///
/// The servo starts at endpoint A. While inactive it keeps its position;
/// the angle is written on every tick either way.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServoEffect {
    endpoint_a: u8,
    endpoint_b: u8,
    /// Degrees per second; 0 moves in one tick.
    speed: f32,
    mode: ServoMode,
    current: f32,
    target: f32,
    at_a: bool,
    active: bool,
}

impl ServoEffect {
    /// Creates a servo resting at `endpoint_a`.
    ///
    /// `travel_speed` 1..=255 maps onto 10..=360 degrees per second.
    /// 0 is not a slow rate: it jumps straight to the target on the next
    /// tick, whatever the tick length, so an unconfigured servo never
    /// lingers between endpoints.
    pub fn new(endpoint_a: u8, endpoint_b: u8, travel_speed: u8, mode: ServoMode) -> Self {
        let speed = if travel_speed == 0 {
            0.0
        } else {
            (f32::from(travel_speed) / 255.0) * 350.0 + 10.0
        };
        Self {
            endpoint_a,
            endpoint_b,
            speed,
            mode,
            current: f32::from(endpoint_a),
            target: f32::from(endpoint_a),
            at_a: true,
            active: false,
        }
    }

    /// Travel rate in degrees per second (0 = instant).
    pub fn speed(&self) -> f32 {
        self.speed
    }

    /// Latching or momentary.
    pub fn mode(&self) -> ServoMode {
        self.mode
    }

    /// Current angle in degrees, truncated.
    pub fn angle(&self) -> u16 {
        self.current as u16
    }

    /// Angle the servo is moving towards.
    pub fn target(&self) -> u16 {
        self.target as u16
    }

    /// Switch on or off. Only edges move the target.
    pub fn set_active(&mut self, active: bool) {
        if active != self.active {
            match self.mode {
                ServoMode::Latching if active => {
                    self.target = f32::from(if self.at_a {
                        self.endpoint_b
                    } else {
                        self.endpoint_a
                    });
                    self.at_a = !self.at_a;
                }
                ServoMode::Latching => {}
                ServoMode::Momentary => {
                    self.target = f32::from(if active {
                        self.endpoint_b
                    } else {
                        self.endpoint_a
                    });
                }
            }
        }
        self.active = active;
    }

    /// Whether the effect is on.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Move towards the target and write the angle.
    pub fn update<S: OutputSink>(&mut self, delta_ms: u32, outputs: &mut S) -> Result<(), S::Error> {
        if self.current != self.target {
            if self.speed == 0.0 {
                self.current = self.target;
            } else {
                let step = self.speed * (delta_ms as f32 / 1000.0);
                self.current = if self.current < self.target {
                    (self.current + step).min(self.target)
                } else {
                    (self.current - step).max(self.target)
                };
            }
        }
        outputs.set_servo_all(self.current as u16)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::RecordingSink;

    fn angle(sink: &RecordingSink) -> u16 {
        sink.angles[0].unwrap_or(u16::MAX)
    }

    #[test]
    fn speed_mapping() {
        assert_eq!(ServoEffect::new(0, 90, 0, ServoMode::Latching).speed(), 0.0);
        assert_eq!(ServoEffect::new(0, 90, 255, ServoMode::Latching).speed(), 360.0);
    }

    #[test]
    fn zero_speed_crosses_full_travel_in_one_tick() {
        let mut servo = ServoEffect::new(0, 180, 0, ServoMode::Momentary);
        let mut out = RecordingSink::new(1);
        servo.set_active(true);
        servo.update(1, &mut out).unwrap();
        assert_eq!(angle(&out), 180);
        servo.set_active(false);
        servo.update(0, &mut out).unwrap();
        assert_eq!(angle(&out), 0);
    }

    #[test]
    fn latching_toggles_on_each_activation() {
        let mut servo = ServoEffect::new(10, 100, 0, ServoMode::Latching);
        let mut out = RecordingSink::new(1);

        servo.update(20, &mut out).unwrap();
        assert_eq!(angle(&out), 10);

        servo.set_active(true);
        servo.update(20, &mut out).unwrap();
        assert_eq!(angle(&out), 100);

        // release holds position
        servo.set_active(false);
        servo.update(20, &mut out).unwrap();
        assert_eq!(angle(&out), 100);

        servo.set_active(true);
        servo.update(20, &mut out).unwrap();
        assert_eq!(angle(&out), 10);
    }

    #[test]
    fn repeated_activation_is_not_an_edge() {
        let mut servo = ServoEffect::new(0, 90, 0, ServoMode::Latching);
        servo.set_active(true);
        servo.set_active(true);
        assert_eq!(servo.target(), 90);
    }

    #[test]
    fn momentary_follows_active_flag() {
        let mut servo = ServoEffect::new(20, 160, 0, ServoMode::Momentary);
        let mut out = RecordingSink::new(1);
        servo.set_active(true);
        servo.update(1, &mut out).unwrap();
        assert_eq!(angle(&out), 160);
        servo.set_active(false);
        servo.update(1, &mut out).unwrap();
        assert_eq!(angle(&out), 20);
    }

    #[test]
    fn travel_is_rate_limited_and_clamped() {
        // 255 -> 360 deg/s
        let mut servo = ServoEffect::new(0, 180, 255, ServoMode::Momentary);
        let mut out = RecordingSink::new(1);
        servo.set_active(true);

        servo.update(250, &mut out).unwrap();
        assert_eq!(angle(&out), 90);

        servo.update(1000, &mut out).unwrap();
        assert_eq!(angle(&out), 180);

        servo.set_active(false);
        servo.update(125, &mut out).unwrap();
        assert_eq!(angle(&out), 135);
    }
}
