//! Desktop simulator for the function output engine.
//!
//! Seeds an in-memory CV store with the factory defaults, loads it into an
//! [`AuxController`] over the mock driver and replays a short driving
//! session, printing the output levels whenever they change.
//!
//! # Usage
//!
//! ```sh
//! cargo run --bin aux_sim
//!
//! # Custom board description (JSON form of `AuxConfig`)
//! cargo run --bin aux_sim --features serde-json -- board.json
//!
//! # With engine logs
//! RUST_LOG=debug cargo run --bin aux_sim
//! ```

use anyhow::{anyhow, Result};
use loco_aux::hal::{MockCvStore, MockDriver};
use loco_aux::{cv, AuxConfig, AuxController, Direction};

/// Simulated session length.
const SESSION_MS: u32 = 4_000;

/// One scripted decoder input.
#[derive(Clone, Copy, Debug)]
enum Step {
    Function(u8, bool),
    Direction(Direction),
    Speed(u16),
}

/// Inputs applied at the given time in ms.
const SCRIPT: &[(u32, Step)] = &[
    (100, Step::Function(0, true)),
    (600, Step::Speed(14)),
    (1_500, Step::Speed(0)),
    (1_800, Step::Direction(Direction::Reverse)),
    (2_200, Step::Speed(10)),
    (3_000, Step::Function(0, false)),
];

fn load_config() -> Result<AuxConfig> {
    match std::env::args().nth(1) {
        #[cfg(feature = "serde-json")]
        Some(path) => {
            use anyhow::Context;
            let text = std::fs::read_to_string(&path).with_context(|| format!("reading {path}"))?;
            serde_json::from_str(&text).with_context(|| format!("parsing {path}"))
        }
        #[cfg(not(feature = "serde-json"))]
        Some(_) => Err(anyhow!("board files need the `serde-json` feature")),
        None => Ok(AuxConfig::default_pinout()),
    }
}

fn main() -> Result<()> {
    env_logger::init();

    println!("================================");
    println!("  loco-aux function simulator");
    println!("================================");
    println!();

    let config = load_config()?;
    let mut controller = AuxController::from_config(MockDriver::new(), &config)
        .map_err(|()| anyhow!("output driver rejected a write"))?;

    let mut store = MockCvStore::new();
    cv::write_factory_defaults(&mut store);
    let report = controller.load_from_cvs(&mut store);
    println!("Loaded {report}");

    let pins: Vec<u8> = config.outputs.iter().map(|o| o.pin).collect();
    let mut last: Vec<Option<u8>> = Vec::new();
    let tick = config.tick_interval_ms.max(1);
    let mut script = SCRIPT.iter().peekable();
    let mut now = 0;

    while now <= SESSION_MS {
        while let Some((_, step)) = script.next_if(|(at, _)| *at <= now) {
            println!("{now:>6} ms  {step:?}");
            match *step {
                Step::Function(number, on) => controller.set_function_state(number, on),
                Step::Direction(direction) => controller.set_direction(direction),
                Step::Speed(speed) => controller.set_speed(speed),
            }
        }

        controller
            .update(tick)
            .map_err(|()| anyhow!("output driver rejected a write at {now} ms"))?;

        let levels: Vec<Option<u8>> = pins.iter().map(|&p| controller.driver().pwm(p)).collect();
        if levels != last {
            let row: Vec<String> = pins
                .iter()
                .zip(&levels)
                .map(|(pin, level)| match level {
                    Some(level) => format!("pin {pin:>2}: {level:>3}"),
                    None => format!("pin {pin:>2}:   -"),
                })
                .collect();
            println!("{now:>6} ms  {}", row.join("  "));
            last = levels;
        }

        now += tick;
    }

    Ok(())
}
