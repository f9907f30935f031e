//! Configuration variable addresses and factory defaults.

use core::ops::RangeInclusive;

use crate::loader::MappingMethod;
use crate::traits::CvStore;

/// Primary short address.
pub const PRIMARY_ADDRESS: u16 = 1;
/// Start voltage.
pub const START_VOLTAGE: u16 = 2;
/// Acceleration rate.
pub const ACCELERATION: u16 = 3;
/// Deceleration rate.
pub const DECELERATION: u16 = 4;
/// Decoder version.
pub const VERSION: u16 = 7;
/// Manufacturer id (read-only on real decoders).
pub const MANUFACTURER: u16 = 8;
/// Decoder configuration flags.
pub const CONFIGURATION: u16 = 29;

/// Indexed CV selector, high byte.
pub const INDEXED_HIGH: u16 = 31;
/// Indexed CV selector, low byte (RCN-227 page).
pub const INDEXED_LOW: u16 = 32;

/// RCN-225 output location masks, F0 forward first.
pub const RCN225_OUTPUT_MAP: RangeInclusive<u16> = 33..=46;

/// Function mapping method selector.
pub const MAPPING_METHOD: u16 = 96;

/// First CV of the RCN-227 indexed window.
pub const RCN227_WINDOW: u16 = 257;

/// Proprietary function records.
pub const PROPRIETARY_FUNCTIONS: u16 = 200;
/// Proprietary condition variable records.
pub const PROPRIETARY_VARIABLES: u16 = 500;
/// Proprietary mapping rule records.
pub const PROPRIETARY_RULES: u16 = 700;

/// Manufacturer id for self-built decoders.
pub const MANUFACTURER_DIY: u8 = 165;

/// Seed a blank store with the decoder's factory configuration.
///
/// Standard CVs: short address 3, start voltage 80, acceleration 20,
/// deceleration 40, version 1, manufacturer 165, CV29 = 6 (28/128 speed
/// steps, analog conversion). Function mapping: RCN-225 with F0 forward on
/// output 1 and F0 reverse on output 2.
pub fn write_factory_defaults<S: CvStore + ?Sized>(store: &mut S) {
    let defaults = [
        (PRIMARY_ADDRESS, 3),
        (START_VOLTAGE, 80),
        (ACCELERATION, 20),
        (DECELERATION, 40),
        (VERSION, 1),
        (MANUFACTURER, MANUFACTURER_DIY),
        (CONFIGURATION, 6),
        (MAPPING_METHOD, MappingMethod::Rcn225.as_cv()),
        (*RCN225_OUTPUT_MAP.start(), 0b0000_0001),
        (*RCN225_OUTPUT_MAP.start() + 1, 0b0000_0010),
    ];
    for (cv, value) in defaults {
        store.write_cv(cv, value);
    }
    log::debug!("factory defaults written");
}
