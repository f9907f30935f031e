//! RCN-227 extended function mapping.
//!
//! All four variants live in the indexed CV window starting at CV 257;
//! the page is selected by writing CV 31 = 0 and CV 32 = page first.
//!
//! | Page | Variant | Record |
//! |------|---------|--------|
//! | 40 | per function | 32 functions × 2 directions × (24-bit output mask, blocking key) |
//! | 41 | per output V1 | 24 outputs × 2 directions × 32-bit function mask |
//! | 42 | per output V2 | 32 outputs × 2 directions × (3 function keys, blocking key) |
//! | 43 | per output V3 | 32 outputs × 8 packed bytes |
//!
//! Direction 0 in a record pair is forward, 1 is reverse. Byte value 255
//! marks an unused function or blocking slot.

extern crate alloc;
use alloc::vec::Vec;

use super::{select_page, GraphBuilder};
use crate::cv;
use crate::mapping::{Condition, ConditionId, MappingAction, MappingRule};
use crate::output::OutputTable;
use crate::traits::{CvStore, Direction};

/// Page of the per-function mapping.
pub const PAGE_PER_FUNCTION: u8 = 40;
/// Page of the per-output V1 mapping.
pub const PAGE_PER_OUTPUT_V1: u8 = 41;
/// Page of the per-output V2 mapping.
pub const PAGE_PER_OUTPUT_V2: u8 = 42;
/// Page of the per-output V3 mapping.
pub const PAGE_PER_OUTPUT_V3: u8 = 43;

/// Functions covered by the per-function page.
pub const PER_FUNCTION_COUNT: u16 = 32;
/// Outputs covered by the V1 page.
pub const V1_OUTPUT_COUNT: u16 = 24;
/// Outputs covered by the V2 and V3 pages.
pub const V2_V3_OUTPUT_COUNT: u16 = 32;

/// Unused function / blocking slot.
pub const UNUSED: u8 = 0xFF;
/// Highest V3 16-bit value that still addresses a function key.
pub const V3_LAST_FUNCTION_KEY: u16 = 68;

const DIRECTIONS: [Direction; 2] = [Direction::Forward, Direction::Reverse];

fn record_base(entity: u16, direction: usize) -> u16 {
    cv::RCN227_WINDOW + (entity * 2 + direction as u16) * 4
}

/// Per-function mapping: each (function, direction) record switches the
/// outputs in its mask, unless the blocking key is on.
pub(crate) fn load_per_function<S, T>(store: &mut S, builder: &mut GraphBuilder<'_, T>)
where
    S: CvStore + ?Sized,
    T: OutputTable + ?Sized,
{
    select_page(store, PAGE_PER_FUNCTION);

    for function in 0..PER_FUNCTION_COUNT {
        for (dir, &direction) in DIRECTIONS.iter().enumerate() {
            let base = record_base(function, dir);
            let mask = u32::from(store.read_cv(base))
                | u32::from(store.read_cv(base + 1)) << 8
                | u32::from(store.read_cv(base + 2)) << 16;
            let blocking = store.read_cv(base + 3);
            if mask == 0 {
                continue;
            }

            let mut trigger = None;
            for bit in 0..24u8 {
                if mask & (1 << bit) == 0 {
                    continue;
                }
                let Some(output) = builder.output(bit + 1) else {
                    continue;
                };
                let id = *trigger.get_or_insert_with(|| builder.function_key(function, Some(direction)));
                let mut rule = MappingRule::new(builder.add_steady(output), MappingAction::Activate)
                    .with_positive(id);
                if blocking != UNUSED {
                    rule = rule.with_negative(builder.blocking_key(u16::from(blocking)));
                }
                builder.add_rule(rule);
            }
        }
    }
}

/// Per-output V1: each (output, direction) record holds a 32-bit mask of
/// function keys F0..F31 that switch the output.
pub(crate) fn load_per_output_v1<S, T>(store: &mut S, builder: &mut GraphBuilder<'_, T>)
where
    S: CvStore + ?Sized,
    T: OutputTable + ?Sized,
{
    select_page(store, PAGE_PER_OUTPUT_V1);

    for output_number in 0..V1_OUTPUT_COUNT {
        let Some(output) = builder.output(output_number as u8 + 1) else {
            continue;
        };
        let mut function = None;

        for (dir, &direction) in DIRECTIONS.iter().enumerate() {
            let base = record_base(output_number, dir);
            let mask = (0..4).fold(0u32, |mask, i| {
                mask | u32::from(store.read_cv(base + i)) << (8 * i)
            });

            for key in 0..32u16 {
                if mask & (1 << key) == 0 {
                    continue;
                }
                let target = *function.get_or_insert_with(|| builder.add_steady(output));
                let id = builder.function_key(key, Some(direction));
                builder.add_rule(MappingRule::new(target, MappingAction::Activate).with_positive(id));
            }
        }
    }
}

/// Per-output V2: each (output, direction) record holds up to three
/// function keys and one blocking key shared by all three.
pub(crate) fn load_per_output_v2<S, T>(store: &mut S, builder: &mut GraphBuilder<'_, T>)
where
    S: CvStore + ?Sized,
    T: OutputTable + ?Sized,
{
    select_page(store, PAGE_PER_OUTPUT_V2);

    for output_number in 0..V2_V3_OUTPUT_COUNT {
        let Some(output) = builder.output(output_number as u8 + 1) else {
            continue;
        };
        let mut function = None;

        for (dir, &direction) in DIRECTIONS.iter().enumerate() {
            let base = record_base(output_number, dir);
            let keys = [
                store.read_cv(base),
                store.read_cv(base + 1),
                store.read_cv(base + 2),
            ];
            let blocking = store.read_cv(base + 3);

            for key in keys.into_iter().filter(|&k| k != UNUSED) {
                let target = *function.get_or_insert_with(|| builder.add_steady(output));
                let id = builder.function_key(u16::from(key), Some(direction));
                let mut rule = MappingRule::new(target, MappingAction::Activate).with_positive(id);
                if blocking != UNUSED {
                    rule = rule.with_negative(builder.blocking_key(u16::from(blocking)));
                }
                builder.add_rule(rule);
            }
        }
    }
}

/// One decoded V3 entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum V3Entry {
    /// Slot not used.
    Unused,
    /// Function key, optionally restricted to a direction.
    Key {
        /// Function key number.
        key: u16,
        /// Direction filter; `None` for any direction.
        direction: Option<Direction>,
        /// Whether the entry blocks instead of activating.
        blocking: bool,
    },
    /// Binary state.
    BinaryState {
        /// Binary state number.
        number: u16,
        /// Whether the entry blocks instead of activating.
        blocking: bool,
    },
}

impl V3Entry {
    /// Decode one of the four packed bytes: 6-bit key F0..F63 plus a
    /// 2-bit selector (00 any, 01 forward, 10 reverse, 11 blocking).
    pub const fn from_byte(byte: u8) -> Self {
        if byte == UNUSED {
            return V3Entry::Unused;
        }
        let key = (byte & 0x3F) as u16;
        let (direction, blocking) = match byte >> 6 {
            0b01 => (Some(Direction::Forward), false),
            0b10 => (Some(Direction::Reverse), false),
            0b11 => (None, true),
            _ => (None, false),
        };
        V3Entry::Key {
            key,
            direction,
            blocking,
        }
    }

    /// Decode one of the two 16-bit entries: blocking flag in the top bit,
    /// 15-bit value below. Values up to 68 are function keys, larger ones
    /// address binary state `value - 69`.
    pub const fn from_word(high: u8, low: u8) -> Self {
        if high == UNUSED && low == UNUSED {
            return V3Entry::Unused;
        }
        let blocking = high & 0x80 != 0;
        let value = ((high & 0x7F) as u16) << 8 | low as u16;
        if value <= V3_LAST_FUNCTION_KEY {
            V3Entry::Key {
                key: value,
                direction: None,
                blocking,
            }
        } else {
            V3Entry::BinaryState {
                number: value - (V3_LAST_FUNCTION_KEY + 1),
                blocking,
            }
        }
    }
}

/// Per-output V3: one 8-byte record per output, compiled into one
/// function with an activation rule (any activating entry, no blocking
/// entry) and a deactivation rule (no activating entry).
pub(crate) fn load_per_output_v3<S, T>(store: &mut S, builder: &mut GraphBuilder<'_, T>)
where
    S: CvStore + ?Sized,
    T: OutputTable + ?Sized,
{
    select_page(store, PAGE_PER_OUTPUT_V3);

    for output_number in 0..V2_V3_OUTPUT_COUNT {
        let Some(output) = builder.output(output_number as u8 + 1) else {
            continue;
        };
        let base = cv::RCN227_WINDOW + output_number * 8;
        let bytes: [u8; 8] = core::array::from_fn(|i| store.read_cv(base + i as u16));

        let entries = bytes[..4]
            .iter()
            .map(|&b| V3Entry::from_byte(b))
            .chain([
                V3Entry::from_word(bytes[4], bytes[5]),
                V3Entry::from_word(bytes[6], bytes[7]),
            ]);

        let mut activating: Vec<ConditionId> = Vec::new();
        let mut blocking: Vec<ConditionId> = Vec::new();
        for entry in entries {
            let (id, blocks) = match entry {
                V3Entry::Unused => continue,
                V3Entry::Key {
                    key,
                    direction,
                    blocking,
                } => (builder.function_key(key, direction), blocking),
                V3Entry::BinaryState { number, blocking } => (
                    builder.add_variable([Condition::binary_state_on(number)]),
                    blocking,
                ),
            };
            if blocks {
                blocking.push(id);
            } else {
                activating.push(id);
            }
        }

        if activating.is_empty() && blocking.is_empty() {
            continue;
        }

        let target = builder.add_steady(output);

        if !activating.is_empty() {
            let mut rule = MappingRule::new(target, MappingAction::Activate);
            for &id in &activating {
                rule = rule.with_positive(id);
            }
            for &id in &blocking {
                rule = rule.with_negative(id);
            }
            builder.add_rule(rule);
        }

        let mut off = MappingRule::new(target, MappingAction::Deactivate);
        for &id in &activating {
            off = off.with_negative(id);
        }
        builder.add_rule(off);
    }
}
