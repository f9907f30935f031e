//! RCN-225 function output mapping.
//!
//! CVs 33..=46 each hold an 8-bit output mask for one function key:
//!
//! | CV | Trigger |
//! |----|---------|
//! | 33 | F0 while forward |
//! | 34 | F0 while reverse |
//! | 35..=46 | F1..=F12 |
//!
//! Bit `b` of a mask switches output id `b + 1` (a full-brightness steady
//! light) while the trigger holds. Every set bit gets its own logical
//! function and rule; one condition variable per CV is shared by them.

use super::GraphBuilder;
use crate::cv;
use crate::mapping::{MappingAction, MappingRule};
use crate::output::OutputTable;
use crate::traits::{CvStore, Direction};

/// Trigger of the mapping CV at `index` (0 = CV 33): function key and
/// optional direction.
pub const fn trigger(index: u16) -> (u16, Option<Direction>) {
    match index {
        0 => (0, Some(Direction::Forward)),
        1 => (0, Some(Direction::Reverse)),
        n => (n - 1, None),
    }
}

pub(crate) fn load<S, T>(store: &mut S, builder: &mut GraphBuilder<'_, T>)
where
    S: CvStore + ?Sized,
    T: OutputTable + ?Sized,
{
    for (index, address) in cv::RCN225_OUTPUT_MAP.enumerate() {
        let mask = store.read_cv(address);
        if mask == 0 {
            continue;
        }
        let (key, direction) = trigger(index as u16);
        let mut variable = None;

        for bit in 0..8u8 {
            if mask & (1 << bit) == 0 {
                continue;
            }
            let Some(output) = builder.output(bit + 1) else {
                log::debug!("CV{address}: output {} not present, skipped", bit + 1);
                continue;
            };
            let id = *variable.get_or_insert_with(|| builder.function_key(key, direction));
            let function = builder.add_steady(output);
            builder.add_rule(MappingRule::new(function, MappingAction::Activate).with_positive(id));
        }
    }
}
