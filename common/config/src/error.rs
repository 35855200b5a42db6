// Licensed under the Apache-2.0 license

use thiserror::Error;

/// Layout violations detected while constructing the slot manager.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    #[error("candidate storage must have at least one slot")]
    NoSlots,
    #[error("candidate size {size:#x} is not divisible into {slot_count} slots")]
    UnevenSlots { size: usize, slot_count: usize },
    #[error("slot size {slot_size:#x} is not a multiple of the erase size {erase_size:#x}")]
    SlotNotEraseAligned { slot_size: usize, erase_size: usize },
    #[error("header size {configured} does not match the firmware header size {expected}")]
    HeaderSizeMismatch { configured: usize, expected: usize },
    #[error("header size {header_size} leaves no payload room in a {slot_size:#x} byte slot")]
    HeaderExceedsSlot { header_size: usize, slot_size: usize },
    #[error("{region} region ends at {end:#x}, past the device capacity {capacity:#x}")]
    RegionOutOfBounds {
        region: &'static str,
        end: usize,
        capacity: usize,
    },
    #[error("{region} region is not erase aligned")]
    RegionNotEraseAligned { region: &'static str },
    #[error("active header offset {0:#x} is unaligned or outside the active region")]
    InvalidActiveHeaderOffset(usize),
    #[error("active and candidate regions overlap")]
    RegionsOverlap,
}
