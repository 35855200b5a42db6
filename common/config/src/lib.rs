// Licensed under the Apache-2.0 license

#![no_std]

//! Flash layout consumed by the bootloader: where the active application
//! lives and how the candidate storage is split into update slots.

mod error;
pub use error::ConfigError;

use flash_image::FIRMWARE_HEADER_SIZE;

/// Erase block size of the reference board's flash.
pub const BLOCK_SIZE: usize = 64 * 1024;

pub const DEFAULT_CANDIDATE_SLOTS: usize = 4;

/// A contiguous byte range on a storage device, relative to the device base.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct RegionConfig {
    pub base: usize,
    pub size: usize,
}

impl RegionConfig {
    pub fn end(&self) -> usize {
        self.base.saturating_add(self.size)
    }

    pub fn overlaps(&self, other: &RegionConfig) -> bool {
        self.base < other.end() && other.base < self.end()
    }
}

/// Candidate storage split into `slot_count` equally sized slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct CandidateConfig {
    pub base: usize,
    pub size: usize,
    pub header_size: usize,
    pub slot_count: usize,
}

impl CandidateConfig {
    pub fn region(&self) -> RegionConfig {
        RegionConfig {
            base: self.base,
            size: self.size,
        }
    }

    /// Size of one slot, checking the parts of the geometry that do not
    /// depend on the storage device.
    pub fn slot_size(&self) -> Result<usize, ConfigError> {
        if self.slot_count == 0 {
            return Err(ConfigError::NoSlots);
        }
        if self.size % self.slot_count != 0 {
            return Err(ConfigError::UnevenSlots {
                size: self.size,
                slot_count: self.slot_count,
            });
        }
        if self.header_size != FIRMWARE_HEADER_SIZE {
            return Err(ConfigError::HeaderSizeMismatch {
                configured: self.header_size,
                expected: FIRMWARE_HEADER_SIZE,
            });
        }
        let slot_size = self.size / self.slot_count;
        if self.header_size >= slot_size {
            return Err(ConfigError::HeaderExceedsSlot {
                header_size: self.header_size,
                slot_size,
            });
        }
        Ok(slot_size)
    }
}

/// Capacity and erase granularity of one storage device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageGeometry {
    pub capacity: usize,
    pub erase_size: usize,
}

impl StorageGeometry {
    fn contains(&self, region: &RegionConfig) -> bool {
        region.base <= self.capacity && region.size <= self.capacity - region.base
    }

    fn is_aligned(&self, value: usize) -> bool {
        self.erase_size != 0 && value % self.erase_size == 0
    }
}

/// Complete layout handed to the slot manager at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
#[cfg_attr(feature = "serde", serde(deny_unknown_fields))]
pub struct UpdateConfig {
    pub active: RegionConfig,
    /// Offset of the active firmware header within the active region.
    pub active_header_offset: usize,
    pub candidates: CandidateConfig,
}

impl Default for UpdateConfig {
    fn default() -> Self {
        UpdateConfig {
            active: RegionConfig {
                base: 2 * BLOCK_SIZE,
                size: 6 * BLOCK_SIZE,
            },
            active_header_offset: 0,
            candidates: CandidateConfig {
                base: 8 * BLOCK_SIZE,
                size: 8 * BLOCK_SIZE,
                header_size: FIRMWARE_HEADER_SIZE,
                slot_count: DEFAULT_CANDIDATE_SLOTS,
            },
        }
    }
}

impl UpdateConfig {
    /// Checks the layout against the devices it will be applied to and
    /// returns the slot size.
    ///
    /// `shared_device` is set when the active region and the candidate
    /// storage live on the same device, in which case they must not overlap.
    pub fn check(
        &self,
        active: StorageGeometry,
        candidates: StorageGeometry,
        shared_device: bool,
    ) -> Result<usize, ConfigError> {
        let slot_size = self.candidates.slot_size()?;
        if !candidates.is_aligned(slot_size) {
            return Err(ConfigError::SlotNotEraseAligned {
                slot_size,
                erase_size: candidates.erase_size,
            });
        }
        if !candidates.is_aligned(self.candidates.base) {
            return Err(ConfigError::RegionNotEraseAligned {
                region: "candidates",
            });
        }
        if !candidates.contains(&self.candidates.region()) {
            return Err(ConfigError::RegionOutOfBounds {
                region: "candidates",
                end: self.candidates.region().end(),
                capacity: candidates.capacity,
            });
        }

        if !active.is_aligned(self.active.base) || !active.is_aligned(self.active.size) {
            return Err(ConfigError::RegionNotEraseAligned { region: "active" });
        }
        if !active.contains(&self.active) {
            return Err(ConfigError::RegionOutOfBounds {
                region: "active",
                end: self.active.end(),
                capacity: active.capacity,
            });
        }
        let header_room = self.active.size.checked_sub(FIRMWARE_HEADER_SIZE);
        if !active.is_aligned(self.active_header_offset)
            || header_room.map_or(true, |room| self.active_header_offset > room)
        {
            return Err(ConfigError::InvalidActiveHeaderOffset(
                self.active_header_offset,
            ));
        }

        if shared_device && self.active.overlaps(&self.candidates.region()) {
            return Err(ConfigError::RegionsOverlap);
        }
        Ok(slot_size)
    }
}
