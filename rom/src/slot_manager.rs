// Licensed under the Apache-2.0 license

//! Candidate slot manager.
//!
//! Splits the candidate storage into equally sized slots, picks a slot to
//! boot from and copies it into the active region. Scanning only reads;
//! `install` is the single writer of the active region.

use crate::error::UcErrorCode;
use crate::executor::{CopyExecutor, InlineExecutor};
use crate::flash::flash_partition::FlashPartition;
use crate::flash::hil::FlashStorage;
use crate::image::FirmwareImage;
use crate::validator::{self, CHUNK_SIZE};
use boot_config::{ConfigError, StorageGeometry, UpdateConfig};
use log::{debug, error, info, warn};

/// A candidate chosen by a scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSelection {
    pub index: usize,
    pub version: u64,
}

/// First slot whose scan result is `Ok`, in iteration order.
pub fn select_first_valid<I>(scan: I) -> Option<SlotSelection>
where
    I: IntoIterator<Item = (usize, Result<u64, UcErrorCode>)>,
{
    scan.into_iter().find_map(|(index, result)| {
        result.ok().map(|version| SlotSelection { index, version })
    })
}

/// Valid slot with the greatest version strictly above `reference`.
///
/// Only strict improvements replace the current pick, so among slots
/// sharing the highest version the first one scanned wins.
pub fn select_newer<I>(reference: u64, scan: I) -> Option<SlotSelection>
where
    I: IntoIterator<Item = (usize, Result<u64, UcErrorCode>)>,
{
    scan.into_iter()
        .fold(None, |best: Option<SlotSelection>, (index, result)| {
            let floor = best.map_or(reference, |b| b.version);
            match result {
                Ok(version) if version > floor => Some(SlotSelection { index, version }),
                _ => best,
            }
        })
}

fn align_up(value: usize, align: usize) -> Option<usize> {
    value.checked_next_multiple_of(align)
}

fn geometry(storage: &dyn FlashStorage) -> StorageGeometry {
    StorageGeometry {
        capacity: storage.capacity(),
        erase_size: storage.erase_size(),
    }
}

pub struct SlotManager<'a, E: CopyExecutor = InlineExecutor> {
    candidates: FlashPartition<'a>,
    active: FlashPartition<'a>,
    active_header_offset: usize,
    header_size: usize,
    slot_size: usize,
    slot_count: usize,
    shared_device: bool,
    executor: E,
}

impl<'a> SlotManager<'a, InlineExecutor> {
    pub fn new(
        candidate_storage: &'a dyn FlashStorage,
        active_storage: &'a dyn FlashStorage,
        config: &UpdateConfig,
    ) -> Result<Self, ConfigError> {
        Self::with_executor(candidate_storage, active_storage, config, InlineExecutor)
    }
}

impl<'a, E: CopyExecutor> SlotManager<'a, E> {
    /// Builds a manager over the given devices. Layout violations are
    /// construction errors; nothing is read from the devices.
    pub fn with_executor(
        candidate_storage: &'a dyn FlashStorage,
        active_storage: &'a dyn FlashStorage,
        config: &UpdateConfig,
        executor: E,
    ) -> Result<Self, ConfigError> {
        let shared_device = core::ptr::addr_eq(
            candidate_storage as *const dyn FlashStorage,
            active_storage as *const dyn FlashStorage,
        );
        let slot_size = config.check(
            geometry(active_storage),
            geometry(candidate_storage),
            shared_device,
        )?;

        let candidates = FlashPartition::new(
            candidate_storage,
            "candidates",
            config.candidates.base,
            config.candidates.size,
        )
        .map_err(|_| ConfigError::RegionOutOfBounds {
            region: "candidates",
            end: config.candidates.region().end(),
            capacity: candidate_storage.capacity(),
        })?;
        let active = FlashPartition::new(
            active_storage,
            "active",
            config.active.base,
            config.active.size,
        )
        .map_err(|_| ConfigError::RegionOutOfBounds {
            region: "active",
            end: config.active.end(),
            capacity: active_storage.capacity(),
        })?;

        Ok(SlotManager {
            candidates,
            active,
            active_header_offset: config.active_header_offset,
            header_size: config.candidates.header_size,
            slot_size,
            slot_count: config.candidates.slot_count,
            shared_device,
            executor,
        })
    }

    pub fn number_of_slots(&self) -> usize {
        self.slot_count
    }

    pub fn slot_size(&self) -> usize {
        self.slot_size
    }

    pub fn header_size(&self) -> usize {
        self.header_size
    }

    pub fn active_header_offset(&self) -> usize {
        self.active_header_offset
    }

    pub fn active_region(&self) -> &FlashPartition<'a> {
        &self.active
    }

    pub fn candidate_region(&self) -> &FlashPartition<'a> {
        &self.candidates
    }

    /// Active region and candidates are on the same device.
    pub fn shares_device(&self) -> bool {
        self.shared_device
    }

    /// The image stored in slot `slot_index`, bounded to that slot. `None`
    /// when the index is out of range.
    pub fn image_at(&self, slot_index: usize) -> Option<FirmwareImage<'a>> {
        if slot_index >= self.slot_count {
            return None;
        }
        let slot = self
            .candidates
            .subpartition("candidate-slot", slot_index * self.slot_size, self.slot_size)
            .ok()?;
        Some(FirmwareImage::new(slot, 0, self.header_size))
    }

    /// The image at the configured header offset of the active region.
    pub fn active_image(&self) -> FirmwareImage<'a> {
        self.active_image_at(self.active_header_offset)
    }

    fn active_image_at(&self, header_offset: usize) -> FirmwareImage<'a> {
        FirmwareImage::new(self.active, header_offset, header_offset + self.header_size)
    }

    fn scan_slot(&self, slot_index: usize) -> Result<u64, UcErrorCode> {
        let image = self.image_at(slot_index).ok_or(UcErrorCode::Unknown)?;
        match validator::check_image(&image) {
            Ok(header) => {
                debug!(
                    "[slot-manager] slot {} valid, version {}",
                    slot_index,
                    header.firmware_version()
                );
                Ok(header.firmware_version())
            }
            Err(err) => {
                debug!("[slot-manager] slot {} skipped: {}", slot_index, err);
                Err(err)
            }
        }
    }

    fn scan(&self) -> impl Iterator<Item = (usize, Result<u64, UcErrorCode>)> + '_ {
        (0..self.slot_count).map(move |index| (index, self.scan_slot(index)))
    }

    /// Lowest-index valid slot, regardless of its version. Scanning stops at
    /// the first hit.
    pub fn find_any_valid_candidate(&self) -> Option<SlotSelection> {
        select_first_valid(self.scan())
    }

    /// Valid slot with the greatest version strictly newer than
    /// `reference`. `None` when `reference` has no readable header.
    pub fn find_newer_valid_candidate(&self, reference: &FirmwareImage) -> Option<SlotSelection> {
        let Some(current) = validator::version(reference) else {
            warn!("[slot-manager] reference image has no readable header");
            return None;
        };
        select_newer(current, self.scan())
    }

    /// Copies slot `slot_index` into the active region with its header at
    /// `target_header_offset`, then validates the copy.
    ///
    /// An invalid source slot is reported with its own validation result and
    /// the active region is left untouched. Failures after the erase leave
    /// the active region in an undefined state.
    pub fn install(&self, slot_index: usize, target_header_offset: usize) -> UcErrorCode {
        match self.try_install(slot_index, target_header_offset) {
            Ok(()) => {
                info!(
                    "[slot-manager] installed slot {} at {:#x}",
                    slot_index, target_header_offset
                );
                UcErrorCode::None
            }
            Err(err) => {
                error!("[slot-manager] install of slot {} failed: {}", slot_index, err);
                err
            }
        }
    }

    fn try_install(&self, slot_index: usize, target_header_offset: usize) -> Result<(), UcErrorCode> {
        let source = self.image_at(slot_index).ok_or(UcErrorCode::Unknown)?;
        let header = validator::check_image(&source)?;
        let image_len = self.header_size + header.payload_size();

        let erase_size = self.active.erase_size();
        if erase_size == 0 || target_header_offset % erase_size != 0 {
            warn!(
                "[slot-manager] target offset {:#x} is not erase aligned",
                target_header_offset
            );
            return Err(UcErrorCode::ProgramFailed);
        }
        let erase_len = target_header_offset
            .checked_add(image_len)
            .filter(|end| *end <= self.active.len())
            .and_then(|end| align_up(end, erase_size))
            .map(|end| end - target_header_offset)
            .ok_or_else(|| {
                warn!(
                    "[slot-manager] image of {:#x} bytes does not fit the active region",
                    image_len
                );
                UcErrorCode::ProgramFailed
            })?;

        let target = self.active_image_at(target_header_offset);
        info!(
            "[slot-manager] copying slot {} (version {}, {:#x} bytes)",
            slot_index,
            header.firmware_version(),
            image_len
        );
        self.executor
            .execute(move || copy_image(&source, &target, image_len, erase_len))?;

        match validator::validate(&target) {
            UcErrorCode::None => Ok(()),
            err => {
                error!("[slot-manager] read-back of the installed image failed: {}", err);
                Err(UcErrorCode::ProgramFailed)
            }
        }
    }
}

/// Erases the destination and copies header and payload in bounded chunks.
fn copy_image(
    source: &FirmwareImage,
    target: &FirmwareImage,
    image_len: usize,
    erase_len: usize,
) -> Result<(), UcErrorCode> {
    target
        .region()
        .erase(target.header_offset(), erase_len)
        .map_err(|_| UcErrorCode::ProgramFailed)?;

    let mut chunk = [0u8; CHUNK_SIZE];
    let mut offset = 0;
    while offset < image_len {
        let len = core::cmp::min(CHUNK_SIZE, image_len - offset);
        source
            .region()
            .read(source.header_offset() + offset, &mut chunk[..len])
            .map_err(|_| UcErrorCode::ReadFailed)?;
        target
            .region()
            .program(target.header_offset() + offset, &chunk[..len])
            .map_err(|_| UcErrorCode::ProgramFailed)?;
        offset += len;
    }
    Ok(())
}
