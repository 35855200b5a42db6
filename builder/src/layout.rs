// Licensed under the Apache-2.0 license

use crate::flash_image::load_file;
use anyhow::{anyhow, bail, Result};
use boot_config::{StorageGeometry, UpdateConfig, BLOCK_SIZE};
use serde::{Deserialize, Serialize};
use std::path::Path;

pub const ERASED_BYTE: u8 = 0xff;

/// The flash device a layout is written for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DeviceConfig {
    pub capacity: usize,
    pub erase_size: usize,
}

/// A single flash device holding both the active region and the candidate
/// slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FlashLayout {
    pub device: DeviceConfig,
    pub update: UpdateConfig,
}

impl Default for FlashLayout {
    fn default() -> Self {
        FlashLayout {
            device: DeviceConfig {
                capacity: 16 * BLOCK_SIZE,
                erase_size: BLOCK_SIZE,
            },
            update: UpdateConfig::default(),
        }
    }
}

impl FlashLayout {
    pub fn geometry(&self) -> StorageGeometry {
        StorageGeometry {
            capacity: self.device.capacity,
            erase_size: self.device.erase_size,
        }
    }

    /// Validates the layout the same way the bootloader does and returns
    /// the slot size.
    pub fn check(&self) -> Result<usize> {
        self.update
            .check(self.geometry(), self.geometry(), true)
            .map_err(|e| anyhow!("Invalid flash layout: {}", e))
    }

    /// Device offset of candidate slot `slot`.
    pub fn slot_offset(&self, slot: usize) -> Result<usize> {
        let slot_size = self.check()?;
        if slot >= self.update.candidates.slot_count {
            bail!(
                "Slot {} out of range, the layout has {} slots",
                slot,
                self.update.candidates.slot_count
            );
        }
        Ok(self.update.candidates.base + slot * slot_size)
    }

    /// Device offset of the active firmware header.
    pub fn active_header_offset(&self) -> usize {
        self.update.active.base + self.update.active_header_offset
    }
}

/// Reads a layout from a TOML file, or the default layout when no file is
/// given.
pub fn load_layout(path: Option<&Path>) -> Result<FlashLayout> {
    let Some(path) = path else {
        return Ok(FlashLayout::default());
    };
    let text = std::fs::read_to_string(path)
        .map_err(|e| anyhow!("Cannot read layout '{}': {}", path.display(), e))?;
    let layout: FlashLayout = toml::from_str(&text)
        .map_err(|e| anyhow!("Cannot parse layout '{}': {}", path.display(), e))?;
    layout.check()?;
    Ok(layout)
}

/// Builds the contents of an erased flash device with the given images in
/// place. Images are copied as-is, so damaged images can be staged too.
pub fn flash_layout_build(
    layout: &FlashLayout,
    active: Option<&[u8]>,
    candidates: &[(usize, &[u8])],
) -> Result<Vec<u8>> {
    let slot_size = layout.check()?;
    let mut flash = vec![ERASED_BYTE; layout.device.capacity];

    if let Some(image) = active {
        let room = layout.update.active.size - layout.update.active_header_offset;
        if image.len() > room {
            bail!(
                "Active image of {} bytes does not fit in {} bytes",
                image.len(),
                room
            );
        }
        let start = layout.active_header_offset();
        flash[start..start + image.len()].copy_from_slice(image);
    }

    for (slot, image) in candidates {
        if image.len() > slot_size {
            bail!(
                "Candidate image for slot {} is {} bytes, the slot holds {}",
                slot,
                image.len(),
                slot_size
            );
        }
        let start = layout.slot_offset(*slot)?;
        flash[start..start + image.len()].copy_from_slice(image);
    }
    Ok(flash)
}

/// Writes a flash file for `layout` with an optional active image and
/// `(slot, image file)` candidates.
pub fn flash_layout_create(
    layout: &FlashLayout,
    active: Option<&str>,
    candidates: &[(usize, String)],
    output_path: &str,
) -> Result<()> {
    let active = active.map(load_file).transpose()?;
    let mut candidate_images = Vec::new();
    for (slot, path) in candidates {
        candidate_images.push((*slot, load_file(path)?));
    }
    let candidate_refs: Vec<(usize, &[u8])> = candidate_images
        .iter()
        .map(|(slot, image)| (*slot, image.as_slice()))
        .collect();

    let flash = flash_layout_build(layout, active.as_deref(), &candidate_refs)?;
    std::fs::write(output_path, &flash)
        .map_err(|e| anyhow!("Unable to write file {}: {}", output_path, e))?;
    println!(
        "Wrote {} byte flash file to {} ({} candidate images)",
        flash.len(),
        output_path,
        candidates.len()
    );
    Ok(())
}
