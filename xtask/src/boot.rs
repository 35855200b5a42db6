// Licensed under the Apache-2.0 license

use anyhow::{anyhow, bail, Result};
use bootloader_core::boot_flow::{select_boot_image, BootSource};
use bootloader_core::flash::emulated_flash::EmulatedFlash;
use bootloader_core::{validator, SlotManager, ThreadExecutor};
use image_builder::load_layout;
use std::path::Path;

/// Runs boot image selection against a flash file and writes the resulting
/// flash contents back to it.
pub(crate) fn boot(flash_path: &Path, layout_path: Option<&Path>) -> Result<()> {
    let layout = load_layout(layout_path)?;
    let flash = EmulatedFlash::from_file(
        flash_path,
        layout.device.capacity,
        layout.device.erase_size,
    )
    .map_err(|e| anyhow!("Cannot load flash file {}: {}", flash_path.display(), e))?;

    let manager =
        SlotManager::with_executor(&flash, &flash, &layout.update, ThreadExecutor::default())?;
    for slot in 0..manager.number_of_slots() {
        if let Some(image) = manager.image_at(slot) {
            println!(
                "slot {}: {} (version {:?})",
                slot,
                validator::validate(&image),
                validator::version(&image)
            );
        }
    }

    let selection = select_boot_image(&manager);
    flash
        .save_to_file(flash_path)
        .map_err(|e| anyhow!("Cannot write flash file {}: {}", flash_path.display(), e))?;

    match selection {
        Ok(selection) => {
            match selection.source {
                BootSource::Active => {
                    println!("Booting active image, version {}", selection.version)
                }
                BootSource::Installed { slot } => println!(
                    "Installed slot {} and booting version {}",
                    slot, selection.version
                ),
            }
            Ok(())
        }
        Err(err) => bail!("No bootable image: {} (code {})", err, u32::from(err)),
    }
}
