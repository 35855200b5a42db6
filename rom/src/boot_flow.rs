/*++

Licensed under the Apache-2.0 license.

File Name:

    boot_flow.rs

Abstract:

    Boot image selection: validate the active image, upgrade it from a
    newer candidate or recover it from any valid candidate, then launch.

--*/

use crate::error::UcErrorCode;
use crate::executor::CopyExecutor;
use crate::image::FirmwareImage;
use crate::slot_manager::{SlotManager, SlotSelection};
use crate::validator;
use log::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BootSource {
    /// The active image was already the one to boot.
    Active,
    /// The active image was replaced from this candidate slot.
    Installed { slot: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BootSelection {
    pub version: u64,
    pub source: BootSource,
}

/// Transfers control to the selected image. Never returns.
pub trait ImageLauncher {
    fn launch(&mut self, image: &FirmwareImage, selection: &BootSelection) -> !;
}

fn init_storage<E: CopyExecutor>(manager: &SlotManager<'_, E>) -> Result<(), UcErrorCode> {
    let mut drivers = [
        manager.active_region().driver(),
        manager.candidate_region().driver(),
    ]
    .into_iter();
    if manager.shares_device() {
        drivers.next_back();
    }
    for driver in drivers {
        driver.init().map_err(|err| {
            error!("[boot] storage init failed: {:?}", err);
            UcErrorCode::CannotInit
        })?;
    }
    Ok(())
}

fn install<E: CopyExecutor>(
    manager: &SlotManager<'_, E>,
    candidate: SlotSelection,
) -> Result<BootSelection, UcErrorCode> {
    info!(
        "[boot] installing slot {} (version {})",
        candidate.index, candidate.version
    );
    manager
        .install(candidate.index, manager.active_header_offset())
        .into_result()?;
    Ok(BootSelection {
        version: candidate.version,
        source: BootSource::Installed {
            slot: candidate.index,
        },
    })
}

/// Decides which image the active region holds when control is handed over,
/// installing a candidate first when needed.
///
/// Returns the error to report when nothing can be booted. Halting or
/// retrying is up to the caller.
pub fn select_boot_image<E: CopyExecutor>(
    manager: &SlotManager<'_, E>,
) -> Result<BootSelection, UcErrorCode> {
    init_storage(manager)?;

    let active = manager.active_image();
    match validator::check_image(&active) {
        Ok(header) => {
            info!("[boot] {}", UcErrorCode::None);
            let current = BootSelection {
                version: header.firmware_version(),
                source: BootSource::Active,
            };
            let Some(candidate) = manager.find_newer_valid_candidate(&active) else {
                info!("[boot] version {} is up to date", current.version);
                return Ok(current);
            };
            install(manager, candidate).or_else(|err| {
                if validator::is_valid(&active) {
                    warn!(
                        "[boot] upgrade failed ({}), keeping version {}",
                        err, current.version
                    );
                    Ok(current)
                } else {
                    Err(err)
                }
            })
        }
        Err(status) => {
            warn!("[boot] {}", status);
            match manager.find_any_valid_candidate() {
                Some(candidate) => install(manager, candidate),
                None => {
                    error!("[boot] no valid candidate to recover from");
                    Err(status)
                }
            }
        }
    }
}

/// Selects an image and launches it. Only returns when there is nothing to
/// boot.
pub fn boot<E: CopyExecutor, L: ImageLauncher>(
    manager: &SlotManager<'_, E>,
    launcher: &mut L,
) -> UcErrorCode {
    match select_boot_image(manager) {
        Ok(selection) => {
            info!("[boot] launching version {}", selection.version);
            launcher.launch(&manager.active_image(), &selection)
        }
        Err(err) => {
            error!("[boot] no bootable image: {}", err);
            err
        }
    }
}
