/*++

Licensed under the Apache-2.0 license.

File Name:

    lib.rs

Abstract:

    Firmware image validation and candidate slot management for the
    bootloader.

--*/

#![cfg_attr(not(any(test, feature = "std")), no_std)]

pub mod boot_flow;
pub use boot_flow::{BootSelection, BootSource, ImageLauncher};
mod error;
pub use error::UcErrorCode;
pub mod executor;
pub use executor::{CopyExecutor, InlineExecutor};
#[cfg(any(test, feature = "std"))]
pub use executor::ThreadExecutor;
pub mod flash;
pub use flash::*;
pub mod image;
pub use image::FirmwareImage;
pub mod slot_manager;
pub use slot_manager::{SlotManager, SlotSelection};
pub mod validator;
