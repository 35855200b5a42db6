// Licensed under the Apache-2.0 license

//! Host-side packaging of firmware images and flash files.

pub mod flash_image;
pub mod layout;

pub use flash_image::{firmware_image_create, firmware_image_verify, FirmwareImage};
pub use layout::{flash_layout_build, flash_layout_create, load_layout, DeviceConfig, FlashLayout};
