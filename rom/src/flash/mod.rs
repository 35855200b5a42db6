// Licensed under the Apache-2.0 license

pub mod flash_partition;
pub mod hil;

#[cfg(any(test, feature = "std"))]
pub mod emulated_flash;

pub use flash_partition::FlashPartition;
pub use hil::{FlashDrvError, FlashStorage};
