// Licensed under the Apache-2.0 license

//! Generic interface for flash storage access.

use core::result::Result;

/// Byte-granular access to a flash device. Addresses are relative to the
/// device base, never absolute bus addresses. Drivers for the flash storage
/// implement this trait.
///
/// Drivers are shared with the install worker, so they must be `Sync`.
pub trait FlashStorage: Sync {
    /// Bring the device up. Called once before any other access.
    fn init(&self) -> Result<(), FlashDrvError> {
        Ok(())
    }

    /// Read from the flash storage, filling the provided buffer with data
    fn read(&self, buffer: &mut [u8], address: usize) -> Result<(), FlashDrvError>;

    /// Program the full contents of the buffer, starting at the specified
    /// address. The target range must have been erased.
    fn program(&self, buffer: &[u8], address: usize) -> Result<(), FlashDrvError>;

    /// Erase `length` bytes starting at address `address`. Both must be
    /// multiples of [`FlashStorage::erase_size`].
    fn erase(&self, address: usize, length: usize) -> Result<(), FlashDrvError>;

    /// Returns the size of the flash storage in bytes.
    fn capacity(&self) -> usize;

    /// Returns the erase unit in bytes.
    fn erase_size(&self) -> usize;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(usize)]
pub enum FlashDrvError {
    // Reserved value, for when "no error" / "success" should be
    // encoded in the same numeric representation as FlashDrvError
    //
    // Ok(()) = 0,
    /// Generic failure condition
    FAIL = 1,
    /// An invalid parameter was passed
    INVAL = 6,
    /// Parameter passed was too large
    SIZE = 7,
    /// Device is not available
    NODEVICE = 11,
}
