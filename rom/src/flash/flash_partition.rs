// Licensed under the Apache-2.0 license

use crate::flash::hil::{FlashDrvError, FlashStorage};

/// Represents a partition within the flash memory.
///
/// A `FlashPartition` provides a view into a contiguous region of the underlying
/// flash, allowing for read, program, and erase operations within the
/// specified bounds. Each partition is associated with a name, a base offset,
/// and a length, and all operations are checked to ensure they do not exceed
/// the partition's boundaries.
///
/// The view is a plain value: copying it never copies flash contents, and
/// every read goes to the device.
///
/// # Fields
/// - `driver`: Reference to the flash storage controller driver.
/// - `name`: Name of the partition (for debugging or identification).
/// - `base_offset`: The starting offset of the partition within the flash.
/// - `length`: The size of the partition in bytes.
#[derive(Clone, Copy)]
pub struct FlashPartition<'a> {
    driver: &'a dyn FlashStorage,
    name: &'static str,
    base_offset: usize,
    length: usize,
}

impl<'a> FlashPartition<'a> {
    /// Creates a new `FlashPartition` instance.
    ///
    /// # Arguments
    ///
    /// * `driver` - Reference to the flash storage controller.
    /// * `name` - Static string slice representing the partition name.
    /// * `base_offset` - The starting offset of the partition within the flash.
    /// * `length` - The length of the partition in bytes.
    ///
    /// # Returns
    ///
    /// Returns `Ok(FlashPartition)` if the partition fits within the flash capacity,
    /// otherwise returns `Err(FlashDrvError::SIZE)` if the partition exceeds the flash size.
    pub fn new(
        driver: &'a dyn FlashStorage,
        name: &'static str,
        base_offset: usize,
        length: usize,
    ) -> Result<Self, FlashDrvError> {
        let capacity = driver.capacity();
        if base_offset > capacity || length > capacity - base_offset {
            return Err(FlashDrvError::SIZE);
        }
        Ok(FlashPartition {
            driver,
            name,
            base_offset,
            length,
        })
    }

    /// A view of `length` bytes starting at `offset` inside this partition.
    pub fn subpartition(
        &self,
        name: &'static str,
        offset: usize,
        length: usize,
    ) -> Result<FlashPartition<'a>, FlashDrvError> {
        self.check_range(offset, length)?;
        Ok(FlashPartition {
            driver: self.driver,
            name,
            base_offset: self.base_offset + offset,
            length,
        })
    }

    /// Reads data from the flash partition into the provided buffer, starting
    /// at the specified offset within the partition.
    ///
    /// Returns `Err(FlashDrvError::SIZE)` if the requested range exceeds the
    /// partition size, or propagates errors from the underlying flash controller.
    pub fn read(&self, partition_offset: usize, buf: &mut [u8]) -> Result<(), FlashDrvError> {
        self.check_range(partition_offset, buf.len())?;
        self.driver.read(buf, self.base_offset + partition_offset)
    }

    /// Programs data into the flash partition, starting at the specified
    /// offset within the partition.
    pub fn program(&self, partition_offset: usize, buf: &[u8]) -> Result<(), FlashDrvError> {
        self.check_range(partition_offset, buf.len())?;
        self.driver.program(buf, self.base_offset + partition_offset)
    }

    /// Erases a region of the flash partition, starting at the specified
    /// offset within the partition.
    pub fn erase(&self, partition_offset: usize, len: usize) -> Result<(), FlashDrvError> {
        self.check_range(partition_offset, len)?;
        self.driver.erase(self.base_offset + partition_offset, len)
    }

    fn check_range(&self, offset: usize, len: usize) -> Result<(), FlashDrvError> {
        match offset.checked_add(len) {
            Some(end) if end <= self.length => Ok(()),
            _ => Err(FlashDrvError::SIZE),
        }
    }

    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn base_offset(&self) -> usize {
        self.base_offset
    }

    pub fn erase_size(&self) -> usize {
        self.driver.erase_size()
    }

    pub fn driver(&self) -> &'a dyn FlashStorage {
        self.driver
    }
}

impl core::fmt::Debug for FlashPartition<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("FlashPartition")
            .field("name", &self.name)
            .field("base_offset", &self.base_offset)
            .field("length", &self.length)
            .finish()
    }
}
