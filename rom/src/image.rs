// Licensed under the Apache-2.0 license

use crate::flash::flash_partition::FlashPartition;
use flash_image::FIRMWARE_HEADER_SIZE;

/// A firmware image as stored in flash: a region plus the offsets of its
/// header and payload inside that region.
///
/// Holds no flash contents; every query reads the region again.
#[derive(Clone, Copy, Debug)]
pub struct FirmwareImage<'a> {
    region: FlashPartition<'a>,
    header_offset: usize,
    payload_offset: usize,
}

impl<'a> FirmwareImage<'a> {
    pub fn new(region: FlashPartition<'a>, header_offset: usize, payload_offset: usize) -> Self {
        Self {
            region,
            header_offset,
            payload_offset,
        }
    }

    /// Image whose payload immediately follows its header.
    pub fn at(region: FlashPartition<'a>, header_offset: usize) -> Self {
        Self::new(region, header_offset, header_offset + FIRMWARE_HEADER_SIZE)
    }

    pub fn region(&self) -> &FlashPartition<'a> {
        &self.region
    }

    pub fn header_offset(&self) -> usize {
        self.header_offset
    }

    pub fn payload_offset(&self) -> usize {
        self.payload_offset
    }
}
