// Licensed under the Apache-2.0 license

//! Layered integrity check of a stored firmware image.
//!
//! Checks run cheapest first and stop at the first failure, so a blank or
//! header-corrupt region costs a single header-sized read. Storage is only
//! ever read.

use crate::error::UcErrorCode;
use crate::image::FirmwareImage;
use constant_time_eq::constant_time_eq;
use flash_image::{FirmwareHeader, PayloadHasher, FIRMWARE_HEADER_SIZE};
use log::debug;
use zerocopy::FromBytes;

/// Payload bytes read per flash access while hashing or copying.
pub const CHUNK_SIZE: usize = 256;

/// Reads the header and checks marker and header-format version.
pub fn read_header(image: &FirmwareImage) -> Result<FirmwareHeader, UcErrorCode> {
    let mut buf = [0u8; FIRMWARE_HEADER_SIZE];
    image
        .region()
        .read(image.header_offset(), &mut buf)
        .map_err(|_| UcErrorCode::ReadFailed)?;
    let header = FirmwareHeader::read_from_bytes(&buf).map_err(|_| UcErrorCode::InvalidHeader)?;
    if !header.is_supported() {
        return Err(UcErrorCode::InvalidHeader);
    }
    Ok(header)
}

/// Runs every check and returns the validated header.
pub fn check_image(image: &FirmwareImage) -> Result<FirmwareHeader, UcErrorCode> {
    let header = read_header(image)?;
    if !header.verify_checksum() {
        return Err(UcErrorCode::InvalidChecksum);
    }
    let payload_size = header.payload_size();
    if payload_size == 0 {
        return Err(UcErrorCode::FirmwareEmpty);
    }

    let mut hasher = PayloadHasher::new();
    let mut chunk = [0u8; CHUNK_SIZE];
    let mut offset = 0;
    while offset < payload_size {
        let len = core::cmp::min(CHUNK_SIZE, payload_size - offset);
        image
            .region()
            .read(image.payload_offset() + offset, &mut chunk[..len])
            .map_err(|_| UcErrorCode::ReadFailed)?;
        hasher.update(&chunk[..len]);
        offset += len;
    }

    if !constant_time_eq(&hasher.finalize(), &header.payload_digest) {
        return Err(UcErrorCode::HashInvalid);
    }
    Ok(header)
}

pub fn validate(image: &FirmwareImage) -> UcErrorCode {
    match check_image(image) {
        Ok(_) => UcErrorCode::None,
        Err(err) => {
            debug!(
                "[validator] {} image at {:#x}: {}",
                image.region().name(),
                image.header_offset(),
                err
            );
            err
        }
    }
}

pub fn is_valid(image: &FirmwareImage) -> bool {
    validate(image).is_ok()
}

/// Firmware version of an image whose header parses; the payload is not
/// checked.
pub fn version(image: &FirmwareImage) -> Option<u64> {
    read_header(image).ok().map(|header| header.firmware_version())
}
