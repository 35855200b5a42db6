// Licensed under the Apache-2.0 license

use anyhow::{anyhow, bail, Result};
use flash_image::{
    payload_digest, FirmwareHeader, FIRMWARE_HEADER_MAGIC, FIRMWARE_HEADER_SIZE, HEADER_VERSION,
};
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, Write};
use zerocopy::{FromBytes, IntoBytes};

/// A payload sealed behind its firmware header.
pub struct FirmwareImage<'a> {
    header: FirmwareHeader,
    payload: &'a [u8],
}

impl<'a> FirmwareImage<'a> {
    pub fn new(version: u64, payload: &'a [u8]) -> Result<Self> {
        if u32::try_from(payload.len()).is_err() {
            bail!("Payload of {} bytes is too large for a firmware image", payload.len());
        }
        Ok(Self {
            header: FirmwareHeader::new(version, payload),
            payload,
        })
    }

    pub fn header(&self) -> &FirmwareHeader {
        &self.header
    }

    pub fn len(&self) -> usize {
        FIRMWARE_HEADER_SIZE + self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.len());
        bytes.extend_from_slice(self.header.as_bytes());
        bytes.extend_from_slice(self.payload);
        bytes
    }

    pub fn write_to_file(&self, offset: usize, filename: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(filename)
            .map_err(|e| anyhow!("Unable to open file {}: {}", filename, e))?;

        file.seek(std::io::SeekFrom::Start(offset as u64))
            .map_err(|e| {
                anyhow!(
                    "Unable to seek to offset {} in file {}: {}",
                    offset,
                    filename,
                    e
                )
            })?;
        file.write_all(self.header.as_bytes())?;
        file.write_all(self.payload)?;
        Ok(())
    }

    /// Runs the bootloader's checks, in the bootloader's order, over an
    /// image held in memory.
    pub fn verify(image: &[u8]) -> Result<FirmwareHeader> {
        if image.len() < FIRMWARE_HEADER_SIZE {
            bail!("Image too small to contain the header.");
        }
        let header = FirmwareHeader::read_from_bytes(&image[..FIRMWARE_HEADER_SIZE])
            .map_err(|_| anyhow!("Failed to parse header: invalid format or size"))?;
        if header.magic.get() != FIRMWARE_HEADER_MAGIC {
            bail!("Invalid header: incorrect magic number {:#010x}", header.magic.get());
        }
        if header.header_version.get() != HEADER_VERSION {
            bail!(
                "Unsupported header version {}",
                header.header_version.get()
            );
        }
        if !header.verify_checksum() {
            bail!(
                "Header checksum mismatch: stored {:#010x}, computed {:#010x}",
                header.header_checksum.get(),
                header.compute_checksum()
            );
        }
        let payload_size = header.payload_size();
        if payload_size == 0 {
            bail!("The image payload is empty.");
        }
        let payload = image
            .get(FIRMWARE_HEADER_SIZE..FIRMWARE_HEADER_SIZE + payload_size)
            .ok_or_else(|| {
                anyhow!(
                    "Image truncated: header declares {} payload bytes, file holds {}",
                    payload_size,
                    image.len() - FIRMWARE_HEADER_SIZE
                )
            })?;
        if payload_digest(payload) != header.payload_digest {
            bail!("Payload digest mismatch.");
        }
        Ok(header)
    }
}

pub(crate) fn load_file(filename: &str) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    let mut file =
        File::open(filename).map_err(|e| anyhow!("Cannot open file '{}': {}", filename, e))?;
    file.read_to_end(&mut buffer)
        .map_err(|e| anyhow!("Cannot read file '{}': {}", filename, e))?;
    Ok(buffer)
}

/// Seals the payload file into a firmware image file.
pub fn firmware_image_create(payload_path: &str, version: u64, output_path: &str) -> Result<()> {
    let payload = load_file(payload_path)?;
    let image = FirmwareImage::new(version, &payload)?;
    std::fs::write(output_path, image.to_bytes())
        .map_err(|e| anyhow!("Unable to write file {}: {}", output_path, e))?;
    println!(
        "Wrote firmware image version {} ({} bytes) to {}",
        version,
        image.len(),
        output_path
    );
    Ok(())
}

/// Checks an image file and returns its header.
pub fn firmware_image_verify(image_file_path: &str, offset: usize) -> Result<FirmwareHeader> {
    let data = load_file(image_file_path)?;
    let image = data
        .get(offset..)
        .ok_or_else(|| anyhow!("Offset {:#x} is past the end of {}", offset, image_file_path))?;
    let header = FirmwareImage::verify(image)
        .map_err(|e| anyhow!("{} is not a valid firmware image: {}", image_file_path, e))?;
    println!(
        "Image is valid: version {}, {} payload bytes",
        header.firmware_version(),
        header.payload_size()
    );
    Ok(header)
}
