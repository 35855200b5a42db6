// Licensed under the Apache-2.0 license
#![no_std]

//! Firmware header wire format shared by the bootloader and the host tools
//! that package firmware images.

use core::mem::offset_of;

use sha2::{Digest, Sha256};
use zerocopy::byteorder::{BigEndian, LittleEndian, U16, U32, U64};
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout, Unaligned};

pub const FIRMWARE_HEADER_MAGIC: u32 = u32::from_be_bytes(*b"UCFW");
pub const HEADER_VERSION: u16 = 0x0001;
pub const FIRMWARE_HEADER_SIZE: usize = 128;
pub const DIGEST_SIZE: usize = 32;

const RESERVED_SIZE: usize = 72;

/// Fixed-size metadata block preceding every firmware payload.
#[repr(C)]
#[derive(Debug, Clone, FromBytes, IntoBytes, Immutable, KnownLayout, Unaligned)]
pub struct FirmwareHeader {
    pub magic: U32<BigEndian>,
    pub header_version: U16<LittleEndian>,
    pub flags: U16<LittleEndian>,
    pub firmware_version: U64<LittleEndian>,
    pub payload_size: U32<LittleEndian>,
    pub payload_digest: [u8; DIGEST_SIZE],
    pub reserved: [u8; RESERVED_SIZE],
    pub header_checksum: U32<LittleEndian>,
}

const _: () = assert!(core::mem::size_of::<FirmwareHeader>() == FIRMWARE_HEADER_SIZE);

impl FirmwareHeader {
    /// Builds a sealed header for `payload`: digest and checksum are filled in.
    pub fn new(firmware_version: u64, payload: &[u8]) -> Self {
        let mut header = Self::new_zeroed();
        header.magic = FIRMWARE_HEADER_MAGIC.into();
        header.header_version = HEADER_VERSION.into();
        header.firmware_version = firmware_version.into();
        header.payload_size = (payload.len() as u32).into();
        header.payload_digest = payload_digest(payload);
        header.seal();
        header
    }

    /// Recomputes and stores the header checksum.
    pub fn seal(&mut self) {
        self.header_checksum = self.compute_checksum().into();
    }

    /// Marker and header-format version match what this bootloader parses.
    pub fn is_supported(&self) -> bool {
        self.magic.get() == FIRMWARE_HEADER_MAGIC && self.header_version.get() == HEADER_VERSION
    }

    /// CRC-32 over every header byte preceding the checksum field.
    pub fn compute_checksum(&self) -> u32 {
        calculate_checksum(&self.as_bytes()[..offset_of!(FirmwareHeader, header_checksum)])
    }

    pub fn verify_checksum(&self) -> bool {
        self.compute_checksum() == self.header_checksum.get()
    }

    pub fn firmware_version(&self) -> u64 {
        self.firmware_version.get()
    }

    pub fn payload_size(&self) -> usize {
        self.payload_size.get() as usize
    }
}

pub fn calculate_checksum(data: &[u8]) -> u32 {
    let mut hasher = crc32fast::Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Incremental SHA-256 over a payload read in chunks.
#[derive(Default, Clone)]
pub struct PayloadHasher(Sha256);

impl PayloadHasher {
    pub fn new() -> Self {
        Self(Sha256::new())
    }

    pub fn update(&mut self, chunk: &[u8]) {
        self.0.update(chunk);
    }

    pub fn finalize(self) -> [u8; DIGEST_SIZE] {
        self.0.finalize().into()
    }
}

pub fn payload_digest(payload: &[u8]) -> [u8; DIGEST_SIZE] {
    let mut hasher = PayloadHasher::new();
    hasher.update(payload);
    hasher.finalize()
}
