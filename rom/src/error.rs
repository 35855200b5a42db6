// Licensed under the Apache-2.0 license

use core::fmt;

/// Outcome of every validation, scan and install operation.
///
/// Exactly one value is produced per attempt. `None` means the image is
/// valid (or the install succeeded); `Unknown` only appears when an error
/// path was left unmapped.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UcErrorCode {
    None = 0,
    InvalidHeader = 1,
    InvalidChecksum = 2,
    ReadFailed = 3,
    HashInvalid = 4,
    FirmwareEmpty = 5,
    ProgramFailed = 6,
    CannotInit = 7,
    CannotStartThread = 8,
    Unknown = 0xff,
}

impl UcErrorCode {
    pub fn is_ok(self) -> bool {
        self == UcErrorCode::None
    }

    /// `Ok(())` for `None`, the code itself otherwise.
    pub fn into_result(self) -> Result<(), UcErrorCode> {
        match self {
            UcErrorCode::None => Ok(()),
            err => Err(err),
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            UcErrorCode::None => "SUCCESS: Application is valid.",
            UcErrorCode::InvalidHeader => "ERROR: Invalid Header.",
            UcErrorCode::InvalidChecksum => "ERROR: Invalid checksum - Application is corrupted",
            UcErrorCode::ReadFailed => "ERROR: Read application failed.",
            UcErrorCode::HashInvalid => "ERROR: Invalid hash - Application is corrupted",
            UcErrorCode::FirmwareEmpty => "ERROR: The application is empty.",
            UcErrorCode::ProgramFailed => "ERROR: Program failed.",
            UcErrorCode::CannotInit => "ERROR: Cannot init.",
            UcErrorCode::CannotStartThread => "ERROR: Cannot start thread.",
            UcErrorCode::Unknown => "ERROR: Unknown error.",
        }
    }
}

impl From<UcErrorCode> for u32 {
    fn from(code: UcErrorCode) -> u32 {
        code as u32
    }
}

impl From<u32> for UcErrorCode {
    fn from(value: u32) -> Self {
        match value {
            0 => UcErrorCode::None,
            1 => UcErrorCode::InvalidHeader,
            2 => UcErrorCode::InvalidChecksum,
            3 => UcErrorCode::ReadFailed,
            4 => UcErrorCode::HashInvalid,
            5 => UcErrorCode::FirmwareEmpty,
            6 => UcErrorCode::ProgramFailed,
            7 => UcErrorCode::CannotInit,
            8 => UcErrorCode::CannotStartThread,
            _ => UcErrorCode::Unknown,
        }
    }
}

impl fmt::Display for UcErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
