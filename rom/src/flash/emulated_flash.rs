// Licensed under the Apache-2.0 license

//! RAM-backed NOR flash model for host builds and tests.

use crate::flash::hil::{FlashDrvError, FlashStorage};
use std::fs;
use std::io;
use std::ops::Range;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::vec::Vec;

pub const ERASED_BYTE: u8 = 0xff;

/// Faults injected into the next accesses.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FaultPlan {
    pub fail_init: bool,
    /// Reads touching any byte of this range fail.
    pub fail_reads: Option<Range<usize>>,
    pub fail_erase: bool,
    pub fail_program: bool,
    /// Programs report success but leave flash untouched.
    pub drop_programs: bool,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FlashStats {
    pub inits: usize,
    pub reads: Vec<Range<usize>>,
    pub programs: usize,
    pub erases: Vec<Range<usize>>,
}

pub struct EmulatedFlash {
    data: Mutex<Vec<u8>>,
    erase_size: usize,
    faults: Mutex<FaultPlan>,
    stats: Mutex<FlashStats>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn overlaps(a: &Range<usize>, b: &Range<usize>) -> bool {
    a.start < b.end && b.start < a.end
}

impl EmulatedFlash {
    /// A fully erased device.
    pub fn new(capacity: usize, erase_size: usize) -> Self {
        Self::from_bytes(vec![ERASED_BYTE; capacity], erase_size)
    }

    pub fn from_bytes(data: Vec<u8>, erase_size: usize) -> Self {
        EmulatedFlash {
            data: Mutex::new(data),
            erase_size,
            faults: Mutex::new(FaultPlan::default()),
            stats: Mutex::new(FlashStats::default()),
        }
    }

    /// Loads a flash dump; a short file is padded with erased bytes up to `capacity`.
    pub fn from_file(path: &Path, capacity: usize, erase_size: usize) -> io::Result<Self> {
        let mut data = fs::read(path)?;
        if data.len() > capacity {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "flash file {} is larger than the device ({} > {})",
                    path.display(),
                    data.len(),
                    capacity
                ),
            ));
        }
        data.resize(capacity, ERASED_BYTE);
        Ok(Self::from_bytes(data, erase_size))
    }

    pub fn save_to_file(&self, path: &Path) -> io::Result<()> {
        fs::write(path, lock(&self.data).as_slice())
    }

    /// Writes raw bytes without flash semantics, faults or statistics.
    pub fn load(&self, offset: usize, bytes: &[u8]) {
        lock(&self.data)[offset..offset + bytes.len()].copy_from_slice(bytes);
    }

    /// Flips bits at `offset` without flash semantics.
    pub fn corrupt(&self, offset: usize, mask: u8) {
        lock(&self.data)[offset] ^= mask;
    }

    pub fn contents(&self, range: Range<usize>) -> Vec<u8> {
        lock(&self.data)[range].to_vec()
    }

    pub fn set_faults(&self, plan: FaultPlan) {
        *lock(&self.faults) = plan;
    }

    pub fn clear_faults(&self) {
        self.set_faults(FaultPlan::default());
    }

    pub fn stats(&self) -> FlashStats {
        lock(&self.stats).clone()
    }

    pub fn reset_stats(&self) {
        *lock(&self.stats) = FlashStats::default();
    }

    /// Number of reads that touched `range`.
    pub fn reads_in(&self, range: Range<usize>) -> usize {
        lock(&self.stats)
            .reads
            .iter()
            .filter(|read| overlaps(read, &range))
            .count()
    }

    fn check_bounds(&self, address: usize, length: usize) -> Result<Range<usize>, FlashDrvError> {
        match address.checked_add(length) {
            Some(end) if end <= self.capacity() => Ok(address..end),
            _ => Err(FlashDrvError::SIZE),
        }
    }
}

impl FlashStorage for EmulatedFlash {
    fn init(&self) -> Result<(), FlashDrvError> {
        lock(&self.stats).inits += 1;
        if lock(&self.faults).fail_init {
            return Err(FlashDrvError::NODEVICE);
        }
        Ok(())
    }

    fn read(&self, buffer: &mut [u8], address: usize) -> Result<(), FlashDrvError> {
        let range = self.check_bounds(address, buffer.len())?;
        lock(&self.stats).reads.push(range.clone());
        if let Some(bad) = lock(&self.faults).fail_reads.as_ref() {
            if overlaps(bad, &range) {
                return Err(FlashDrvError::FAIL);
            }
        }
        buffer.copy_from_slice(&lock(&self.data)[range]);
        Ok(())
    }

    fn program(&self, buffer: &[u8], address: usize) -> Result<(), FlashDrvError> {
        let range = self.check_bounds(address, buffer.len())?;
        lock(&self.stats).programs += 1;
        let faults = lock(&self.faults).clone();
        if faults.fail_program {
            return Err(FlashDrvError::FAIL);
        }
        if faults.drop_programs {
            return Ok(());
        }
        // NOR programming can only clear bits.
        for (cell, byte) in lock(&self.data)[range].iter_mut().zip(buffer) {
            *cell &= *byte;
        }
        Ok(())
    }

    fn erase(&self, address: usize, length: usize) -> Result<(), FlashDrvError> {
        if address % self.erase_size != 0 || length % self.erase_size != 0 {
            return Err(FlashDrvError::INVAL);
        }
        let range = self.check_bounds(address, length)?;
        lock(&self.stats).erases.push(range.clone());
        if lock(&self.faults).fail_erase {
            return Err(FlashDrvError::FAIL);
        }
        lock(&self.data)[range].fill(ERASED_BYTE);
        Ok(())
    }

    fn capacity(&self) -> usize {
        lock(&self.data).len()
    }

    fn erase_size(&self) -> usize {
        self.erase_size
    }
}
