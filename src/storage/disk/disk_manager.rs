use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicU32, Ordering};

use parking_lot::Mutex;

use crate::common::{BlockId, Result, BLOCK_SIZE};

/// DiskManager reads and writes fixed-size blocks of a single disk image file.
/// Every call goes straight to the file; there is no write-behind.
pub struct DiskManager {
    /// The disk image
    disk_file: Mutex<File>,
    /// Path to the disk image
    disk_path: String,
    /// Number of block reads performed
    num_reads: AtomicU32,
    /// Number of block writes performed
    num_writes: AtomicU32,
}

impl DiskManager {
    /// Opens the disk image at the given path, creating it if it doesn't exist.
    pub fn new<P: AsRef<Path>>(disk_path: P) -> Result<Self> {
        let path_str = disk_path.as_ref().to_string_lossy().to_string();

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&disk_path)?;

        Ok(Self {
            disk_file: Mutex::new(file),
            disk_path: path_str,
            num_reads: AtomicU32::new(0),
            num_writes: AtomicU32::new(0),
        })
    }

    /// Reads a block into the provided buffer.
    /// Blocks past the end of the file read back as zeros.
    pub fn read_block(&self, block: BlockId, data: &mut [u8]) -> Result<()> {
        assert_eq!(data.len(), BLOCK_SIZE, "Buffer must be BLOCK_SIZE bytes");

        let offset = (block.as_u32() as u64) * (BLOCK_SIZE as u64);

        let mut file = self.disk_file.lock();
        file.seek(SeekFrom::Start(offset))?;

        let mut filled = 0;
        while filled < BLOCK_SIZE {
            let n = file.read(&mut data[filled..])?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        data[filled..].fill(0);

        self.num_reads.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Writes a block from the provided buffer.
    pub fn write_block(&self, block: BlockId, data: &[u8]) -> Result<()> {
        assert_eq!(data.len(), BLOCK_SIZE, "Buffer must be BLOCK_SIZE bytes");

        let offset = (block.as_u32() as u64) * (BLOCK_SIZE as u64);

        let mut file = self.disk_file.lock();
        file.seek(SeekFrom::Start(offset))?;
        file.write_all(data)?;
        file.flush()?;

        self.num_writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Returns the number of whole blocks currently in the file.
    pub fn file_blocks(&self) -> Result<u32> {
        let file = self.disk_file.lock();
        Ok((file.metadata()?.len() / BLOCK_SIZE as u64) as u32)
    }

    /// Returns the number of block reads performed.
    pub fn get_num_reads(&self) -> u32 {
        self.num_reads.load(Ordering::Relaxed)
    }

    /// Returns the number of block writes performed.
    pub fn get_num_writes(&self) -> u32 {
        self.num_writes.load(Ordering::Relaxed)
    }

    /// Returns the path to the disk image.
    pub fn get_disk_path(&self) -> &str {
        &self.disk_path
    }

    /// Flushes any buffered writes to disk.
    pub fn sync(&self) -> Result<()> {
        let file = self.disk_file.lock();
        file.sync_all()?;
        Ok(())
    }
}

impl Drop for DiskManager {
    fn drop(&mut self) {
        let file = self.disk_file.get_mut();
        let _ = file.sync_all();
    }
}
