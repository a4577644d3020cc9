use crate::archive::format::{CompressionMethod, EntryInfo, FileHeader, ENTRY_FIXED_SIZE};
use crate::archive::{EntryStream, ReadArchive};
use crate::error::{PackageError, Result};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::Path;
use tracing::trace;

const MAX_LZ4_RATIO: u64 = 256;

/// Archive reader with O(1) entry lookup
///
/// The source is shared behind a mutex, so a reader can serve entries to
/// several threads. Each entry read seeks, decodes and verifies the entry
/// into memory, then hands out an independent stream over the result.
pub struct ArchiveReader<R = BufReader<File>> {
    source: Mutex<R>,
    header: FileHeader,
    entries: HashMap<String, EntryInfo>,
    entry_list: Vec<String>,
    verify_crc: bool,
}

impl ArchiveReader<BufReader<File>> {
    /// Open an archive file for reading
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::from_reader(BufReader::new(file))
    }
}

impl<R: Read + Seek> ArchiveReader<R> {
    /// Read the header and central directory from any seekable source
    pub fn from_reader(mut source: R) -> Result<Self> {
        let total_len = source.seek(SeekFrom::End(0))?;
        source.seek(SeekFrom::Start(0))?;

        let header = FileHeader::read_from(&mut source)?;
        header.validate_version()?;

        let cd_end = header
            .central_directory_offset
            .checked_add(header.central_directory_size)
            .ok_or_else(|| PackageError::InvalidFormat("Central directory overflows".to_string()))?;
        if cd_end > total_len {
            return Err(PackageError::InvalidFormat(format!(
                "Central directory ends at {} but archive is {} bytes",
                cd_end, total_len
            )));
        }
        if header.entry_count as u64 * ENTRY_FIXED_SIZE as u64 > header.central_directory_size {
            return Err(PackageError::InvalidFormat(format!(
                "{} entries do not fit in a {} byte central directory",
                header.entry_count, header.central_directory_size
            )));
        }

        source.seek(SeekFrom::Start(header.central_directory_offset))?;

        let mut entries = HashMap::with_capacity(header.entry_count as usize);
        let mut entry_list = Vec::with_capacity(header.entry_count as usize);

        for _ in 0..header.entry_count {
            let entry = EntryInfo::read_from(&mut source)?;
            let data_end = entry.data_offset.checked_add(entry.stored_size);
            if data_end.map_or(true, |end| end > header.central_directory_offset) {
                return Err(PackageError::InvalidFormat(format!(
                    "Entry {} points outside the data region",
                    entry.path
                )));
            }
            entry_list.push(entry.path.clone());
            entries.insert(entry.path.clone(), entry);
        }

        Ok(Self {
            source: Mutex::new(source),
            header,
            entries,
            entry_list,
            verify_crc: true,
        })
    }

    /// Enable or disable CRC verification of entry contents (on by default)
    pub fn with_crc_verification(mut self, verify: bool) -> Self {
        self.verify_crc = verify;
        self
    }

    /// Get archive header information
    pub fn header(&self) -> &FileHeader {
        &self.header
    }

    /// Get number of entries in archive
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// List all entry paths in the archive, in stored order
    pub fn list_entries(&self) -> &[String] {
        &self.entry_list
    }

    /// Check if an entry exists in the archive
    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    /// Get entry information without reading data
    pub fn get_entry(&self, path: &str) -> Option<&EntryInfo> {
        self.entries.get(path)
    }

    /// Read and decode an entry
    pub fn read_entry(&self, path: &str) -> Result<Vec<u8>> {
        let entry = self
            .entries
            .get(path)
            .ok_or_else(|| PackageError::NotFound(format!("archive entry {}", path)))?;

        // LZ4 cannot expand data by more than this; anything larger is a
        // corrupt or hostile directory entry
        if entry.compression == CompressionMethod::Lz4
            && entry.uncompressed_size > entry.stored_size.saturating_mul(MAX_LZ4_RATIO)
        {
            return Err(PackageError::DecompressionFailed(format!(
                "{}: declared size {} is implausible for {} stored bytes",
                path, entry.uncompressed_size, entry.stored_size
            )));
        }

        let stored = {
            let mut source = self.source.lock();
            source.seek(SeekFrom::Start(entry.data_offset))?;
            let mut data = vec![0u8; entry.stored_size as usize];
            source.read_exact(&mut data)?;
            data
        };

        let decoded = match entry.compression {
            CompressionMethod::None => stored,
            CompressionMethod::Lz4 => Self::decompress_lz4(&stored, entry)?,
            CompressionMethod::Zstd => Self::decompress_zstd(&stored, entry)?,
        };

        if decoded.len() as u64 != entry.uncompressed_size {
            return Err(PackageError::DecompressionFailed(format!(
                "{}: expected {} bytes, got {}",
                path,
                entry.uncompressed_size,
                decoded.len()
            )));
        }

        if self.verify_crc {
            let computed_crc = crc32fast::hash(&decoded);
            if computed_crc != entry.crc32 {
                return Err(PackageError::CrcMismatch {
                    path: path.to_string(),
                    expected: entry.crc32,
                    actual: computed_crc,
                });
            }
        }

        Ok(decoded)
    }

    /// Decompress LZ4 data
    fn decompress_lz4(data: &[u8], entry: &EntryInfo) -> Result<Vec<u8>> {
        // The writer prepends the size; refuse sizes that disagree with the directory
        // before lz4_flex allocates for them
        let prefix: [u8; 4] = data
            .get(..4)
            .and_then(|bytes| bytes.try_into().ok())
            .ok_or_else(|| {
                PackageError::DecompressionFailed(format!("{}: truncated LZ4 block", entry.path))
            })?;
        if u32::from_le_bytes(prefix) as u64 != entry.uncompressed_size {
            return Err(PackageError::DecompressionFailed(format!(
                "{}: LZ4 size prefix does not match directory",
                entry.path
            )));
        }

        lz4_flex::decompress_size_prepended(data).map_err(|e| {
            PackageError::DecompressionFailed(format!("LZ4 decompression failed: {}", e))
        })
    }

    /// Decompress Zstd data
    ///
    /// Output grows with the stream instead of trusting the declared size,
    /// and stops one byte past it so oversized frames are caught by the
    /// length check.
    fn decompress_zstd(data: &[u8], entry: &EntryInfo) -> Result<Vec<u8>> {
        let failed =
            |e: std::io::Error| PackageError::DecompressionFailed(format!("Zstd decompression failed: {}", e));

        let decoder = zstd::stream::read::Decoder::new(data).map_err(failed)?;
        let mut decoded = Vec::new();
        decoder
            .take(entry.uncompressed_size.saturating_add(1))
            .read_to_end(&mut decoded)
            .map_err(failed)?;
        Ok(decoded)
    }
}

impl<R: Read + Seek + Send> ReadArchive for ArchiveReader<R> {
    fn has_entry(&self, key: &str) -> bool {
        self.contains(key)
    }

    fn open_entry(&self, key: &str) -> Result<Option<EntryStream>> {
        if !self.contains(key) {
            return Ok(None);
        }
        trace!(entry = key, "opening archive entry");
        let data = self.read_entry(key)?;
        Ok(Some(Box::new(Cursor::new(data))))
    }

    fn entries(&self) -> Vec<String> {
        self.entry_list.clone()
    }
}
