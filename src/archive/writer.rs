use crate::archive::format::{CompressionMethod, EntryInfo, FileHeader, HEADER_SIZE};
use crate::error::{PackageError, Result};
use crate::path::normalize_path;
use std::collections::HashSet;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Seek, SeekFrom, Write};
use std::path::Path;

/// Writer for the container format read by [`ArchiveReader`](crate::ArchiveReader)
///
/// This writes plain named entries. It has no knowledge of package index
/// tables.
pub struct ArchiveWriter<W: Write + Seek = BufWriter<File>> {
    writer: W,
    entries: Vec<EntryInfo>,
    paths: HashSet<String>,
    current_offset: u64,
}

impl ArchiveWriter<BufWriter<File>> {
    /// Create a new archive file
    pub fn create<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Self::new(BufWriter::new(file))
    }
}

impl<W: Write + Seek> ArchiveWriter<W> {
    /// Start an archive on any seekable sink
    pub fn new(mut writer: W) -> Result<Self> {
        // Placeholder header, rewritten by finish()
        FileHeader::new().write_to(&mut writer)?;

        Ok(Self {
            writer,
            entries: Vec::new(),
            paths: HashSet::new(),
            current_offset: HEADER_SIZE as u64,
        })
    }

    /// Add an entry with automatic compression selection
    pub fn add_entry(&mut self, path: &str, data: &[u8]) -> Result<()> {
        let compression = CompressionMethod::choose_for_entry(path, data.len());
        self.add_entry_with_compression(path, data, compression)
    }

    /// Add an entry with a specific compression method
    pub fn add_entry_with_compression(
        &mut self,
        path: &str,
        data: &[u8],
        compression: CompressionMethod,
    ) -> Result<()> {
        let normalized_path = normalize_path(path);
        if !self.paths.insert(normalized_path.clone()) {
            return Err(PackageError::PathError(format!(
                "Duplicate entry: {}",
                normalized_path
            )));
        }

        let (stored, actual_compression) = Self::compress_data(data, compression)?;

        self.writer.write_all(&stored)?;

        self.entries.push(EntryInfo {
            path: normalized_path,
            data_offset: self.current_offset,
            uncompressed_size: data.len() as u64,
            stored_size: stored.len() as u64,
            crc32: crc32fast::hash(data),
            compression: actual_compression,
            flags: 0,
        });
        self.current_offset += stored.len() as u64;

        Ok(())
    }

    /// Number of entries added so far
    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    /// Write the central directory and final header, returning the sink
    pub fn finish(mut self) -> Result<W> {
        let cd_offset = self.current_offset;
        let mut cd_size = 0u64;

        for entry in &self.entries {
            entry.write_to(&mut self.writer)?;
            cd_size += entry.encoded_len() as u64;
        }

        let mut header = FileHeader::new();
        header.central_directory_offset = cd_offset;
        header.central_directory_size = cd_size;
        header.entry_count = self.entries.len() as u32;

        self.writer.seek(SeekFrom::Start(0))?;
        header.write_to(&mut self.writer)?;
        self.writer.seek(SeekFrom::End(0))?;
        self.writer.flush()?;

        Ok(self.writer)
    }

    /// Compress data with fallback to stored if not beneficial
    fn compress_data(
        data: &[u8],
        compression: CompressionMethod,
    ) -> Result<(Vec<u8>, CompressionMethod)> {
        let compressed = match compression {
            CompressionMethod::None => return Ok((data.to_vec(), CompressionMethod::None)),
            CompressionMethod::Lz4 => lz4_flex::compress_prepend_size(data),
            CompressionMethod::Zstd => zstd::bulk::compress(data, 6).map_err(|e| {
                PackageError::CompressionFailed(format!("Zstd compression failed: {}", e))
            })?,
        };

        if compressed.len() < data.len() {
            Ok((compressed, compression))
        } else {
            Ok((data.to_vec(), CompressionMethod::None))
        }
    }
}
