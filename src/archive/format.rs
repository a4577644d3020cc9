use crate::error::{PackageError, Result};
use std::io::{Read, Write};

/// Magic number: 0x89 'W' 'P' 'K' 0x0D 0x0A 0x1A 0x0A
/// Follows PNG pattern for corruption detection
pub const MAGIC_NUMBER: [u8; 8] = [0x89, b'W', b'P', b'K', 0x0D, 0x0A, 0x1A, 0x0A];

/// Current container format version
pub const FORMAT_VERSION_MAJOR: u16 = 1;
pub const FORMAT_VERSION_MINOR: u16 = 0;

/// Header size in bytes
pub const HEADER_SIZE: usize = 64;

/// Maximum entry path length in bytes (UTF-8)
pub const MAX_PATH_LENGTH: usize = 1024;

/// Central directory entry signature "CENT"
const ENTRY_SIGNATURE: [u8; 4] = [0x43, 0x45, 0x4E, 0x54];

/// Size of the fixed part of a central directory entry (before the path bytes)
pub const ENTRY_FIXED_SIZE: usize = 4 + 8 + 8 + 8 + 4 + 1 + 1 + 2;

/// Compression methods supported
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CompressionMethod {
    None = 0,
    Lz4 = 1,
    Zstd = 2,
}

impl CompressionMethod {
    pub fn from_u8(value: u8) -> Result<Self> {
        match value {
            0 => Ok(Self::None),
            1 => Ok(Self::Lz4),
            2 => Ok(Self::Zstd),
            _ => Err(PackageError::InvalidCompression(value)),
        }
    }

    /// Choose compression for an entry based on its path and size
    pub fn choose_for_entry(path: &str, size: usize) -> Self {
        // Small entries are not worth the frame overhead
        if size < 4096 {
            return Self::None;
        }

        let extension = path.rsplit('.').next().unwrap_or("").to_lowercase();

        match extension.as_str() {
            // Already compressed media
            "png" | "jpg" | "jpeg" | "gif" | "webp" | "qoi" | "ogg" | "mp3" | "flac" | "mp4"
            | "webm" | "zip" | "gz" => Self::None,
            // Text and structured data
            "json" | "txt" | "xml" | "csv" | "glsl" | "vert" | "frag" | "wgsl" | "md" | "fnt" => {
                Self::Zstd
            }
            // Raw binary (audio, meshes, fonts): favour decode speed
            _ => Self::Lz4,
        }
    }
}

/// File header at the beginning of the archive
#[derive(Debug, Clone)]
pub struct FileHeader {
    pub version_major: u16,
    pub version_minor: u16,
    pub central_directory_offset: u64,
    pub central_directory_size: u64,
    pub entry_count: u32,
    pub flags: u32,
}

impl FileHeader {
    pub fn new() -> Self {
        Self {
            version_major: FORMAT_VERSION_MAJOR,
            version_minor: FORMAT_VERSION_MINOR,
            central_directory_offset: 0,
            central_directory_size: 0,
            entry_count: 0,
            flags: 0,
        }
    }

    /// Write header to a writer
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        writer.write_all(&MAGIC_NUMBER)?;
        writer.write_all(&self.version_major.to_le_bytes())?;
        writer.write_all(&self.version_minor.to_le_bytes())?;
        writer.write_all(&self.central_directory_offset.to_le_bytes())?;
        writer.write_all(&self.central_directory_size.to_le_bytes())?;
        writer.write_all(&self.entry_count.to_le_bytes())?;
        writer.write_all(&self.flags.to_le_bytes())?;

        // Reserved
        writer.write_all(&[0u8; 28])?;

        Ok(())
    }

    /// Read header from a reader
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut magic = [0u8; 8];
        reader.read_exact(&mut magic)?;

        if magic != MAGIC_NUMBER {
            return Err(PackageError::InvalidMagic);
        }

        let version_major = read_u16(&mut reader)?;
        let version_minor = read_u16(&mut reader)?;
        let central_directory_offset = read_u64(&mut reader)?;
        let central_directory_size = read_u64(&mut reader)?;
        let entry_count = read_u32(&mut reader)?;
        let flags = read_u32(&mut reader)?;

        let mut reserved = [0u8; 28];
        reader.read_exact(&mut reserved)?;

        Ok(Self {
            version_major,
            version_minor,
            central_directory_offset,
            central_directory_size,
            entry_count,
            flags,
        })
    }

    /// Validate version compatibility
    pub fn validate_version(&self) -> Result<()> {
        if self.version_major > FORMAT_VERSION_MAJOR {
            return Err(PackageError::UnsupportedVersion(
                self.version_major,
                self.version_minor,
            ));
        }
        Ok(())
    }
}

impl Default for FileHeader {
    fn default() -> Self {
        Self::new()
    }
}

/// Central directory entry metadata
#[derive(Debug, Clone)]
pub struct EntryInfo {
    pub path: String,
    pub data_offset: u64,
    pub uncompressed_size: u64,
    pub stored_size: u64,
    pub crc32: u32,
    pub compression: CompressionMethod,
    pub flags: u8,
}

impl EntryInfo {
    /// Number of bytes this entry takes in the central directory
    pub fn encoded_len(&self) -> usize {
        ENTRY_FIXED_SIZE + self.path.len()
    }

    /// Write entry to central directory
    pub fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
        let path_bytes = self.path.as_bytes();
        if path_bytes.len() > MAX_PATH_LENGTH {
            return Err(PackageError::PathError(format!(
                "Path too long: {} bytes (max {})",
                path_bytes.len(),
                MAX_PATH_LENGTH
            )));
        }

        writer.write_all(&ENTRY_SIGNATURE)?;
        writer.write_all(&self.data_offset.to_le_bytes())?;
        writer.write_all(&self.uncompressed_size.to_le_bytes())?;
        writer.write_all(&self.stored_size.to_le_bytes())?;
        writer.write_all(&self.crc32.to_le_bytes())?;
        writer.write_all(&[self.compression as u8])?;
        writer.write_all(&[self.flags])?;
        writer.write_all(&(path_bytes.len() as u16).to_le_bytes())?;
        writer.write_all(path_bytes)?;

        Ok(())
    }

    /// Read entry from central directory
    pub fn read_from<R: Read>(mut reader: R) -> Result<Self> {
        let mut sig = [0u8; 4];
        reader.read_exact(&mut sig)?;
        if sig != ENTRY_SIGNATURE {
            return Err(PackageError::InvalidFormat(
                "Invalid central directory entry signature".to_string(),
            ));
        }

        let data_offset = read_u64(&mut reader)?;
        let uncompressed_size = read_u64(&mut reader)?;
        let stored_size = read_u64(&mut reader)?;
        let crc32 = read_u32(&mut reader)?;

        let mut compression_byte = [0u8; 1];
        reader.read_exact(&mut compression_byte)?;
        let compression = CompressionMethod::from_u8(compression_byte[0])?;

        let mut flags = [0u8; 1];
        reader.read_exact(&mut flags)?;

        let path_len = read_u16(&mut reader)? as usize;
        if path_len > MAX_PATH_LENGTH {
            return Err(PackageError::PathError(format!(
                "Path too long: {} bytes (max {})",
                path_len, MAX_PATH_LENGTH
            )));
        }

        let mut path_buf = vec![0u8; path_len];
        reader.read_exact(&mut path_buf)?;
        let path = String::from_utf8(path_buf)
            .map_err(|e| PackageError::PathError(format!("Invalid UTF-8 in path: {}", e)))?;

        Ok(Self {
            path,
            data_offset,
            uncompressed_size,
            stored_size,
            crc32,
            compression,
            flags: flags[0],
        })
    }
}

// Helper functions for reading primitive types
fn read_u16<R: Read>(mut reader: R) -> Result<u16> {
    let mut buf = [0u8; 2];
    reader.read_exact(&mut buf)?;
    Ok(u16::from_le_bytes(buf))
}

fn read_u32<R: Read>(mut reader: R) -> Result<u32> {
    let mut buf = [0u8; 4];
    reader.read_exact(&mut buf)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64<R: Read>(mut reader: R) -> Result<u64> {
    let mut buf = [0u8; 8];
    reader.read_exact(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compression_method_from_u8() {
        assert_eq!(CompressionMethod::from_u8(0).unwrap(), CompressionMethod::None);
        assert_eq!(CompressionMethod::from_u8(1).unwrap(), CompressionMethod::Lz4);
        assert_eq!(CompressionMethod::from_u8(2).unwrap(), CompressionMethod::Zstd);
        assert!(matches!(
            CompressionMethod::from_u8(7),
            Err(PackageError::InvalidCompression(7))
        ));
    }

    #[test]
    fn test_compression_choice() {
        assert_eq!(CompressionMethod::choose_for_entry("shaders/lit.frag", 9000), CompressionMethod::Zstd);
        assert_eq!(CompressionMethod::choose_for_entry("meshes/rock.bin", 9000), CompressionMethod::Lz4);
        assert_eq!(CompressionMethod::choose_for_entry("textures/wall.png", 9000), CompressionMethod::None);
        // Small entries are stored
        assert_eq!(CompressionMethod::choose_for_entry("guid_table.txt", 100), CompressionMethod::None);
    }

    #[test]
    fn test_file_header_layout() {
        let header = FileHeader {
            version_major: 1,
            version_minor: 0,
            central_directory_offset: 4096,
            central_directory_size: 512,
            entry_count: 12,
            flags: 0,
        };

        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_SIZE);
        assert_eq!(&buf[..8], &MAGIC_NUMBER);

        let parsed = FileHeader::read_from(&buf[..]).unwrap();
        assert_eq!(parsed.central_directory_offset, 4096);
        assert_eq!(parsed.entry_count, 12);
    }

    #[test]
    fn test_header_rejects_bad_magic_and_version() {
        let mut buf = Vec::new();
        FileHeader::new().write_to(&mut buf).unwrap();

        let mut bad_magic = buf.clone();
        bad_magic[1] = b'X';
        assert!(matches!(
            FileHeader::read_from(&bad_magic[..]),
            Err(PackageError::InvalidMagic)
        ));

        let mut newer = FileHeader::new();
        newer.version_major = FORMAT_VERSION_MAJOR + 1;
        assert!(matches!(
            newer.validate_version(),
            Err(PackageError::UnsupportedVersion(_, _))
        ));
    }

    #[test]
    fn test_entry_encoded_len() {
        let entry = EntryInfo {
            path: "assets/foo/bar.png".to_string(),
            data_offset: 64,
            uncompressed_size: 5000,
            stored_size: 2000,
            crc32: 0xDEADBEEF,
            compression: CompressionMethod::Zstd,
            flags: 0,
        };

        let mut buf = Vec::new();
        entry.write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), entry.encoded_len());

        let parsed = EntryInfo::read_from(&buf[..]).unwrap();
        assert_eq!(parsed.path, entry.path);
        assert_eq!(parsed.stored_size, 2000);
        assert_eq!(parsed.compression, CompressionMethod::Zstd);
    }

    #[test]
    fn test_entry_rejects_long_path() {
        let entry = EntryInfo {
            path: "a".repeat(MAX_PATH_LENGTH + 1),
            data_offset: 0,
            uncompressed_size: 0,
            stored_size: 0,
            crc32: 0,
            compression: CompressionMethod::None,
            flags: 0,
        };
        let mut buf = Vec::new();
        assert!(matches!(entry.write_to(&mut buf), Err(PackageError::PathError(_))));
    }
}
