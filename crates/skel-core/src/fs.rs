//! File loading helpers.

use std::path::Path;

use crate::error::{Error, Result};

/// SPIR-V magic number in host word order.
pub const SPIRV_MAGIC: u32 = 0x0723_0203;

/// Read a whole file into memory.
pub fn read_file(path: impl AsRef<Path>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    match std::fs::read(path) {
        Ok(bytes) => Ok(bytes),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(Error::NotFound(path.display().to_string()))
        }
        Err(e) => Err(Error::Io(e)),
    }
}

/// Read a SPIR-V binary from disk.
pub fn read_spirv(path: impl AsRef<Path>) -> Result<Vec<u32>> {
    parse_spirv(&read_file(path)?)
}

/// Decode SPIR-V words from raw bytes.
///
/// The module may be stored in either endianness; the magic number decides.
pub fn parse_spirv(bytes: &[u8]) -> Result<Vec<u32>> {
    if bytes.len() % 4 != 0 {
        return Err(Error::InvalidData(format!(
            "SPIR-V length {} is not a multiple of 4",
            bytes.len()
        )));
    }

    let mut words: Vec<u32> = bytes
        .chunks_exact(4)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect();

    match words.first() {
        Some(&SPIRV_MAGIC) => Ok(words),
        Some(&magic) if magic.swap_bytes() == SPIRV_MAGIC => {
            for word in &mut words {
                *word = word.swap_bytes();
            }
            Ok(words)
        }
        Some(&magic) => Err(Error::InvalidData(format!(
            "bad SPIR-V magic number {magic:#010x}"
        ))),
        None => Err(Error::InvalidData("empty SPIR-V module".to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module_bytes(words: &[u32], big_endian: bool) -> Vec<u8> {
        words
            .iter()
            .flat_map(|w| {
                if big_endian {
                    w.to_be_bytes()
                } else {
                    w.to_le_bytes()
                }
            })
            .collect()
    }

    #[test]
    fn parses_little_endian() {
        let bytes = module_bytes(&[SPIRV_MAGIC, 0x0001_0500, 7], false);
        assert_eq!(parse_spirv(&bytes).unwrap(), vec![SPIRV_MAGIC, 0x0001_0500, 7]);
    }

    #[test]
    fn swaps_big_endian() {
        let bytes = module_bytes(&[SPIRV_MAGIC, 42], true);
        assert_eq!(parse_spirv(&bytes).unwrap(), vec![SPIRV_MAGIC, 42]);
    }

    #[test]
    fn rejects_misaligned_and_garbage() {
        assert!(matches!(parse_spirv(&[1, 2, 3]), Err(Error::InvalidData(_))));
        assert!(matches!(parse_spirv(&[]), Err(Error::InvalidData(_))));
        let bytes = module_bytes(&[0xDEAD_BEEF], false);
        assert!(matches!(parse_spirv(&bytes), Err(Error::InvalidData(_))));
    }

    #[test]
    fn missing_file_is_not_found() {
        let err = read_file("definitely/not/a/real/file.spv").unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }

    #[test]
    fn reads_file_contents() {
        let path = std::env::temp_dir().join(format!("skel-core-fs-{}.bin", std::process::id()));
        std::fs::write(&path, module_bytes(&[SPIRV_MAGIC], false)).unwrap();
        assert_eq!(read_spirv(&path).unwrap(), vec![SPIRV_MAGIC]);
        std::fs::remove_file(&path).unwrap();
    }
}
