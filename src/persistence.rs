//! Framed binary blobs for trained models and category indexes.
//!
//! A blob is laid out as (all integers little-endian):
//!
//! ```text
//! magic "FQCT" | kind u8 | version u16 | payload length u64 | payload | crc32 u32
//! ```
//!
//! Payloads are `bincode` encodings of serde types. A classifier is written as
//! two independent blobs (its model state and its category index) so either
//! can be replaced on its own.

use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::Path;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::{FaqcatError, Result};

/// Leading bytes of every blob.
pub const MAGIC: &[u8; 4] = b"FQCT";

/// Current payload format version.
pub const FORMAT_VERSION: u16 = 1;

const HEADER_LEN: usize = 4 + 1 + 2 + 8;
const CHECKSUM_LEN: usize = 4;

/// What a blob contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum BlobKind {
    Model = 1,
    CategoryIndex = 2,
    /// Model weights plus the token weighting and corpus statistics.
    Classifier = 3,
}

impl BlobKind {
    fn from_u8(value: u8) -> Result<Self> {
        match value {
            1 => Ok(BlobKind::Model),
            2 => Ok(BlobKind::CategoryIndex),
            3 => Ok(BlobKind::Classifier),
            other => Err(FaqcatError::serialization(format!(
                "Unknown blob kind: {other}"
            ))),
        }
    }
}

/// Wrap `payload` in a blob header and checksum.
pub fn encode_blob(kind: BlobKind, payload: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(HEADER_LEN + payload.len() + CHECKSUM_LEN);
    out.write_all(MAGIC)?;
    out.write_u8(kind as u8)?;
    out.write_u16::<LittleEndian>(FORMAT_VERSION)?;
    out.write_u64::<LittleEndian>(payload.len() as u64)?;
    out.write_all(payload)?;
    out.write_u32::<LittleEndian>(crc32fast::hash(payload))?;
    Ok(out)
}

/// Validate a blob of the expected kind and return its payload.
pub fn decode_blob(expected: BlobKind, bytes: &[u8]) -> Result<Vec<u8>> {
    if bytes.len() < HEADER_LEN + CHECKSUM_LEN {
        return Err(FaqcatError::serialization(format!(
            "Blob too short: {} bytes",
            bytes.len()
        )));
    }

    let mut reader = Cursor::new(bytes);

    let mut magic = [0u8; 4];
    reader.read_exact(&mut magic)?;
    if &magic != MAGIC {
        return Err(FaqcatError::serialization("Invalid blob magic"));
    }

    let kind = BlobKind::from_u8(reader.read_u8()?)?;
    if kind != expected {
        return Err(FaqcatError::serialization(format!(
            "Expected {expected:?} blob, found {kind:?}"
        )));
    }

    let version = reader.read_u16::<LittleEndian>()?;
    if version != FORMAT_VERSION {
        return Err(FaqcatError::serialization(format!(
            "Unsupported blob version: {version}"
        )));
    }

    let len = reader.read_u64::<LittleEndian>()? as usize;
    let expected_total = HEADER_LEN
        .checked_add(len)
        .and_then(|n| n.checked_add(CHECKSUM_LEN));
    if expected_total != Some(bytes.len()) {
        return Err(FaqcatError::serialization(format!(
            "Blob length mismatch: header says {len} payload bytes, blob has {}",
            bytes.len()
        )));
    }

    let mut payload = vec![0u8; len];
    reader.read_exact(&mut payload)?;

    let stored = reader.read_u32::<LittleEndian>()?;
    let actual = crc32fast::hash(&payload);
    if stored != actual {
        return Err(FaqcatError::serialization(format!(
            "Checksum mismatch: stored {stored:#010x}, computed {actual:#010x}"
        )));
    }

    Ok(payload)
}

/// Encode a serde value with bincode and frame it.
pub fn encode_serde<T: Serialize>(kind: BlobKind, value: &T) -> Result<Vec<u8>> {
    let payload = bincode::serde::encode_to_vec(value, bincode::config::standard())
        .map_err(|e| FaqcatError::serialization(format!("Failed to encode {kind:?}: {e}")))?;
    encode_blob(kind, &payload)
}

/// Unframe a blob and decode its bincode payload.
pub fn decode_serde<T: DeserializeOwned>(kind: BlobKind, bytes: &[u8]) -> Result<T> {
    let payload = decode_blob(kind, bytes)?;
    let (value, read): (T, usize) =
        bincode::serde::decode_from_slice(&payload, bincode::config::standard())
            .map_err(|e| FaqcatError::serialization(format!("Failed to decode {kind:?}: {e}")))?;
    if read != payload.len() {
        return Err(FaqcatError::serialization(format!(
            "Trailing bytes in {kind:?} payload"
        )));
    }
    Ok(value)
}

/// Write a blob to `path`, creating parent directories as needed.
pub fn write_file<P: AsRef<Path>>(path: P, bytes: &[u8]) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, bytes)?;
    Ok(())
}

pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>> {
    Ok(fs::read(path.as_ref())?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blob_round_trip() {
        let blob = encode_blob(BlobKind::Model, b"weights").unwrap();
        assert_eq!(&blob[..4], MAGIC);
        assert_eq!(blob[4], 1);
        assert_eq!(blob.len(), HEADER_LEN + 7 + CHECKSUM_LEN);

        let payload = decode_blob(BlobKind::Model, &blob).unwrap();
        assert_eq!(payload, b"weights");
    }

    #[test]
    fn test_wrong_kind_rejected() {
        let blob = encode_blob(BlobKind::CategoryIndex, b"ids").unwrap();
        assert!(matches!(
            decode_blob(BlobKind::Model, &blob),
            Err(FaqcatError::Serialization(_))
        ));
    }

    #[test]
    fn test_corruption_detected() {
        let mut blob = encode_blob(BlobKind::Model, b"weights").unwrap();
        blob[HEADER_LEN + 2] ^= 0xff;
        let err = decode_blob(BlobKind::Model, &blob).unwrap_err();
        assert!(err.to_string().contains("Checksum mismatch"));

        let blob = encode_blob(BlobKind::Model, b"weights").unwrap();
        assert!(decode_blob(BlobKind::Model, &blob[..blob.len() - 1]).is_err());
        assert!(decode_blob(BlobKind::Model, b"FQ").is_err());
    }

    #[test]
    fn test_classifier_kind_tag() {
        let blob = encode_blob(BlobKind::Classifier, b"state").unwrap();
        assert_eq!(blob[4], 3);
        assert_eq!(decode_blob(BlobKind::Classifier, &blob).unwrap(), b"state");
        assert!(decode_blob(BlobKind::Model, &blob).is_err());
    }

    #[test]
    fn test_serde_payload() {
        let values = vec!["a".to_string(), "b".to_string()];
        let blob = encode_serde(BlobKind::CategoryIndex, &values).unwrap();
        let decoded: Vec<String> = decode_serde(BlobKind::CategoryIndex, &blob).unwrap();
        assert_eq!(decoded, values);
    }
}
