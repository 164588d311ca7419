//! Compressed binary archives of analysis results
//!
//! An archive is a gzip stream holding one `bincode` envelope: an
//! [`ArchiveHeader`] followed by the payload.
//!
//! ```text
//! gzip(
//!   ArchiveHeader { magic: "IXAR", version, kind, saved_at }
//!   payload
//! )
//! ```
//!
//! The `kind` tag names the archived type ([`Archivable::KIND`]), so an
//! archive of one analysis never decodes as another. Truncated, garbled or
//! foreign byte streams are rejected with [`ArchiveError::Corrupt`]; decoding
//! never falls back to a default value.
//!
//! Archives hold derived state only. Types that reference the raw interaction
//! trace are expected to detach it before encoding (see
//! [`PersistentAnalysis::save`](crate::engine::PersistentAnalysis::save)).

use std::{
    fs,
    io::{Read as _, Write as _},
    path::Path,
};

use bincode::Options;
use chrono::{DateTime, Utc};
use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use serde::{Deserialize, Serialize, de::DeserializeOwned};

pub const MAGIC: [u8; 4] = *b"IXAR";
pub const FORMAT_VERSION: u16 = 1;

#[derive(Debug, derive_more::Display, derive_more::Error)]
pub enum ArchiveError {
    #[display("failed to access archive {}", path.display())]
    Io {
        path: std::path::PathBuf,
        source: std::io::Error,
    },
    #[display("corrupt archive: {reason}")]
    Corrupt { reason: String },
    #[display("archive holds a '{found}' result, expected '{expected}'")]
    KindMismatch { expected: String, found: String },
    #[display("failed to encode '{kind}' archive: {reason}")]
    Encode { kind: String, reason: String },
}

impl ArchiveError {
    /// Whether the archive contents (rather than file access) were at fault.
    #[must_use]
    pub fn is_corrupt(&self) -> bool {
        matches!(self, Self::Corrupt { .. } | Self::KindMismatch { .. })
    }

    fn corrupt(reason: impl ToString) -> Self {
        Self::Corrupt {
            reason: reason.to_string(),
        }
    }
}

/// A type that can be stored in an archive under a stable kind tag.
pub trait Archivable: Serialize + DeserializeOwned {
    const KIND: &'static str;
}

#[derive(Serialize, Deserialize)]
struct Envelope<P> {
    header: ArchiveHeader,
    payload: P,
}

/// Metadata stored in front of every archive payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchiveHeader {
    magic: [u8; 4],
    pub version: u16,
    pub kind: String,
    pub saved_at: DateTime<Utc>,
}

pub fn encode<T>(value: &T) -> Result<Vec<u8>, ArchiveError>
where
    T: Archivable,
{
    let encode_error = |reason: &dyn std::fmt::Display| ArchiveError::Encode {
        kind: T::KIND.to_owned(),
        reason: reason.to_string(),
    };
    let envelope = Envelope {
        header: ArchiveHeader {
            magic: MAGIC,
            version: FORMAT_VERSION,
            kind: T::KIND.to_owned(),
            saved_at: Utc::now(),
        },
        payload: value,
    };

    let mut encoder = GzEncoder::new(vec![], Compression::default());
    options()
        .serialize_into(&mut encoder, &envelope)
        .map_err(|e| encode_error(&e))?;
    encoder.flush().map_err(|e| encode_error(&e))?;
    encoder.finish().map_err(|e| encode_error(&e))
}

pub fn decode<T>(bytes: &[u8]) -> Result<T, ArchiveError>
where
    T: Archivable,
{
    let raw = decompress(bytes)?;
    let header = read_header(&raw)?;
    if header.kind != T::KIND {
        return Err(ArchiveError::KindMismatch {
            expected: T::KIND.to_owned(),
            found: header.kind,
        });
    }
    let envelope = options()
        .deserialize::<Envelope<T>>(&raw)
        .map_err(ArchiveError::corrupt)?;
    Ok(envelope.payload)
}

/// Reads only the header of an archive, e.g. to dispatch on its kind.
pub fn peek_header(bytes: &[u8]) -> Result<ArchiveHeader, ArchiveError> {
    read_header(&decompress(bytes)?)
}

pub fn save<T>(value: &T, path: &Path) -> Result<(), ArchiveError>
where
    T: Archivable,
{
    let bytes = encode(value)?;
    fs::write(path, &bytes).map_err(|source| ArchiveError::Io {
        path: path.to_owned(),
        source,
    })?;
    tracing::info!(path = %path.display(), kind = T::KIND, bytes = bytes.len(), "saved archive");
    Ok(())
}

pub fn load<T>(path: &Path) -> Result<T, ArchiveError>
where
    T: Archivable,
{
    decode(&read_file(path)?)
}

pub fn read_file(path: &Path) -> Result<Vec<u8>, ArchiveError> {
    fs::read(path).map_err(|source| ArchiveError::Io {
        path: path.to_owned(),
        source,
    })
}

fn decompress(bytes: &[u8]) -> Result<Vec<u8>, ArchiveError> {
    let mut raw = vec![];
    GzDecoder::new(bytes)
        .read_to_end(&mut raw)
        .map_err(ArchiveError::corrupt)?;
    Ok(raw)
}

/// Slice decoding bounds every length prefix by the input size, so garbage
/// never turns into a huge allocation.
fn options() -> impl Options {
    bincode::DefaultOptions::new()
}

fn read_header(raw: &[u8]) -> Result<ArchiveHeader, ArchiveError> {
    let header = options()
        .allow_trailing_bytes()
        .deserialize::<ArchiveHeader>(raw)
        .map_err(ArchiveError::corrupt)?;
    if header.magic != MAGIC {
        return Err(ArchiveError::corrupt("not an analysis archive"));
    }
    if header.version != FORMAT_VERSION {
        return Err(ArchiveError::corrupt(format!(
            "unsupported format version {}",
            header.version
        )));
    }
    Ok(header)
}
