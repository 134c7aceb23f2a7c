//! Transparent unwrapping of zip-compressed payloads.

use std::io::{self, Cursor, Read};

use thiserror::Error;
use zip::ZipArchive;

/// Local file header signature that opens every zip archive.
pub const ZIP_SIGNATURE: [u8; 4] = [0x50, 0x4B, 0x03, 0x04];

/// Errors raised while reading a possibly compressed payload.
#[derive(Debug, Error)]
pub enum PayloadError {
    /// Reading the input failed.
    #[error("failed to read payload: {source}")]
    Read { source: io::Error },
    /// The zip archive could not be opened or read.
    #[error("failed to read zip archive: {source}")]
    Archive { source: zip::result::ZipError },
    /// The zip archive held no entries.
    #[error("zip archive contains no entries")]
    EmptyArchive,
}

/// Whether `bytes` start with the zip local file header.
#[must_use]
pub fn is_zip(bytes: &[u8]) -> bool {
    bytes.starts_with(&ZIP_SIGNATURE)
}

/// Read the whole of `reader`, unpacking the first archived entry when the
/// bytes are a zip archive.
///
/// # Examples
/// ```
/// use geodata_core::compression::read_payload;
///
/// # fn main() -> Result<(), geodata_core::compression::PayloadError> {
/// let bytes = read_payload(&b"plain text"[..])?;
/// assert_eq!(bytes, b"plain text");
/// # Ok(())
/// # }
/// ```
pub fn read_payload<R: Read>(mut reader: R) -> Result<Vec<u8>, PayloadError> {
    let mut bytes = Vec::new();
    reader
        .read_to_end(&mut bytes)
        .map_err(|source| PayloadError::Read { source })?;
    if !is_zip(&bytes) {
        return Ok(bytes);
    }
    log::debug!("payload is zip-compressed; extracting first entry");
    let mut archive = ZipArchive::new(Cursor::new(bytes))
        .map_err(|source| PayloadError::Archive { source })?;
    if archive.is_empty() {
        return Err(PayloadError::EmptyArchive);
    }
    let mut entry = archive
        .by_index(0)
        .map_err(|source| PayloadError::Archive { source })?;
    let mut inflated = Vec::new();
    entry
        .read_to_end(&mut inflated)
        .map_err(|source| PayloadError::Read { source })?;
    Ok(inflated)
}

/// Decode payload bytes as UTF-8 text, dropping a leading byte order mark.
pub(crate) fn decode_text(bytes: &[u8]) -> Result<&str, std::str::Utf8Error> {
    let text = std::str::from_utf8(bytes)?;
    Ok(text.strip_prefix('\u{feff}').unwrap_or(text))
}

#[cfg(test)]
pub(crate) mod test_support {
    use std::io::{Cursor, Write};

    use zip::{ZipWriter, write::SimpleFileOptions};

    /// Zip `contents` as a single stored entry.
    pub(crate) fn zip_bytes(name: &str, contents: &[u8]) -> Vec<u8> {
        let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
        writer
            .start_file(name, SimpleFileOptions::default())
            .expect("start zip entry");
        writer.write_all(contents).expect("write zip entry");
        writer.finish().expect("finish zip archive").into_inner()
    }
}
