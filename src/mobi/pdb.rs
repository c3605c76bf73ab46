//! Palm Database container: the record table every MOBI file starts with.

use std::ops::Range;

use crate::error::{Error, Result};

/// Length of the fixed PDB header before the record table.
pub const PDB_HEADER_LEN: usize = 78;

#[inline]
pub(crate) fn be_u16(data: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_be_bytes(data.get(at..at + 2)?.try_into().ok()?))
}

#[inline]
pub(crate) fn be_u32(data: &[u8], at: usize) -> Option<u32> {
    Some(u32::from_be_bytes(data.get(at..at + 4)?.try_into().ok()?))
}

/// PDB header info.
#[derive(Debug, Clone)]
pub struct PdbInfo {
    pub name: String,
    /// Start offset of each record within the file.
    pub record_offsets: Vec<u32>,
}

impl PdbInfo {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < PDB_HEADER_LEN {
            return Err(Error::InvalidMobi("PDB header too short".into()));
        }

        // Bytes 0-31: database name (null-terminated)
        let name_end = data[..32].iter().position(|&b| b == 0).unwrap_or(32);
        let name = String::from_utf8_lossy(&data[..name_end]).into_owned();

        // Bytes 60-67: type/creator
        let ident = &data[60..68];
        if ident != b"BOOKMOBI" && !ident.eq_ignore_ascii_case(b"TEXTREAD") {
            return Err(Error::InvalidMobi(format!(
                "unknown book type {:?}",
                String::from_utf8_lossy(ident)
            )));
        }

        let num_records = be_u16(data, 76).unwrap_or(0) as usize;
        let record_offsets = (0..num_records)
            .map(|i| be_u32(data, PDB_HEADER_LEN + i * 8))
            .collect::<Option<Vec<u32>>>()
            .ok_or_else(|| Error::InvalidMobi("PDB record table truncated".into()))?;

        Ok(Self {
            name,
            record_offsets,
        })
    }

    pub fn num_records(&self) -> usize {
        self.record_offsets.len()
    }

    /// Byte range of record `index` in a file of `file_len` bytes.
    pub fn record_range(&self, index: usize, file_len: usize) -> Result<Range<usize>> {
        let start = *self
            .record_offsets
            .get(index)
            .ok_or_else(|| Error::InvalidMobi(format!("record {index} out of bounds")))?
            as usize;
        let end = self
            .record_offsets
            .get(index + 1)
            .map_or(file_len, |&next| next as usize);

        if start > end || end > file_len {
            return Err(Error::InvalidMobi(format!(
                "record {index} spans {start}..{end} outside file of {file_len} bytes"
            )));
        }
        Ok(start..end)
    }
}

/// Strip trailing extra data entries from a text record.
///
/// `flags` is the MOBI header's extra data flags: bit 0 marks multibyte
/// overlap bytes, each higher set bit one size-suffixed trailing entry.
pub fn strip_trailing_data(record: &[u8], flags: u16) -> &[u8] {
    let mut end = record.len();

    let mut entries = flags >> 1;
    while entries != 0 && end > 0 {
        if entries & 1 != 0 {
            // Backward variable-width integer; the high bit marks its first byte.
            let mut size = 0usize;
            let mut shift = 0;
            let mut pos = end;
            while pos > 0 {
                pos -= 1;
                let byte = record[pos];
                size |= usize::from(byte & 0x7F) << shift;
                shift += 7;
                if byte & 0x80 != 0 || shift >= 28 {
                    break;
                }
            }
            if size <= end {
                end -= size;
            }
        }
        entries >>= 1;
    }

    if flags & 1 != 0 && end > 0 {
        let overlap = usize::from(record[end - 1] & 3) + 1;
        end = end.saturating_sub(overlap);
    }

    &record[..end]
}
