//! PalmDOC, MOBI and EXTH headers from record 0.

use encoding_rs::Encoding;

use super::pdb::{be_u16, be_u32};
use crate::error::{Error, Result};

pub const NULL_INDEX: u32 = 0xFFFFFFFF;

/// Text compression scheme from the PalmDOC header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    PalmDoc,
    Huffman,
    Unknown(u16),
}

/// Text encoding declared by the MOBI header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    Cp1252,
    Utf8,
    Unknown(u32),
}

impl TextEncoding {
    pub fn encoding(self) -> &'static Encoding {
        match self {
            TextEncoding::Utf8 => encoding_rs::UTF_8,
            TextEncoding::Cp1252 | TextEncoding::Unknown(_) => encoding_rs::WINDOWS_1252,
        }
    }
}

/// PalmDOC + MOBI header (record 0).
#[derive(Debug, Clone)]
pub struct MobiHeader {
    pub compression: Compression,
    pub text_record_count: u16,
    pub encryption: u16,
    pub encoding: TextEncoding,
    pub first_image_index: u32,
    pub full_name: String,
    pub exth_flags: u32,
    pub extra_data_flags: u16,
    /// Length of the MOBI header proper (starts at byte 16).
    pub header_length: u32,
}

impl MobiHeader {
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < 16 {
            return Err(Error::InvalidMobi("MOBI header too short".into()));
        }

        let compression = match be_u16(data, 0).unwrap_or(0) {
            1 => Compression::None,
            2 => Compression::PalmDoc,
            0x4448 => Compression::Huffman, // "DH"
            n => Compression::Unknown(n),
        };
        let text_record_count = be_u16(data, 8).unwrap_or(0);
        let encryption = be_u16(data, 12).unwrap_or(0);

        // Plain PalmDOC files stop here.
        if data.get(16..20) != Some(&b"MOBI"[..]) {
            return Ok(Self {
                compression,
                text_record_count,
                encryption,
                encoding: TextEncoding::Cp1252,
                first_image_index: NULL_INDEX,
                full_name: String::new(),
                exth_flags: 0,
                extra_data_flags: 0,
                header_length: 0,
            });
        }

        let header_length = be_u32(data, 20).unwrap_or(0);
        let encoding = match be_u32(data, 28).unwrap_or(1252) {
            1252 => TextEncoding::Cp1252,
            65001 => TextEncoding::Utf8,
            n => TextEncoding::Unknown(n),
        };

        let full_name = match (be_u32(data, 0x54), be_u32(data, 0x58)) {
            (Some(offset), Some(len)) => data
                .get(offset as usize..(offset as usize).saturating_add(len as usize))
                .map(|bytes| decode(bytes, encoding))
                .unwrap_or_default(),
            _ => String::new(),
        };

        let first_image_index = be_u32(data, 0x6C).unwrap_or(NULL_INDEX);
        let exth_flags = be_u32(data, 0x80).unwrap_or(0);
        let extra_data_flags = if header_length >= 0xE4 {
            be_u16(data, 0xF2).unwrap_or(0)
        } else {
            0
        };

        Ok(Self {
            compression,
            text_record_count,
            encryption,
            encoding,
            first_image_index,
            full_name,
            exth_flags,
            extra_data_flags,
            header_length,
        })
    }

    pub fn has_exth(&self) -> bool {
        self.exth_flags & 0x40 != 0
    }

    /// Parse the EXTH block that follows this header in `record0`, if any.
    pub fn exth(&self, record0: &[u8]) -> Option<ExthHeader> {
        if !self.has_exth() || self.header_length == 0 {
            return None;
        }
        let start = 16 + self.header_length as usize;
        let block = record0.get(start..)?;
        match ExthHeader::parse(block, self.encoding) {
            Ok(exth) => Some(exth),
            Err(e) => {
                tracing::warn!(error = %e, "ignoring unreadable EXTH header");
                None
            }
        }
    }
}

/// EXTH header fields used by the dumper.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExthHeader {
    pub authors: Vec<String>,
    pub publisher: Option<String>,
    pub title: Option<String>,
    /// Cover image, 0-based from the first image record.
    pub cover_offset: Option<u32>,
}

impl ExthHeader {
    pub fn parse(data: &[u8], encoding: TextEncoding) -> Result<Self> {
        if data.len() < 12 || &data[..4] != b"EXTH" {
            return Err(Error::InvalidMobi("missing EXTH signature".into()));
        }

        let record_count = be_u32(data, 8).unwrap_or(0);
        let mut exth = ExthHeader::default();
        let mut pos = 12;

        for _ in 0..record_count {
            let (Some(kind), Some(len)) = (be_u32(data, pos), be_u32(data, pos + 4)) else {
                break;
            };
            let len = len as usize;
            let Some(content) = data.get(pos + 8..pos + len) else {
                break;
            };

            match kind {
                100 => exth.authors.push(decode(content, encoding)),
                101 => exth.publisher = Some(decode(content, encoding)),
                201 => {
                    exth.cover_offset = be_u32(content, 0).filter(|&v| v != NULL_INDEX);
                }
                503 => exth.title = Some(decode(content, encoding)),
                _ => {}
            }

            pos += len;
        }

        Ok(exth)
    }
}

fn decode(bytes: &[u8], encoding: TextEncoding) -> String {
    let (text, _) = encoding.encoding().decode_without_bom_handling(bytes);
    text.trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn exth_record(kind: u32, content: &[u8]) -> Vec<u8> {
        let mut record = Vec::new();
        record.extend_from_slice(&kind.to_be_bytes());
        record.extend_from_slice(&(8 + content.len() as u32).to_be_bytes());
        record.extend_from_slice(content);
        record
    }

    fn exth_block(records: &[Vec<u8>]) -> Vec<u8> {
        let body: Vec<u8> = records.concat();
        let mut data = Vec::new();
        data.extend_from_slice(b"EXTH");
        data.extend_from_slice(&(12 + body.len() as u32).to_be_bytes());
        data.extend_from_slice(&(records.len() as u32).to_be_bytes());
        data.extend_from_slice(&body);
        data
    }

    #[test]
    fn test_palmdoc_only_header() {
        let mut data = vec![0u8; 16];
        data[0..2].copy_from_slice(&2u16.to_be_bytes());
        data[8..10].copy_from_slice(&7u16.to_be_bytes());

        let header = MobiHeader::parse(&data).unwrap();
        assert_eq!(header.compression, Compression::PalmDoc);
        assert_eq!(header.text_record_count, 7);
        assert_eq!(header.encoding, TextEncoding::Cp1252);
        assert_eq!(header.first_image_index, NULL_INDEX);
        assert!(!header.has_exth());
    }

    #[test]
    fn test_mobi_header_fields() {
        let mut data = vec![0u8; 0x100];
        data[0..2].copy_from_slice(&1u16.to_be_bytes());
        data[16..20].copy_from_slice(b"MOBI");
        data[20..24].copy_from_slice(&0xE8u32.to_be_bytes());
        data[28..32].copy_from_slice(&65001u32.to_be_bytes());
        data[0x6C..0x70].copy_from_slice(&5u32.to_be_bytes());
        data[0x80..0x84].copy_from_slice(&0x40u32.to_be_bytes());
        data[0xF2..0xF4].copy_from_slice(&3u16.to_be_bytes());
        data.extend_from_slice(b"Full Name");
        data[0x54..0x58].copy_from_slice(&0x100u32.to_be_bytes());
        data[0x58..0x5C].copy_from_slice(&9u32.to_be_bytes());

        let header = MobiHeader::parse(&data).unwrap();
        assert_eq!(header.compression, Compression::None);
        assert_eq!(header.encoding, TextEncoding::Utf8);
        assert_eq!(header.first_image_index, 5);
        assert_eq!(header.extra_data_flags, 3);
        assert_eq!(header.full_name, "Full Name");
        assert!(header.has_exth());
    }

    #[test]
    fn test_huffman_compression() {
        let mut data = vec![0u8; 16];
        data[0..2].copy_from_slice(&0x4448u16.to_be_bytes());
        assert_eq!(MobiHeader::parse(&data).unwrap().compression, Compression::Huffman);
    }

    #[test]
    fn test_header_too_short() {
        assert!(MobiHeader::parse(&[0u8; 10]).is_err());
    }

    #[test]
    fn test_exth_fields() {
        let data = exth_block(&[
            exth_record(100, b"First Author"),
            exth_record(100, b" Second Author "),
            exth_record(101, b"Press"),
            exth_record(201, &2u32.to_be_bytes()),
            exth_record(503, b"Updated Title"),
            exth_record(999, b"ignored"),
        ]);

        let exth = ExthHeader::parse(&data, TextEncoding::Utf8).unwrap();
        assert_eq!(exth.authors, vec!["First Author", "Second Author"]);
        assert_eq!(exth.publisher.as_deref(), Some("Press"));
        assert_eq!(exth.cover_offset, Some(2));
        assert_eq!(exth.title.as_deref(), Some("Updated Title"));
    }

    #[test]
    fn test_exth_null_cover() {
        let data = exth_block(&[exth_record(201, &NULL_INDEX.to_be_bytes())]);
        let exth = ExthHeader::parse(&data, TextEncoding::Utf8).unwrap();
        assert_eq!(exth.cover_offset, None);
    }

    #[test]
    fn test_exth_cp1252() {
        let data = exth_block(&[exth_record(100, b"Jos\xe9")]);
        let exth = ExthHeader::parse(&data, TextEncoding::Cp1252).unwrap();
        assert_eq!(exth.authors, vec!["José"]);
    }

    #[test]
    fn test_exth_invalid_signature() {
        assert!(ExthHeader::parse(b"NOTEXTH_____", TextEncoding::Utf8).is_err());
    }
}
