//! MOBI files as a [`BookSource`].

use std::borrow::Cow;
use std::path::Path;

use super::headers::{Compression, MobiHeader, NULL_INDEX};
use super::palmdoc;
use super::pdb::{PdbInfo, strip_trailing_data};
use crate::error::{Error, Result};
use crate::source::{BookSource, ImageRecord, RawText, image_extension};

/// A MOBI (or PalmDOC) book held in memory.
///
/// Headers and metadata are parsed up front; the text stream is
/// decompressed on each call to [`BookSource::text`] and images are sliced
/// out of the file on demand.
#[derive(Debug, Clone)]
pub struct MobiBook {
    data: Vec<u8>,
    pdb: PdbInfo,
    header: MobiHeader,
    author: String,
    title: String,
    publisher: String,
    cover_index: i32,
}

impl MobiBook {
    /// Read and parse the file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let data = std::fs::read(path.as_ref())?;
        Self::from_bytes(data)
    }

    /// Parse a complete MOBI file.
    pub fn from_bytes(data: Vec<u8>) -> Result<Self> {
        let pdb = PdbInfo::parse(&data)?;
        if pdb.num_records() < 2 {
            return Err(Error::InvalidMobi("not enough records".into()));
        }

        let record0 = &data[pdb.record_range(0, data.len())?];
        let header = MobiHeader::parse(record0)?;
        if header.encryption != 0 {
            return Err(Error::Unsupported("encrypted books".into()));
        }

        let exth = header.exth(record0).unwrap_or_default();

        let title = exth
            .title
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| Some(header.full_name.clone()).filter(|t| !t.is_empty()))
            .unwrap_or_else(|| pdb.name.clone());
        let cover_index = exth
            .cover_offset
            .and_then(|offset| i32::try_from(offset).ok())
            .map_or(0, |offset| offset + 1);

        tracing::debug!(
            records = pdb.num_records(),
            compression = ?header.compression,
            encoding = ?header.encoding,
            "parsed MOBI headers"
        );

        Ok(Self {
            author: exth.authors.join(", "),
            publisher: exth.publisher.unwrap_or_default(),
            title,
            cover_index,
            data,
            pdb,
            header,
        })
    }

    pub fn header(&self) -> &MobiHeader {
        &self.header
    }

    fn record(&self, index: usize) -> Result<&[u8]> {
        Ok(&self.data[self.pdb.record_range(index, self.data.len())?])
    }
}

impl BookSource for MobiBook {
    fn author(&self) -> &str {
        &self.author
    }

    fn title(&self) -> &str {
        &self.title
    }

    fn publisher(&self) -> &str {
        &self.publisher
    }

    fn cover_index(&self) -> i32 {
        self.cover_index
    }

    fn text(&self) -> Result<RawText> {
        match self.header.compression {
            Compression::None | Compression::PalmDoc => {}
            Compression::Huffman => {
                return Err(Error::Unsupported("HUFF/CDIC text compression".into()));
            }
            Compression::Unknown(n) => {
                return Err(Error::Unsupported(format!("text compression type {n}")));
            }
        }

        let mut text = Vec::new();
        for i in 1..=usize::from(self.header.text_record_count) {
            let record = strip_trailing_data(self.record(i)?, self.header.extra_data_flags);
            match self.header.compression {
                Compression::PalmDoc => text.extend_from_slice(&palmdoc::decompress(record)),
                _ => text.extend_from_slice(record),
            }
        }

        Ok(RawText::new(text, self.header.encoding.encoding()))
    }

    fn images_count(&self) -> usize {
        match self.header.first_image_index {
            NULL_INDEX | 0 => 0,
            first => self.pdb.num_records().saturating_sub(first as usize),
        }
    }

    fn image(&self, index: usize) -> Option<ImageRecord<'_>> {
        if index == 0 || index > self.images_count() {
            return None;
        }
        let record_index = self.header.first_image_index as usize + index - 1;
        let data = self.record(record_index).ok()?;
        let extension = image_extension(data)?;
        Some(ImageRecord {
            index,
            extension,
            data: Cow::Borrowed(data),
        })
    }
}
