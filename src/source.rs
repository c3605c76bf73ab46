//! The book source contract consumed by the dump pipeline.
//!
//! A [`BookSource`] exposes the decoded text stream of a book, its embedded
//! images and a handful of metadata strings. [`crate::mobi::MobiBook`] reads
//! these from a MOBI file; [`MemoryBook`] holds them in memory.

use std::borrow::Cow;

use encoding_rs::Encoding;

use crate::error::Result;

/// The full decoded text stream of a book.
///
/// Positional markers in the text are byte offsets into `bytes`, so the
/// stream is kept in its original encoding and only transcoded to UTF-8
/// once it has been cut into fragments.
#[derive(Debug, Clone)]
pub struct RawText {
    pub bytes: Vec<u8>,
    pub encoding: &'static Encoding,
}

impl RawText {
    pub fn new(bytes: impl Into<Vec<u8>>, encoding: &'static Encoding) -> Self {
        Self {
            bytes: bytes.into(),
            encoding,
        }
    }

    /// Text that is already UTF-8.
    pub fn utf8(text: impl Into<String>) -> Self {
        Self::new(text.into().into_bytes(), encoding_rs::UTF_8)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Transcode a slice of this text to UTF-8.
    pub fn decode<'a>(&self, bytes: &'a [u8]) -> Cow<'a, str> {
        let (text, malformed) = self.encoding.decode_without_bom_handling(bytes);
        if malformed {
            tracing::debug!(encoding = self.encoding.name(), "replaced malformed text bytes");
        }
        text
    }
}

/// One embedded image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRecord<'a> {
    /// 1-based sequence number.
    pub index: usize,
    /// File extension including the leading dot, e.g. `.jpg`.
    pub extension: &'static str,
    pub data: Cow<'a, [u8]>,
}

impl ImageRecord<'_> {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

/// Map image magic bytes to the extension used for exported files.
pub fn image_extension(data: &[u8]) -> Option<&'static str> {
    if data.len() < 4 {
        return None;
    }

    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some(".jpg")
    } else if data.starts_with(b"\x89PNG") {
        Some(".png")
    } else if data.starts_with(b"GIF8") {
        Some(".gif")
    } else if data.starts_with(b"BM") {
        Some(".bmp")
    } else {
        None
    }
}

/// Read access to a decoded book.
pub trait BookSource {
    fn author(&self) -> &str;

    fn title(&self) -> &str;

    fn publisher(&self) -> &str;

    /// 1-based image number of the cover, or 0 (or less) when there is none.
    fn cover_index(&self) -> i32;

    /// The full text stream.
    fn text(&self) -> Result<RawText>;

    /// Upper bound on the number of images.
    fn images_count(&self) -> usize;

    /// Image by 1-based index. `None` marks the end of the image sequence.
    fn image(&self, index: usize) -> Option<ImageRecord<'_>>;

    /// Iterate the images in sequence order.
    ///
    /// The iterator is bounded by [`images_count`](Self::images_count) and
    /// ends early at the first missing image. Calling this again restarts
    /// from the first image.
    fn images(&self) -> Images<'_, Self>
    where
        Self: Sized,
    {
        Images {
            source: self,
            next: 1,
        }
    }
}

/// Iterator over the images of a [`BookSource`].
pub struct Images<'a, S: BookSource + ?Sized> {
    source: &'a S,
    next: usize,
}

impl<'a, S: BookSource + ?Sized> Iterator for Images<'a, S> {
    type Item = ImageRecord<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next > self.source.images_count() {
            return None;
        }
        match self.source.image(self.next) {
            Some(image) => {
                self.next += 1;
                Some(image)
            }
            None => {
                // Fuse: a missing image ends the sequence for good.
                self.next = usize::MAX;
                None
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = (self.source.images_count() + 1).saturating_sub(self.next);
        (0, Some(remaining))
    }
}

/// A [`BookSource`] held entirely in memory.
#[derive(Debug, Clone)]
pub struct MemoryBook {
    pub author: String,
    pub title: String,
    pub publisher: String,
    pub cover_index: i32,
    pub text: RawText,
    pub images: Vec<(&'static str, Vec<u8>)>,
}

impl Default for MemoryBook {
    fn default() -> Self {
        Self {
            author: String::new(),
            title: String::new(),
            publisher: String::new(),
            cover_index: 0,
            text: RawText::utf8(""),
            images: Vec::new(),
        }
    }
}

impl MemoryBook {
    pub fn new(text: RawText) -> Self {
        Self {
            text,
            ..Default::default()
        }
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_publisher(mut self, publisher: impl Into<String>) -> Self {
        self.publisher = publisher.into();
        self
    }

    pub fn with_cover_index(mut self, cover_index: i32) -> Self {
        self.cover_index = cover_index;
        self
    }

    pub fn with_image(mut self, extension: &'static str, data: impl Into<Vec<u8>>) -> Self {
        self.images.push((extension, data.into()));
        self
    }
}

impl BookSource for MemoryBook {
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
        Ok(self.text.clone())
    }

    fn images_count(&self) -> usize {
        self.images.len()
    }

    fn image(&self, index: usize) -> Option<ImageRecord<'_>> {
        let (extension, data) = self.images.get(index.checked_sub(1)?)?;
        Some(ImageRecord {
            index,
            extension: *extension,
            data: Cow::Borrowed(data),
        })
    }
}
