//! Image naming and export.
//!
//! Names are assigned in a side-effect-free pass before any text is
//! rewritten, because the link rewriter needs the complete list up front.
//! The bytes are written in a second pass over the same images.

use crate::error::Result;
use crate::source::BookSource;
use crate::storage::Storage;

/// File name for image number `index` (1-based) with the given extension.
pub fn image_file_name(index: usize, extension: &str) -> String {
    format!("img_{index:03}{extension}")
}

/// Assign a file name to every image of `source`, in sequence order.
pub fn scan_images<S: BookSource>(source: &S) -> Vec<String> {
    source
        .images()
        .map(|image| image_file_name(image.index, image.extension))
        .collect()
}

/// Write the raw bytes of every image under its assigned name.
///
/// Returns the number of images written.
pub fn export_images<S, W>(source: &S, names: &[String], storage: &mut W) -> Result<usize>
where
    S: BookSource,
    W: Storage + ?Sized,
{
    let mut written = 0;
    for (image, name) in source.images().zip(names) {
        tracing::debug!(name = %name, bytes = image.len(), "writing image");
        storage.write(name, &image.data)?;
        written += 1;
    }
    Ok(written)
}
