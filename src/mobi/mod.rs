//! MOBI container decoding.
//!
//! Only what the dumper needs: the PDB record table, the record 0 headers
//! (PalmDOC, MOBI, EXTH), the text stream and the image records.

mod headers;
mod palmdoc;
mod pdb;
mod reader;

pub use headers::{Compression, ExthHeader, MobiHeader, NULL_INDEX, TextEncoding};
pub use pdb::{PdbInfo, strip_trailing_data};
pub use reader::MobiBook;
