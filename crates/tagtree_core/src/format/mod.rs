//! Persisted document format.
//!
//! # Responsibility
//! - Define the ordered key/value model shared by files and drag payloads.
//! - Encode and decode library documents with version negotiation.
//!
//! # See also
//! - `service::drag` for the single-node payload built on the same codec.

pub mod codec;
pub mod value;

pub use codec::{
    decode_document, encode_document, DecodedLibrary, FormatError, FormatResult,
    LibraryMetadata, APPLICATION, FORMAT_VERSION, MAX_LIBRARY_VERSION,
    SUPPORTED_FORMAT_VERSIONS,
};
pub use value::{Map, Value, ValueKind};
