//! Binary container format for component descriptions (`.cdcom`).
//!
//! A file is a fixed header followed by a run of length-prefixed
//! content items, each holding either a component description or an
//! opaque binary resource. The header carries an MD5 hash of the
//! content run and, for signed files, an RSA signature plus the DER
//! certificate it was made with. Component payloads are themselves
//! split into length-prefixed sections so that readers can skip
//! section types they do not understand.

pub mod consts;
pub mod io;
pub mod conditions;
pub mod reader;
pub mod writer;
pub mod signing;
pub mod transform;

pub use consts::*;
pub use reader::*;
pub use writer::*;
pub use signing::{CertificateValidator, ComponentSigner};
pub use transform::transform;

#[derive(Debug, thiserror::Error)]
pub enum FormatError {
    #[error("Not a component description file")]
    BadMagic,

    #[error("Unsupported format version: {0}")]
    UnsupportedVersion(u8),

    #[error("Unsupported formatted text version: {0}")]
    UnsupportedTextVersion(u8),

    #[error("Unexpected end of data at offset {0}")]
    UnexpectedEnd(usize),

    #[error("Content hash does not match file contents")]
    HashMismatch,

    #[error("Invalid component data: {0}")]
    InvalidData(String),

    #[error("Signing failed: {0}")]
    Signing(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, FormatError>;
