// crates/cdcom-core/src/resources.rs
use serde::{Deserialize, Serialize};

/// Payload type of an embedded binary resource. Unrecognised type codes
/// are carried through unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryResourceType {
    None,
    PngImage,
    BitmapImage,
    JpegImage,
    Other(u32),
}

impl From<u32> for BinaryResourceType {
    fn from(value: u32) -> Self {
        match value {
            0 => BinaryResourceType::None,
            1 => BinaryResourceType::PngImage,
            2 => BinaryResourceType::BitmapImage,
            3 => BinaryResourceType::JpegImage,
            other => BinaryResourceType::Other(other),
        }
    }
}

impl BinaryResourceType {
    pub fn to_u32(self) -> u32 {
        match self {
            BinaryResourceType::None => 0,
            BinaryResourceType::PngImage => 1,
            BinaryResourceType::BitmapImage => 2,
            BinaryResourceType::JpegImage => 3,
            BinaryResourceType::Other(value) => value,
        }
    }

    pub fn mime_type(&self) -> Option<&'static str> {
        match self {
            BinaryResourceType::PngImage => Some("image/png"),
            BinaryResourceType::BitmapImage => Some("image/bmp"),
            BinaryResourceType::JpegImage => Some("image/jpeg"),
            _ => None,
        }
    }
}

impl Default for BinaryResourceType {
    fn default() -> Self {
        BinaryResourceType::None
    }
}

/// An opaque resource stored alongside the component descriptions.
/// The payload is never decoded here; it is stored and returned
/// byte for byte.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinaryResource {
    pub id: u32,
    pub resource_type: BinaryResourceType,
    pub data: Vec<u8>,
}

impl BinaryResource {
    pub fn new(id: u32, resource_type: BinaryResourceType, data: Vec<u8>) -> Self {
        Self {
            id,
            resource_type,
            data,
        }
    }

    pub fn as_icon(&self) -> ComponentIcon {
        ComponentIcon {
            data: self.data.clone(),
            resource_type: self.resource_type,
        }
    }
}

/// Encoded icon image attached to a description or configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentIcon {
    pub data: Vec<u8>,
    pub resource_type: BinaryResourceType,
}

impl ComponentIcon {
    pub fn new(data: Vec<u8>, resource_type: BinaryResourceType) -> Self {
        Self {
            data,
            resource_type,
        }
    }

    pub fn mime_type(&self) -> Option<&'static str> {
        self.resource_type.mime_type()
    }
}
