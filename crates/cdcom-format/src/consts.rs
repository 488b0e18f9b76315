// crates/cdcom-format/src/consts.rs

/// File magic: a high bit byte to catch text-mode mangling, the format
/// name, then a CRLF pair that breaks if line endings are rewritten.
pub const MAGIC: [u8; 8] = [0x89, b'C', b'D', b'C', b'O', b'M', 0x0D, 0x0A];

/// Highest container version this crate reads; also the version it
/// writes.
pub const FORMAT_VERSION: u8 = 2;

/// Version byte carried by each serialized text command, independent
/// of the container version.
pub const FORMATTED_TEXT_VERSION: u8 = 1;

/// .NET epoch (0001-01-01T00:00:00Z) expressed in 100 ns ticks before
/// the Unix epoch. Timestamps are stored as ticks since the .NET epoch.
pub const UNIX_EPOCH_TICKS: i64 = 621_355_968_000_000_000;

pub const TICKS_PER_SECOND: i64 = 10_000_000;

/// Top-level content item types. Anything else is skipped by its
/// declared length.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContentItemType {
    Component = 1,
    Resource = 2,
}

impl ContentItemType {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(ContentItemType::Component),
            2 => Some(ContentItemType::Resource),
            _ => None,
        }
    }
}

/// Section types within a component payload. Anything else is skipped
/// by its declared length.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SectionType {
    Metadata = 1,
    Flags = 2,
    Properties = 3,
    Configurations = 4,
    Connections = 5,
    Render = 6,
}

impl SectionType {
    pub fn from_u16(value: u16) -> Option<Self> {
        match value {
            1 => Some(SectionType::Metadata),
            2 => Some(SectionType::Flags),
            3 => Some(SectionType::Properties),
            4 => Some(SectionType::Configurations),
            5 => Some(SectionType::Connections),
            6 => Some(SectionType::Render),
            _ => None,
        }
    }
}

#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderCommandType {
    Line = 1,
    Rectangle = 2,
    Ellipse = 3,
    Path = 4,
    Text = 5,
}

impl RenderCommandType {
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            1 => Some(RenderCommandType::Line),
            2 => Some(RenderCommandType::Rectangle),
            3 => Some(RenderCommandType::Ellipse),
            4 => Some(RenderCommandType::Path),
            5 => Some(RenderCommandType::Text),
            _ => None,
        }
    }
}
