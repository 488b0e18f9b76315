// crates/cdcom-format/src/reader.rs
use std::collections::HashMap;
use std::fs;
use std::path::Path;

use cdcom_core::{
    BinaryResource, BinaryResourceType, ComponentConfiguration, ComponentDescription,
    ComponentFlagGroup, ComponentIcon, ComponentProperty, ComponentVersion,
    ConditionTree, ConnectionDescription, ConnectionGroup, DescriptionSignature, FlagOptions,
    OtherConditionType, PathCommand, PropertyFormatRule, PropertyType, PropertyValue,
    RenderCommand, RenderGroup, SweepDirection, TextRun,
};
use md5::{Digest, Md5};
use serde::Serialize;
use uuid::Uuid;

use crate::conditions::read_conditions;
use crate::consts::{
    ContentItemType, RenderCommandType, SectionType, FORMATTED_TEXT_VERSION, FORMAT_VERSION, MAGIC,
};
use crate::io::{
    alignment_from_u32, datetime_from_ticks, edge_from_i32, formatting_from_u32,
    property_type_from_u8, ByteReader,
};
use crate::signing::{verify_signature, CertificateValidator};
use crate::{FormatError, Result};

/// Parsed file header, including any signature block.
#[derive(Debug, Clone, Serialize)]
pub struct FileHeader {
    pub version: u8,
    pub content_hash: [u8; 16],
    pub flags: u32,
    pub total_length: u32,
    pub data_offset: u32,
    pub item_count: u32,
    pub signature: Option<HeaderSignature>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HeaderSignature {
    pub signature: Vec<u8>,
    pub certificate: Vec<u8>,
}

/// Everything read from one `.cdcom` file.
#[derive(Debug, Clone)]
pub struct ComponentFile {
    pub header: FileHeader,
    pub descriptions: Vec<ComponentDescription>,
    pub resources: Vec<BinaryResource>,
}

impl ComponentFile {
    /// Icon views of the embedded resources, keyed by resource id.
    pub fn icons(&self) -> HashMap<u32, ComponentIcon> {
        self.resources
            .iter()
            .map(|resource| (resource.id, resource.as_icon()))
            .collect()
    }

    /// Resolve pending icon references on every description against
    /// the embedded resources.
    pub fn attach_icons(&mut self) {
        let icons = self.icons();
        for description in &mut self.descriptions {
            description.set_icons(&icons);
        }
    }
}

/// Parses the binary container. Construction is cheap; all the work
/// happens in [`ComponentReader::parse`].
pub struct ComponentReader<'a> {
    data: &'a [u8],
    validator: Option<&'a dyn CertificateValidator>,
}

impl<'a> ComponentReader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            validator: None,
        }
    }

    pub fn with_validator(data: &'a [u8], validator: &'a dyn CertificateValidator) -> Self {
        Self {
            data,
            validator: Some(validator),
        }
    }

    pub fn parse(&self) -> Result<ComponentFile> {
        let mut reader = ByteReader::new(self.data);

        let magic = reader.read_bytes(MAGIC.len())?;
        if magic != MAGIC.as_slice() {
            return Err(FormatError::BadMagic);
        }

        let version = reader.read_u8()?;
        if version > FORMAT_VERSION {
            return Err(FormatError::UnsupportedVersion(version));
        }

        let mut content_hash = [0u8; 16];
        content_hash.copy_from_slice(reader.read_bytes(16)?);
        let flags = reader.read_u32()?;
        let total_length = reader.read_u32()?;
        let data_offset = reader.read_u32()?;
        let item_count = reader.read_u32()?;
        let signature = if reader.read_bool()? {
            let signature_length = reader.read_u32()? as usize;
            let signature = reader.read_bytes(signature_length)?.to_vec();
            let certificate_length = reader.read_u32()? as usize;
            let certificate = reader.read_bytes(certificate_length)?.to_vec();
            Some(HeaderSignature {
                signature,
                certificate,
            })
        } else {
            None
        };

        // Framing pre-pass: find the extent of the content run and
        // verify the hash before interpreting any payload.
        let content_start = data_offset as usize;
        reader.seek(content_start)?;
        for _ in 0..item_count {
            reader.read_u16()?;
            let length = reader.read_u32()? as usize;
            reader.skip(length)?;
        }
        let content_end = reader.position();
        let content = &self.data[content_start..content_end];

        let computed: [u8; 16] = Md5::digest(content).into();
        if computed != content_hash {
            return Err(FormatError::HashMismatch);
        }

        // One signature covers the whole content run; every
        // description in the file shares its verification state.
        let description_signature = signature.as_ref().map(|block| DescriptionSignature {
            certificate: block.certificate.clone(),
            is_valid: verify_signature(&block.certificate, content, &block.signature),
            is_trusted: match self.validator {
                Some(validator) => validator.is_trusted(&block.certificate),
                None => false,
            },
        });

        reader.seek(content_start)?;
        let mut descriptions = Vec::new();
        let mut resources = Vec::new();
        for _ in 0..item_count {
            let item_type = reader.read_u16()?;
            let length = reader.read_u32()? as usize;
            let item_end = reader.position() + length;

            match ContentItemType::from_u16(item_type) {
                Some(ContentItemType::Component) => {
                    let mut description = parse_component(&mut reader, version)?;
                    description.metadata.signature = description_signature.clone();
                    descriptions.push(description);
                }
                Some(ContentItemType::Resource) => {
                    resources.push(parse_resource(&mut reader)?);
                }
                None => {
                    tracing::debug!("skipping unknown content item type {}", item_type);
                }
            }

            if reader.position() > item_end {
                return Err(FormatError::InvalidData(
                    "content item overruns its declared length".to_owned(),
                ));
            }
            reader.seek(item_end)?;
        }

        Ok(ComponentFile {
            header: FileHeader {
                version,
                content_hash,
                flags,
                total_length,
                data_offset,
                item_count,
                signature,
            },
            descriptions,
            resources,
        })
    }
}

/// Parse a component file from a byte buffer, optionally consulting a
/// trust store for any embedded certificate.
pub fn read_component_file(
    data: &[u8],
    validator: Option<&dyn CertificateValidator>,
) -> Result<ComponentFile> {
    match validator {
        Some(validator) => ComponentReader::with_validator(data, validator).parse(),
        None => ComponentReader::new(data).parse(),
    }
}

/// Read and parse a component file from disk.
pub fn load_component_file(path: impl AsRef<Path>) -> Result<ComponentFile> {
    let data = fs::read(path)?;
    ComponentReader::new(&data).parse()
}

fn parse_component(reader: &mut ByteReader<'_>, version: u8) -> Result<ComponentDescription> {
    let id = reader.read_u32()?;
    let num_sections = reader.read_u32()?;

    let mut description = ComponentDescription::new(id, "");
    let mut legacy_can_resize = true;
    let mut legacy_can_flip = false;
    // Setters arrive keyed by serialized property name. Translation
    // waits until every section is in, since a configurations section
    // may precede the properties it refers to.
    let mut pending_setters: Vec<(usize, Vec<(String, PropertyValue)>)> = Vec::new();

    for _ in 0..num_sections {
        let section_type = reader.read_u16()?;
        let length = reader.read_u32()? as usize;
        let section_end = reader.position() + length;

        match SectionType::from_u16(section_type) {
            Some(SectionType::Metadata) => {
                description.component_name = reader.read_string()?;
                legacy_can_resize = reader.read_bool()?;
                legacy_can_flip = reader.read_bool()?;
                description.min_size = reader.read_f64()?;
                let mut guid = [0u8; 16];
                guid.copy_from_slice(reader.read_bytes(16)?);
                description.metadata.guid = Uuid::from_bytes_le(guid);
                description.metadata.author = reader.read_string()?;
                description.metadata.version =
                    ComponentVersion::new(reader.read_u16()?, reader.read_u16()?);
                description.metadata.additional_information = reader.read_string()?;
                description.metadata.implement_set = reader.read_string()?;
                description.metadata.implement_item = reader.read_string()?;
                let icon_resource = reader.read_i32()?;
                description.metadata.icon_resource_id = if icon_resource >= 0 {
                    Some(icon_resource as u32)
                } else {
                    None
                };
                description.metadata.created = datetime_from_ticks(reader.read_i64()?)?;
            }
            Some(SectionType::Flags) => {
                let count = reader.read_u32()?;
                for _ in 0..count {
                    let conditions = read_conditions(reader, version)?;
                    let value = FlagOptions::from_bits_retain(reader.read_u32()?);
                    description
                        .flags
                        .push(ComponentFlagGroup::new(conditions, value));
                }
            }
            Some(SectionType::Properties) => {
                let count = reader.read_u32()?;
                for _ in 0..count {
                    description.properties.push(parse_property(reader, version)?);
                }
            }
            Some(SectionType::Configurations) => {
                let count = reader.read_u32()?;
                for _ in 0..count {
                    let name = reader.read_string()?;
                    let implementation_name = reader.read_string()?;
                    let mut configuration = ComponentConfiguration::new(name);
                    if !implementation_name.is_empty() {
                        configuration.implementation_name = Some(implementation_name);
                    }
                    let setter_count = reader.read_i32()?;
                    let mut setters = Vec::new();
                    for _ in 0..setter_count.max(0) {
                        let serialized_name = reader.read_string()?;
                        let value = reader.read_tagged_value()?;
                        setters.push((serialized_name, value));
                    }
                    let icon_resource = reader.read_i32()?;
                    configuration.icon_resource_id = if icon_resource >= 0 {
                        Some(icon_resource as u32)
                    } else {
                        None
                    };
                    pending_setters.push((description.metadata.configurations.len(), setters));
                    description.metadata.configurations.push(configuration);
                }
            }
            Some(SectionType::Connections) => {
                let group_count = reader.read_u32()?;
                for _ in 0..group_count {
                    let conditions = read_conditions(reader, version)?;
                    let connection_count = reader.read_u32()?;
                    let mut connections = Vec::new();
                    for _ in 0..connection_count {
                        let start = reader.read_point()?;
                        let end = reader.read_point()?;
                        let edge = edge_from_i32(reader.read_i32()?)?;
                        let name = reader.read_string()?;
                        connections.push(ConnectionDescription::new(start, end, edge, name));
                    }
                    description
                        .connections
                        .push(ConnectionGroup::new(conditions, connections));
                }
            }
            Some(SectionType::Render) => {
                let group_count = reader.read_u32()?;
                for _ in 0..group_count {
                    let conditions = read_conditions(reader, version)?;
                    // Counts come off the wire, so never pre-allocate from them.
                    let command_count = reader.read_u32()?;
                    let mut commands = Vec::new();
                    for _ in 0..command_count {
                        commands.push(parse_render_command(reader)?);
                    }
                    description
                        .render_descriptions
                        .push(RenderGroup::new(conditions, commands));
                }
            }
            None => {
                tracing::debug!("skipping unknown section type {}", section_type);
            }
        }

        if reader.position() > section_end {
            return Err(FormatError::InvalidData(
                "section overruns its declared length".to_owned(),
            ));
        }
        reader.seek(section_end)?;
    }

    // Translate setter keys now that the properties are known.
    let mut resolved = Vec::new();
    for (index, setters) in &pending_setters {
        for (serialized_name, value) in setters {
            let name = match description.property_by_serialized_name(serialized_name) {
                Some(property) => property.name.clone(),
                None => {
                    tracing::warn!(
                        "configuration setter references unknown property '{}'",
                        serialized_name
                    );
                    serialized_name.clone()
                }
            };
            resolved.push((*index, name, value.clone()));
        }
    }
    for (index, name, value) in resolved {
        if let Some(configuration) = description.metadata.configurations.get_mut(index) {
            configuration.setters.insert(name, value);
        }
    }

    // Older files carry resize/flip as metadata booleans. Honour them
    // only when no unconditional flag group was stored, so files with
    // a flags section round-trip their group order untouched.
    if !description.flags.iter().any(|g| g.conditions.is_empty()) {
        let mut value = FlagOptions::empty();
        value.set(FlagOptions::FLIP_PRIMARY, legacy_can_flip);
        value.set(FlagOptions::NO_RESIZE, !legacy_can_resize);
        if !value.is_empty() {
            description
                .flags
                .push(ComponentFlagGroup::new(ConditionTree::Empty, value));
        }
    }

    Ok(description)
}

fn parse_property(reader: &mut ByteReader<'_>, version: u8) -> Result<ComponentProperty> {
    let name = reader.read_string()?;
    let serialized_name = reader.read_string()?;
    let display_name = reader.read_string()?;
    let kind = property_type_from_u8(reader.read_u8()?)?;
    let default = reader.read_tagged_value()?;
    let mut property = ComponentProperty::new(name, serialized_name, display_name, kind, default);

    if kind == PropertyType::Enumeration {
        let option_count = reader.read_i32()?;
        for _ in 0..option_count.max(0) {
            property.enum_options.push(reader.read_string()?);
        }
    }

    let format_count = reader.read_u32()?;
    for _ in 0..format_count {
        let conditions = read_conditions(reader, version)?;
        let format = reader.read_string()?;
        property
            .format_rules
            .push(PropertyFormatRule { conditions, format });
    }

    let other_count = reader.read_u32()?;
    for _ in 0..other_count {
        let other_type = OtherConditionType(reader.read_u32()?);
        let conditions = read_conditions(reader, version)?;
        property.other_conditions.insert(other_type, conditions);
    }

    Ok(property)
}

fn parse_render_command(reader: &mut ByteReader<'_>) -> Result<RenderCommand> {
    let raw = reader.read_u32()?;
    match RenderCommandType::from_u32(raw) {
        Some(RenderCommandType::Line) => Ok(RenderCommand::Line {
            start: reader.read_point()?,
            end: reader.read_point()?,
            thickness: reader.read_f64()?,
        }),
        Some(RenderCommandType::Rectangle) => Ok(RenderCommand::Rectangle {
            location: reader.read_point()?,
            width: reader.read_f64()?,
            height: reader.read_f64()?,
            thickness: reader.read_f64()?,
            fill: reader.read_u32()? != 0,
        }),
        Some(RenderCommandType::Ellipse) => Ok(RenderCommand::Ellipse {
            centre: reader.read_point()?,
            radius_x: reader.read_f64()?,
            radius_y: reader.read_f64()?,
            thickness: reader.read_f64()?,
            fill: reader.read_u32()? != 0,
        }),
        Some(RenderCommandType::Path) => {
            let start = reader.read_point()?;
            let thickness = reader.read_f64()?;
            let fill = reader.read_u32()? != 0;
            let command_count = reader.read_i32()?;
            let mut commands = Vec::new();
            for _ in 0..command_count.max(0) {
                commands.push(parse_path_command(reader)?);
            }
            Ok(RenderCommand::Path {
                start,
                thickness,
                fill,
                commands,
            })
        }
        Some(RenderCommandType::Text) => {
            let text_version = reader.read_u8()?;
            if text_version > FORMATTED_TEXT_VERSION {
                return Err(FormatError::UnsupportedTextVersion(text_version));
            }
            let location = reader.read_point()?;
            let alignment = alignment_from_u32(reader.read_u32()?)?;
            let run_count = reader.read_u32()?;
            let mut runs = Vec::new();
            for _ in 0..run_count {
                let formatting = formatting_from_u32(reader.read_u32()?)?;
                let size = reader.read_f64()?;
                let text = reader.read_string()?;
                runs.push(TextRun {
                    text,
                    formatting,
                    size,
                });
            }
            Ok(RenderCommand::Text {
                location,
                alignment,
                runs,
            })
        }
        None => Err(FormatError::InvalidData(format!(
            "unknown render command type {}",
            raw
        ))),
    }
}

fn parse_path_command(reader: &mut ByteReader<'_>) -> Result<PathCommand> {
    match reader.read_i32()? {
        0 => Ok(PathCommand::MoveTo {
            to: reader.read_dvec2()?,
        }),
        1 => Ok(PathCommand::LineTo {
            to: reader.read_dvec2()?,
        }),
        2 => Ok(PathCommand::CurveTo {
            control_start: reader.read_dvec2()?,
            control_end: reader.read_dvec2()?,
            to: reader.read_dvec2()?,
        }),
        3 => Ok(PathCommand::EllipticalArcTo {
            radii: reader.read_dvec2()?,
            rotation: reader.read_f64()?,
            is_large_arc: reader.read_bool()?,
            sweep: if reader.read_bool()? {
                SweepDirection::Clockwise
            } else {
                SweepDirection::Counterclockwise
            },
            to: reader.read_dvec2()?,
        }),
        4 => Ok(PathCommand::QuadraticBezierCurveTo {
            control: reader.read_dvec2()?,
            to: reader.read_dvec2()?,
        }),
        5 => Ok(PathCommand::SmoothCurveTo {
            control_end: reader.read_dvec2()?,
            to: reader.read_dvec2()?,
        }),
        6 => Ok(PathCommand::SmoothQuadraticBezierCurveTo {
            to: reader.read_dvec2()?,
        }),
        7 => Ok(PathCommand::ClosePath),
        other => Err(FormatError::InvalidData(format!(
            "unknown path command type {}",
            other
        ))),
    }
}

fn parse_resource(reader: &mut ByteReader<'_>) -> Result<BinaryResource> {
    let id = reader.read_u32()?;
    let resource_type = BinaryResourceType::from(reader.read_u32()?);
    let length = reader.read_u32()? as usize;
    let data = reader.read_bytes(length)?.to_vec();
    Ok(BinaryResource::new(id, resource_type, data))
}
