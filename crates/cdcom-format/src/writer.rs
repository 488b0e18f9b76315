// crates/cdcom-format/src/writer.rs
use std::fs::File;
use std::io::Write;
use std::path::Path;

use cdcom_core::{
    serialized_setter_name, BinaryResource, BinaryResourceType, ComponentDescription,
    ComponentProperty, FlagOptions, PathCommand, PropertyType, RenderCommand, SweepDirection,
};
use md5::{Digest, Md5};

use crate::conditions::write_conditions;
use crate::consts::{
    ContentItemType, RenderCommandType, SectionType, FORMATTED_TEXT_VERSION, FORMAT_VERSION, MAGIC,
};
use crate::io::{
    alignment_to_u32, datetime_to_ticks, edge_to_i32, formatting_to_u32, property_type_to_u8,
    ByteWriter,
};
use crate::signing::ComponentSigner;
use crate::Result;

/// Options for [`ComponentWriter`]. The default writes an unsigned file.
#[derive(Default)]
pub struct WriteOptions {
    pub signer: Option<ComponentSigner>,
}

/// Serializes descriptions into the binary container.
///
/// Output is deterministic for a given input: embedded icons are
/// assigned resource ids in encounter order and setters serialize in
/// name order.
pub struct ComponentWriter {
    options: WriteOptions,
}

/// Embedded resources collected while serializing descriptions.
#[derive(Default)]
struct ResourcePool {
    resources: Vec<BinaryResource>,
}

impl ResourcePool {
    fn add(&mut self, data: Vec<u8>) -> u32 {
        let id = self.resources.len() as u32;
        self.resources
            .push(BinaryResource::new(id, BinaryResourceType::PngImage, data));
        id
    }
}

impl ComponentWriter {
    pub fn new() -> Self {
        Self {
            options: WriteOptions::default(),
        }
    }

    pub fn with_options(options: WriteOptions) -> Self {
        Self { options }
    }

    pub fn write<W: Write>(
        &self,
        sink: &mut W,
        descriptions: &[ComponentDescription],
    ) -> Result<()> {
        let mut pool = ResourcePool::default();
        let mut content = ByteWriter::new();
        for description in descriptions {
            let payload = write_component(description, &mut pool)?;
            content.write_u16(ContentItemType::Component as u16);
            content.write_u32(payload.len() as u32);
            content.write_bytes(&payload);
        }
        for resource in &pool.resources {
            let mut payload = ByteWriter::new();
            payload.write_u32(resource.id);
            payload.write_u32(resource.resource_type.to_u32());
            payload.write_u32(resource.data.len() as u32);
            payload.write_bytes(&resource.data);
            let payload = payload.into_inner();
            content.write_u16(ContentItemType::Resource as u16);
            content.write_u32(payload.len() as u32);
            content.write_bytes(&payload);
        }
        let content = content.into_inner();

        let content_hash: [u8; 16] = Md5::digest(&content).into();
        let signature = match &self.options.signer {
            Some(signer) => Some((signer.sign(&content)?, signer.certificate().to_vec())),
            None => None,
        };

        // 8 magic + 1 version + 16 hash + 4 flags + 4 total + 4 offset
        // + 4 count + 1 signed
        let mut header_length = 42usize;
        if let Some((signature, certificate)) = &signature {
            header_length += 4 + signature.len() + 4 + certificate.len();
        }
        let item_count = descriptions.len() + pool.resources.len();

        let mut header = ByteWriter::new();
        header.write_bytes(&MAGIC);
        header.write_u8(FORMAT_VERSION);
        header.write_bytes(&content_hash);
        header.write_u32(0); // reserved flags
        header.write_u32((header_length + content.len()) as u32);
        header.write_u32(header_length as u32);
        header.write_u32(item_count as u32);
        match &signature {
            Some((signature, certificate)) => {
                header.write_bool(true);
                header.write_u32(signature.len() as u32);
                header.write_bytes(signature);
                header.write_u32(certificate.len() as u32);
                header.write_bytes(certificate);
            }
            None => header.write_bool(false),
        }

        sink.write_all(header.as_slice())?;
        sink.write_all(&content)?;
        Ok(())
    }
}

impl Default for ComponentWriter {
    fn default() -> Self {
        Self::new()
    }
}

/// Serialize descriptions to a file on disk.
pub fn save_component_file(
    path: impl AsRef<Path>,
    descriptions: &[ComponentDescription],
    options: WriteOptions,
) -> Result<()> {
    let mut file = File::create(path)?;
    ComponentWriter::with_options(options).write(&mut file, descriptions)
}

fn write_component(description: &ComponentDescription, pool: &mut ResourcePool) -> Result<Vec<u8>> {
    // Icons get their resource ids here so the metadata and
    // configuration sections can refer to them.
    let icon_resource = allocate_icon(
        description.metadata.icon.as_ref().map(|i| &i.data),
        description.metadata.icon_resource_id,
        pool,
    );
    let configuration_icons: Vec<i32> = description
        .metadata
        .configurations
        .iter()
        .map(|configuration| {
            allocate_icon(
                configuration.icon.as_ref().map(|i| &i.data),
                configuration.icon_resource_id,
                pool,
            )
        })
        .collect();

    let sections = [
        (
            SectionType::Metadata,
            write_metadata(description, icon_resource)?,
        ),
        (SectionType::Flags, write_flags(description)),
        (SectionType::Properties, write_properties(description)),
        (
            SectionType::Configurations,
            write_configurations(description, &configuration_icons),
        ),
        (SectionType::Connections, write_connections(description)),
        (SectionType::Render, write_render(description)),
    ];

    let mut payload = ByteWriter::new();
    payload.write_u32(description.id);
    payload.write_u32(sections.len() as u32);
    for (section_type, body) in sections {
        payload.write_u16(section_type as u16);
        payload.write_u32(body.len() as u32);
        payload.write_bytes(&body);
    }
    Ok(payload.into_inner())
}

fn allocate_icon(data: Option<&Vec<u8>>, pending_id: Option<u32>, pool: &mut ResourcePool) -> i32 {
    match data {
        Some(data) => pool.add(data.clone()) as i32,
        None => {
            if pending_id.is_some() {
                tracing::warn!("dropping icon reference with no attached data");
            }
            -1
        }
    }
}

fn write_metadata(description: &ComponentDescription, icon_resource: i32) -> Result<Vec<u8>> {
    let flags = description.default_flags();
    let metadata = &description.metadata;

    let mut body = ByteWriter::new();
    body.write_string(&description.component_name);
    body.write_bool(!flags.contains(FlagOptions::NO_RESIZE));
    body.write_bool(flags.contains(FlagOptions::FLIP_PRIMARY));
    body.write_f64(description.min_size);
    body.write_bytes(&metadata.guid.to_bytes_le());
    body.write_string(&metadata.author);
    body.write_u16(metadata.version.major);
    body.write_u16(metadata.version.minor);
    body.write_string(&metadata.additional_information);
    body.write_string(&metadata.implement_set);
    body.write_string(&metadata.implement_item);
    body.write_i32(icon_resource);
    body.write_i64(datetime_to_ticks(&metadata.created)?);
    Ok(body.into_inner())
}

fn write_flags(description: &ComponentDescription) -> Vec<u8> {
    let mut body = ByteWriter::new();
    body.write_u32(description.flags.len() as u32);
    for group in &description.flags {
        write_conditions(&mut body, &group.conditions);
        body.write_u32(group.value.bits());
    }
    body.into_inner()
}

fn write_properties(description: &ComponentDescription) -> Vec<u8> {
    let mut body = ByteWriter::new();
    body.write_u32(description.properties.len() as u32);
    for property in &description.properties {
        write_property(&mut body, property);
    }
    body.into_inner()
}

fn write_property(body: &mut ByteWriter, property: &ComponentProperty) {
    body.write_string(&property.name);
    body.write_string(&property.serialized_name);
    body.write_string(&property.display_name);
    body.write_u8(property_type_to_u8(property.kind));
    body.write_tagged_value(&property.default);
    if property.kind == PropertyType::Enumeration {
        body.write_i32(property.enum_options.len() as i32);
        for option in &property.enum_options {
            body.write_string(option);
        }
    }
    body.write_u32(property.format_rules.len() as u32);
    for rule in &property.format_rules {
        write_conditions(body, &rule.conditions);
        body.write_string(&rule.format);
    }
    body.write_u32(property.other_conditions.len() as u32);
    for (other_type, conditions) in &property.other_conditions {
        body.write_u32(other_type.0);
        write_conditions(body, conditions);
    }
}

fn write_configurations(description: &ComponentDescription, icons: &[i32]) -> Vec<u8> {
    let configurations = &description.metadata.configurations;
    let mut body = ByteWriter::new();
    body.write_u32(configurations.len() as u32);
    for (index, configuration) in configurations.iter().enumerate() {
        body.write_string(&configuration.name);
        body.write_string(configuration.implementation_name.as_deref().unwrap_or(""));
        body.write_i32(configuration.setters.len() as i32);
        for (name, value) in &configuration.setters {
            body.write_string(serialized_setter_name(description, name));
            body.write_tagged_value(value);
        }
        body.write_i32(icons.get(index).copied().unwrap_or(-1));
    }
    body.into_inner()
}

fn write_connections(description: &ComponentDescription) -> Vec<u8> {
    let mut body = ByteWriter::new();
    body.write_u32(description.connections.len() as u32);
    for group in &description.connections {
        write_conditions(&mut body, &group.conditions);
        body.write_u32(group.connections.len() as u32);
        for connection in &group.connections {
            body.write_point(&connection.start);
            body.write_point(&connection.end);
            body.write_i32(edge_to_i32(connection.edge));
            body.write_string(&connection.name);
        }
    }
    body.into_inner()
}

fn write_render(description: &ComponentDescription) -> Vec<u8> {
    let mut body = ByteWriter::new();
    body.write_u32(description.render_descriptions.len() as u32);
    for group in &description.render_descriptions {
        write_conditions(&mut body, &group.conditions);
        body.write_u32(group.commands.len() as u32);
        for command in &group.commands {
            write_render_command(&mut body, command);
        }
    }
    body.into_inner()
}

fn write_render_command(body: &mut ByteWriter, command: &RenderCommand) {
    match command {
        RenderCommand::Line {
            start,
            end,
            thickness,
        } => {
            body.write_u32(RenderCommandType::Line as u32);
            body.write_point(start);
            body.write_point(end);
            body.write_f64(*thickness);
        }
        RenderCommand::Rectangle {
            location,
            width,
            height,
            thickness,
            fill,
        } => {
            body.write_u32(RenderCommandType::Rectangle as u32);
            body.write_point(location);
            body.write_f64(*width);
            body.write_f64(*height);
            body.write_f64(*thickness);
            body.write_u32(u32::from(*fill));
        }
        RenderCommand::Ellipse {
            centre,
            radius_x,
            radius_y,
            thickness,
            fill,
        } => {
            body.write_u32(RenderCommandType::Ellipse as u32);
            body.write_point(centre);
            body.write_f64(*radius_x);
            body.write_f64(*radius_y);
            body.write_f64(*thickness);
            body.write_u32(u32::from(*fill));
        }
        RenderCommand::Path {
            start,
            thickness,
            fill,
            commands,
        } => {
            body.write_u32(RenderCommandType::Path as u32);
            body.write_point(start);
            body.write_f64(*thickness);
            body.write_u32(u32::from(*fill));
            body.write_i32(commands.len() as i32);
            for command in commands {
                write_path_command(body, command);
            }
        }
        RenderCommand::Text {
            location,
            alignment,
            runs,
        } => {
            body.write_u32(RenderCommandType::Text as u32);
            body.write_u8(FORMATTED_TEXT_VERSION);
            body.write_point(location);
            body.write_u32(alignment_to_u32(*alignment));
            body.write_u32(runs.len() as u32);
            for run in runs {
                body.write_u32(formatting_to_u32(run.formatting));
                body.write_f64(run.size);
                body.write_string(&run.text);
            }
        }
    }
}

fn write_path_command(body: &mut ByteWriter, command: &PathCommand) {
    match command {
        PathCommand::MoveTo { to } => {
            body.write_i32(0);
            body.write_dvec2(*to);
        }
        PathCommand::LineTo { to } => {
            body.write_i32(1);
            body.write_dvec2(*to);
        }
        PathCommand::CurveTo {
            control_start,
            control_end,
            to,
        } => {
            body.write_i32(2);
            body.write_dvec2(*control_start);
            body.write_dvec2(*control_end);
            body.write_dvec2(*to);
        }
        PathCommand::EllipticalArcTo {
            radii,
            rotation,
            is_large_arc,
            sweep,
            to,
        } => {
            body.write_i32(3);
            body.write_dvec2(*radii);
            body.write_f64(*rotation);
            body.write_bool(*is_large_arc);
            body.write_bool(*sweep == SweepDirection::Clockwise);
            body.write_dvec2(*to);
        }
        PathCommand::QuadraticBezierCurveTo { control, to } => {
            body.write_i32(4);
            body.write_dvec2(*control);
            body.write_dvec2(*to);
        }
        PathCommand::SmoothCurveTo { control_end, to } => {
            body.write_i32(5);
            body.write_dvec2(*control_end);
            body.write_dvec2(*to);
        }
        PathCommand::SmoothQuadraticBezierCurveTo { to } => {
            body.write_i32(6);
            body.write_dvec2(*to);
        }
        PathCommand::ClosePath => {
            body.write_i32(7);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ComponentReader;
    use cdcom_core::{ComponentIcon, ConditionTree};

    fn basic_description() -> ComponentDescription {
        let mut description = ComponentDescription::new(0, "Wire");
        description.min_size = 20.0;
        description.metadata.author = String::from("Circuit Diagram");
        description
    }

    #[test]
    fn test_written_file_parses() {
        let description = basic_description();
        let mut buffer = Vec::new();
        ComponentWriter::new()
            .write(&mut buffer, std::slice::from_ref(&description))
            .unwrap();

        let file = ComponentReader::new(&buffer).parse().unwrap();
        assert_eq!(file.header.version, FORMAT_VERSION);
        assert_eq!(file.header.item_count, 1);
        assert_eq!(file.header.data_offset, 42);
        assert_eq!(file.header.total_length as usize, buffer.len());
        assert_eq!(file.descriptions[0].component_name, "Wire");
        assert_eq!(file.descriptions[0].min_size, 20.0);
    }

    #[test]
    fn test_output_is_deterministic() {
        let description = basic_description();
        let mut first = Vec::new();
        let mut second = Vec::new();
        let writer = ComponentWriter::new();
        writer
            .write(&mut first, std::slice::from_ref(&description))
            .unwrap();
        writer
            .write(&mut second, std::slice::from_ref(&description))
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_resize_flag_round_trips_through_metadata() {
        let mut description = basic_description();
        description.set_default_flag(FlagOptions::NO_RESIZE, true);

        let mut buffer = Vec::new();
        ComponentWriter::new()
            .write(&mut buffer, std::slice::from_ref(&description))
            .unwrap();

        let file = ComponentReader::new(&buffer).parse().unwrap();
        assert!(file.descriptions[0]
            .default_flags()
            .contains(FlagOptions::NO_RESIZE));
    }

    #[test]
    fn test_icon_becomes_resource_item() {
        let mut description = basic_description();
        description.metadata.icon = Some(ComponentIcon::new(
            vec![0x89, b'P', b'N', b'G'],
            BinaryResourceType::PngImage,
        ));

        let mut buffer = Vec::new();
        ComponentWriter::new()
            .write(&mut buffer, std::slice::from_ref(&description))
            .unwrap();

        let mut file = ComponentReader::new(&buffer).parse().unwrap();
        assert_eq!(file.header.item_count, 2);
        assert_eq!(file.resources.len(), 1);
        assert_eq!(file.descriptions[0].metadata.icon_resource_id, Some(0));

        file.attach_icons();
        let icon = file.descriptions[0].metadata.icon.as_ref().unwrap();
        assert_eq!(icon.data, vec![0x89, b'P', b'N', b'G']);
    }

    #[test]
    fn test_pending_icon_reference_without_data_writes_none() {
        let mut description = basic_description();
        description.metadata.icon_resource_id = Some(4);

        let mut buffer = Vec::new();
        ComponentWriter::new()
            .write(&mut buffer, std::slice::from_ref(&description))
            .unwrap();

        let file = ComponentReader::new(&buffer).parse().unwrap();
        assert_eq!(file.header.item_count, 1);
        assert_eq!(file.descriptions[0].metadata.icon_resource_id, None);
    }

    #[test]
    fn test_empty_conditions_write_as_empty_node() {
        let mut description = basic_description();
        description
            .flags
            .push(cdcom_core::ComponentFlagGroup::new(
                ConditionTree::Empty,
                FlagOptions::FLIP_PRIMARY,
            ));

        let mut buffer = Vec::new();
        ComponentWriter::new()
            .write(&mut buffer, std::slice::from_ref(&description))
            .unwrap();

        let file = ComponentReader::new(&buffer).parse().unwrap();
        assert_eq!(file.descriptions[0].flags.len(), 1);
        assert!(file.descriptions[0].flags[0].conditions.is_empty());
    }
}
