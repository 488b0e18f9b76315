// crates/cdcom-core/src/description.rs
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use bitflags::bitflags;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::condition::{ConditionContext, ConditionTree};
use crate::connection::ConnectionGroup;
use crate::property::{ComponentProperty, PropertyValue};
use crate::render::RenderGroup;
use crate::resources::ComponentIcon;
use crate::EvalError;

bitflags! {
    /// Behaviour flags for a component description. Unknown bits read
    /// from a file are retained and written back out.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FlagOptions: u32 {
        const FLIP_PRIMARY = 1;
        const NO_RESIZE = 2;
        const HORIZONTAL_ONLY = 4;
        const VERTICAL_ONLY = 8;
        const MIDDLE_MUST_ALIGN = 16;
    }
}

// bitflags does not implement serde on generated types; delegate to its
// flag-aware helpers so names round-trip instead of raw bits.
impl Serialize for FlagOptions {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        bitflags::serde::serialize(self, serializer)
    }
}

impl<'de> Deserialize<'de> for FlagOptions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        bitflags::serde::deserialize(deserializer)
    }
}

/// Flags active while their conditions hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentFlagGroup {
    pub conditions: ConditionTree,
    pub value: FlagOptions,
}

impl ComponentFlagGroup {
    pub fn new(conditions: ConditionTree, value: FlagOptions) -> Self {
        Self { conditions, value }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ComponentVersion {
    pub major: u16,
    pub minor: u16,
}

impl ComponentVersion {
    pub fn new(major: u16, minor: u16) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for ComponentVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Where a description was loaded from. Runtime provenance, not part
/// of the wire format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DescriptionLocation {
    Embedded,
    Installed,
}

/// Outcome of reading a signed file. Populated by the reader only; the
/// writer produces signatures from its own options and never consults
/// this.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DescriptionSignature {
    /// DER-encoded X.509 certificate embedded in the file.
    pub certificate: Vec<u8>,
    /// Whether the signature verified against the certificate's key.
    pub is_valid: bool,
    /// Whether the certificate chains to a trusted root.
    pub is_trusted: bool,
}

/// A named preset of property values, optionally with its own icon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentConfiguration {
    pub name: String,
    pub implementation_name: Option<String>,
    /// Property values to apply, keyed by property name.
    pub setters: BTreeMap<String, PropertyValue>,
    pub icon: Option<ComponentIcon>,
    /// Resource id of a not-yet-attached icon; cleared by
    /// [`ComponentDescription::set_icons`].
    pub icon_resource_id: Option<u32>,
}

impl ComponentConfiguration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            implementation_name: None,
            setters: BTreeMap::new(),
            icon: None,
            icon_resource_id: None,
        }
    }

    pub fn with_implementation_name(mut self, name: impl Into<String>) -> Self {
        self.implementation_name = Some(name.into());
        self
    }

    pub fn with_setter(mut self, property: impl Into<String>, value: PropertyValue) -> Self {
        self.setters.insert(property.into(), value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDescriptionMetadata {
    pub guid: Uuid,
    pub author: String,
    pub version: ComponentVersion,
    pub additional_information: String,
    /// Standard set this description implements, e.g. "wires".
    pub implement_set: String,
    /// Item within the implement set.
    pub implement_item: String,
    pub created: DateTime<Utc>,
    pub configurations: Vec<ComponentConfiguration>,
    pub icon: Option<ComponentIcon>,
    pub icon_resource_id: Option<u32>,
    pub location: DescriptionLocation,
    pub signature: Option<DescriptionSignature>,
}

impl Default for ComponentDescriptionMetadata {
    fn default() -> Self {
        Self {
            guid: Uuid::nil(),
            author: String::new(),
            version: ComponentVersion::default(),
            additional_information: String::new(),
            implement_set: String::new(),
            implement_item: String::new(),
            created: DateTime::<Utc>::UNIX_EPOCH,
            configurations: Vec::new(),
            icon: None,
            icon_resource_id: None,
            location: DescriptionLocation::Installed,
            signature: None,
        }
    }
}

/// A reusable circuit symbol definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDescription {
    /// Numeric id within the containing file.
    pub id: u32,
    pub component_name: String,
    pub min_size: f64,
    pub properties: Vec<ComponentProperty>,
    pub connections: Vec<ConnectionGroup>,
    pub render_descriptions: Vec<RenderGroup>,
    pub flags: Vec<ComponentFlagGroup>,
    pub metadata: ComponentDescriptionMetadata,
}

impl ComponentDescription {
    pub fn new(id: u32, component_name: impl Into<String>) -> Self {
        Self {
            id,
            component_name: component_name.into(),
            min_size: 0.0,
            properties: Vec::new(),
            connections: Vec::new(),
            render_descriptions: Vec::new(),
            flags: Vec::new(),
            metadata: ComponentDescriptionMetadata::default(),
        }
    }

    pub fn property(&self, name: &str) -> Option<&ComponentProperty> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn property_by_serialized_name(&self, serialized_name: &str) -> Option<&ComponentProperty> {
        self.properties
            .iter()
            .find(|p| p.serialized_name == serialized_name)
    }

    /// Flags that apply unconditionally, i.e. the value of the group
    /// with empty conditions.
    pub fn default_flags(&self) -> FlagOptions {
        self.flags
            .iter()
            .find(|group| group.conditions.is_empty())
            .map(|group| group.value)
            .unwrap_or_else(FlagOptions::empty)
    }

    /// Union of every flag group whose conditions hold for the given
    /// instance.
    pub fn flags_for(&self, context: &dyn ConditionContext) -> Result<FlagOptions, EvalError> {
        let mut flags = FlagOptions::empty();
        for group in &self.flags {
            if group.conditions.evaluate(context)? {
                flags |= group.value;
            }
        }
        Ok(flags)
    }

    /// Set or clear a flag in the unconditional group, creating that
    /// group if the description has none.
    pub fn set_default_flag(&mut self, flag: FlagOptions, enabled: bool) {
        if let Some(group) = self.flags.iter_mut().find(|g| g.conditions.is_empty()) {
            group.value.set(flag, enabled);
            return;
        }
        let mut value = FlagOptions::empty();
        value.set(flag, enabled);
        self.flags.push(ComponentFlagGroup {
            conditions: ConditionTree::Empty,
            value,
        });
    }

    /// Attach icons for any pending resource references. References
    /// with no matching resource stay pending so that a later call can
    /// still resolve them.
    pub fn set_icons(&mut self, icons: &HashMap<u32, ComponentIcon>) {
        if let Some(id) = self.metadata.icon_resource_id {
            match icons.get(&id) {
                Some(icon) => {
                    self.metadata.icon = Some(icon.clone());
                    self.metadata.icon_resource_id = None;
                }
                None => {
                    tracing::warn!(
                        "no resource {} for icon of component '{}'",
                        id,
                        self.component_name
                    );
                }
            }
        }

        for configuration in &mut self.metadata.configurations {
            if let Some(id) = configuration.icon_resource_id {
                match icons.get(&id) {
                    Some(icon) => {
                        configuration.icon = Some(icon.clone());
                        configuration.icon_resource_id = None;
                    }
                    None => {
                        tracing::warn!(
                            "no resource {} for icon of configuration '{}'",
                            id,
                            configuration.name
                        );
                    }
                }
            }
        }
    }
}

/// Setter-key translation used when configurations are serialized:
/// setters are keyed by property name in memory and by serialized name
/// on the wire. Unmatched keys pass through unchanged.
pub fn serialized_setter_name<'a>(
    description: &'a ComponentDescription,
    property_name: &'a str,
) -> &'a str {
    match description.property(property_name) {
        Some(property) => &property.serialized_name,
        None => property_name,
    }
}
