// crates/cdcom-core/src/render.rs
use serde::{Deserialize, Serialize};

use crate::condition::ConditionTree;
use crate::path::PathCommand;
use crate::point::ComponentPoint;

/// Where rendered text hangs off its location point. Row by row from
/// the top left, matching the wire encoding 0 through 8.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextAlignment {
    TopLeft,
    TopCentre,
    TopRight,
    CentreLeft,
    CentreCentre,
    CentreRight,
    BottomLeft,
    BottomCentre,
    BottomRight,
}

impl Default for TextAlignment {
    fn default() -> Self {
        TextAlignment::TopLeft
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TextRunFormatting {
    Normal,
    Subscript,
    Superscript,
}

/// A contiguous run of text sharing one formatting and size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    pub text: String,
    pub formatting: TextRunFormatting,
    pub size: f64,
}

impl TextRun {
    pub fn new(text: impl Into<String>, formatting: TextRunFormatting, size: f64) -> Self {
        Self {
            text: text.into(),
            formatting,
            size,
        }
    }
}

/// A single drawing instruction. The set is closed; consumers match
/// exhaustively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RenderCommand {
    Line {
        start: ComponentPoint,
        end: ComponentPoint,
        thickness: f64,
    },
    Rectangle {
        location: ComponentPoint,
        width: f64,
        height: f64,
        thickness: f64,
        fill: bool,
    },
    Ellipse {
        centre: ComponentPoint,
        radius_x: f64,
        radius_y: f64,
        thickness: f64,
        fill: bool,
    },
    Path {
        start: ComponentPoint,
        thickness: f64,
        fill: bool,
        commands: Vec<PathCommand>,
    },
    Text {
        location: ComponentPoint,
        alignment: TextAlignment,
        runs: Vec<TextRun>,
    },
}

/// A group of drawing instructions active while its conditions hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderGroup {
    pub conditions: ConditionTree,
    pub commands: Vec<RenderCommand>,
}

impl RenderGroup {
    pub fn new(conditions: ConditionTree, commands: Vec<RenderCommand>) -> Self {
        Self {
            conditions,
            commands,
        }
    }

    /// Unconditional group, active for every instance.
    pub fn always(commands: Vec<RenderCommand>) -> Self {
        Self {
            conditions: ConditionTree::Empty,
            commands,
        }
    }
}
