// crates/cdcom-core/src/connection.rs
use serde::{Deserialize, Serialize};

use crate::condition::ConditionTree;
use crate::point::ComponentPoint;

/// Which ends of a connection run are edge connections, i.e. may join
/// wires end to end rather than crossing them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionEdge {
    None,
    Start,
    End,
    Both,
}

impl Default for ConnectionEdge {
    fn default() -> Self {
        ConnectionEdge::None
    }
}

/// A run of connection points between two resolved locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionDescription {
    pub start: ComponentPoint,
    pub end: ComponentPoint,
    pub edge: ConnectionEdge,
    pub name: String,
}

impl ConnectionDescription {
    pub fn new(
        start: ComponentPoint,
        end: ComponentPoint,
        edge: ConnectionEdge,
        name: impl Into<String>,
    ) -> Self {
        Self {
            start,
            end,
            edge,
            name: name.into(),
        }
    }
}

/// Connections active while their conditions hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionGroup {
    pub conditions: ConditionTree,
    pub connections: Vec<ConnectionDescription>,
}

impl ConnectionGroup {
    pub fn new(conditions: ConditionTree, connections: Vec<ConnectionDescription>) -> Self {
        Self {
            conditions,
            connections,
        }
    }
}
