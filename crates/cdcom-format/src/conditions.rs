// crates/cdcom-format/src/conditions.rs
use cdcom_core::{BinaryOperator, ConditionComparison, ConditionLeaf, ConditionTree, VariableSource};

use crate::io::{ByteReader, ByteWriter};
use crate::{FormatError, Result};

const NODE_LEAF: u8 = 0;
const NODE_BINARY: u8 = 1;
const NODE_EMPTY: u8 = 2;

const OP_AND: u8 = 0;
const OP_OR: u8 = 1;

const SOURCE_PROPERTY: u8 = 0;
const SOURCE_STATE: u8 = 1;

// Decode bound on tree depth and legacy list length. A deeper stream
// fails as corrupt data instead of exhausting the stack.
const MAX_TREE_DEPTH: u32 = 64;

/// Decode one condition collection. Files at version 1 and below store
/// a flat list of leaves combined with an implicit AND; later versions
/// store a full tree. This is the only place the two encodings are
/// told apart.
pub fn read_conditions(reader: &mut ByteReader<'_>, version: u8) -> Result<ConditionTree> {
    if version > 1 {
        read_tree(reader)
    } else {
        read_legacy_list(reader)
    }
}

/// Encode a condition tree in the current encoding.
pub fn write_conditions(writer: &mut ByteWriter, tree: &ConditionTree) {
    match tree {
        ConditionTree::Empty => writer.write_u8(NODE_EMPTY),
        ConditionTree::Leaf(leaf) => {
            writer.write_u8(NODE_LEAF);
            write_leaf(writer, leaf);
        }
        ConditionTree::Binary { op, left, right } => {
            writer.write_u8(NODE_BINARY);
            writer.write_u8(match op {
                BinaryOperator::And => OP_AND,
                BinaryOperator::Or => OP_OR,
            });
            write_conditions(writer, left);
            write_conditions(writer, right);
        }
    }
}

fn read_tree(reader: &mut ByteReader<'_>) -> Result<ConditionTree> {
    read_tree_bounded(reader, MAX_TREE_DEPTH)
}

fn read_tree_bounded(reader: &mut ByteReader<'_>, depth: u32) -> Result<ConditionTree> {
    if depth == 0 {
        return Err(FormatError::InvalidData(format!(
            "condition tree deeper than {} levels",
            MAX_TREE_DEPTH
        )));
    }
    match reader.read_u8()? {
        NODE_EMPTY => Ok(ConditionTree::Empty),
        NODE_LEAF => Ok(ConditionTree::Leaf(read_leaf(reader)?)),
        NODE_BINARY => {
            let op = match reader.read_u8()? {
                OP_AND => BinaryOperator::And,
                OP_OR => BinaryOperator::Or,
                other => {
                    return Err(FormatError::InvalidData(format!(
                        "unknown condition operator {}",
                        other
                    )))
                }
            };
            let left = read_tree_bounded(reader, depth - 1)?;
            let right = read_tree_bounded(reader, depth - 1)?;
            Ok(ConditionTree::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            })
        }
        other => Err(FormatError::InvalidData(format!(
            "unknown condition node {}",
            other
        ))),
    }
}

/// A zero-length legacy list decodes to `Empty`; otherwise the leaves
/// fold left into nested ANDs.
fn read_legacy_list(reader: &mut ByteReader<'_>) -> Result<ConditionTree> {
    let count = reader.read_u32()?;
    if count > MAX_TREE_DEPTH {
        return Err(FormatError::InvalidData(format!(
            "condition list longer than {} entries",
            MAX_TREE_DEPTH
        )));
    }
    if count == 0 {
        return Ok(ConditionTree::Empty);
    }
    let mut tree = ConditionTree::Leaf(read_leaf(reader)?);
    for _ in 1..count {
        let leaf = ConditionTree::Leaf(read_leaf(reader)?);
        tree = ConditionTree::and(tree, leaf);
    }
    Ok(tree)
}

fn read_leaf(reader: &mut ByteReader<'_>) -> Result<ConditionLeaf> {
    let source = match reader.read_u8()? {
        SOURCE_PROPERTY => VariableSource::Property,
        SOURCE_STATE => VariableSource::State,
        other => {
            return Err(FormatError::InvalidData(format!(
                "unknown variable source {}",
                other
            )))
        }
    };
    let comparison = comparison_from_u8(reader.read_u8()?)?;
    let variable = reader.read_string()?;
    let operand = reader.read_tagged_value()?;
    Ok(ConditionLeaf {
        source,
        variable,
        comparison,
        operand,
    })
}

fn write_leaf(writer: &mut ByteWriter, leaf: &ConditionLeaf) {
    writer.write_u8(match leaf.source {
        VariableSource::Property => SOURCE_PROPERTY,
        VariableSource::State => SOURCE_STATE,
    });
    writer.write_u8(comparison_to_u8(leaf.comparison));
    writer.write_string(&leaf.variable);
    writer.write_tagged_value(&leaf.operand);
}

fn comparison_to_u8(comparison: ConditionComparison) -> u8 {
    match comparison {
        ConditionComparison::Equal => 0,
        ConditionComparison::NotEqual => 1,
        ConditionComparison::GreaterThan => 2,
        ConditionComparison::LessThan => 3,
        ConditionComparison::GreaterThanOrEqual => 4,
        ConditionComparison::LessThanOrEqual => 5,
        ConditionComparison::Truthy => 6,
        ConditionComparison::Falsy => 7,
    }
}

fn comparison_from_u8(value: u8) -> Result<ConditionComparison> {
    match value {
        0 => Ok(ConditionComparison::Equal),
        1 => Ok(ConditionComparison::NotEqual),
        2 => Ok(ConditionComparison::GreaterThan),
        3 => Ok(ConditionComparison::LessThan),
        4 => Ok(ConditionComparison::GreaterThanOrEqual),
        5 => Ok(ConditionComparison::LessThanOrEqual),
        6 => Ok(ConditionComparison::Truthy),
        7 => Ok(ConditionComparison::Falsy),
        other => Err(FormatError::InvalidData(format!(
            "unknown comparison {}",
            other
        ))),
    }
}
