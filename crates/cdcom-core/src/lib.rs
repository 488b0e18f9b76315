// crates/cdcom-core/src/lib.rs
pub mod property;
pub mod condition;
pub mod point;
pub mod path;
pub mod render;
pub mod connection;
pub mod description;
pub mod resources;

pub use property::*;
pub use condition::*;
pub use point::*;
pub use path::*;
pub use render::*;
pub use connection::*;
pub use description::*;
pub use resources::*;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValueError {
    #[error("Not a valid numeric value: {0}")]
    InvalidNumeric(String),

    #[error("Not a valid integer value: {0}")]
    InvalidInteger(String),

    #[error("Not a valid boolean value: {0}")]
    InvalidBoolean(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("Unknown variable: {0}")]
    UnknownVariable(String),

    #[error("Comparison {comparison:?} is not supported for variable '{variable}'")]
    UnsupportedComparison {
        variable: String,
        comparison: condition::ConditionComparison,
    },
}
