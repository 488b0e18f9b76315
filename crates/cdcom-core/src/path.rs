//! Path drawing commands and smooth-segment resolution.
//!
//! Paths are stored exactly as authored, including the smooth curve
//! shorthands. [`resolve_smooth`] expands the shorthands into explicit
//! curves for consumers that cannot chain control points themselves.

use glam::DVec2;
use serde::{Deserialize, Serialize};

/// Direction of travel for an elliptical arc.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SweepDirection {
    Counterclockwise,
    Clockwise,
}

impl Default for SweepDirection {
    fn default() -> Self {
        SweepDirection::Counterclockwise
    }
}

/// One command in a path. Coordinates are relative to the path's start
/// point.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PathCommand {
    MoveTo {
        to: DVec2,
    },
    LineTo {
        to: DVec2,
    },
    CurveTo {
        control_start: DVec2,
        control_end: DVec2,
        to: DVec2,
    },
    EllipticalArcTo {
        radii: DVec2,
        rotation: f64,
        is_large_arc: bool,
        sweep: SweepDirection,
        to: DVec2,
    },
    QuadraticBezierCurveTo {
        control: DVec2,
        to: DVec2,
    },
    /// Cubic curve whose first control point is the reflection of the
    /// previous cubic's second control point.
    SmoothCurveTo {
        control_end: DVec2,
        to: DVec2,
    },
    /// Quadratic curve whose control point is the reflection of the
    /// previous quadratic's control point.
    SmoothQuadraticBezierCurveTo {
        to: DVec2,
    },
    ClosePath,
}

impl PathCommand {
    /// End point of this command, if it moves the pen.
    pub fn end_point(&self) -> Option<DVec2> {
        match self {
            PathCommand::MoveTo { to }
            | PathCommand::LineTo { to }
            | PathCommand::CurveTo { to, .. }
            | PathCommand::EllipticalArcTo { to, .. }
            | PathCommand::QuadraticBezierCurveTo { to, .. }
            | PathCommand::SmoothCurveTo { to, .. }
            | PathCommand::SmoothQuadraticBezierCurveTo { to } => Some(*to),
            PathCommand::ClosePath => None,
        }
    }
}

/// Expand smooth curve shorthands into explicit commands.
///
/// A smooth cubic following a cubic reflects that curve's second
/// control point through the current point; without a preceding cubic
/// its first control point is the current point itself. A smooth
/// quadratic following a quadratic reflects its control point; without
/// a preceding quadratic it degrades to a straight line. The output
/// contains no smooth variants.
pub fn resolve_smooth(commands: &[PathCommand]) -> Vec<PathCommand> {
    let mut resolved = Vec::with_capacity(commands.len());
    let mut current = DVec2::ZERO;
    let mut subpath_start = DVec2::ZERO;
    let mut last_cubic_control: Option<DVec2> = None;
    let mut last_quadratic_control: Option<DVec2> = None;

    for command in commands {
        match command {
            PathCommand::MoveTo { to } => {
                current = *to;
                subpath_start = *to;
                last_cubic_control = None;
                last_quadratic_control = None;
                resolved.push(command.clone());
            }
            PathCommand::LineTo { to } | PathCommand::EllipticalArcTo { to, .. } => {
                current = *to;
                last_cubic_control = None;
                last_quadratic_control = None;
                resolved.push(command.clone());
            }
            PathCommand::CurveTo {
                control_end, to, ..
            } => {
                last_cubic_control = Some(*control_end);
                last_quadratic_control = None;
                current = *to;
                resolved.push(command.clone());
            }
            PathCommand::QuadraticBezierCurveTo { control, to } => {
                last_quadratic_control = Some(*control);
                last_cubic_control = None;
                current = *to;
                resolved.push(command.clone());
            }
            PathCommand::SmoothCurveTo { control_end, to } => {
                let control_start = match last_cubic_control {
                    Some(previous) => 2.0 * current - previous,
                    None => current,
                };
                resolved.push(PathCommand::CurveTo {
                    control_start,
                    control_end: *control_end,
                    to: *to,
                });
                last_cubic_control = Some(*control_end);
                last_quadratic_control = None;
                current = *to;
            }
            PathCommand::SmoothQuadraticBezierCurveTo { to } => {
                match last_quadratic_control {
                    Some(previous) => {
                        let control = 2.0 * current - previous;
                        resolved.push(PathCommand::QuadraticBezierCurveTo {
                            control,
                            to: *to,
                        });
                        last_quadratic_control = Some(control);
                    }
                    None => {
                        resolved.push(PathCommand::LineTo { to: *to });
                        last_quadratic_control = None;
                    }
                }
                last_cubic_control = None;
                current = *to;
            }
            PathCommand::ClosePath => {
                current = subpath_start;
                last_cubic_control = None;
                last_quadratic_control = None;
                resolved.push(PathCommand::ClosePath);
            }
        }
    }

    resolved
}
