//! # Coordinates
//!
//! One `x y [z]` line per locally owned vertex, in vertex-id order.

use std::io::Write;

use crate::gens::{Coordinates, Graph};

use super::{GraphWriter, WriterRequirements};

/// Writer for per-vertex coordinate lines.
#[derive(Debug, Clone, Copy, Default)]
pub struct CoordinatesWriter;

impl GraphWriter for CoordinatesWriter {
    fn extension(&self) -> &'static str {
        "xyz"
    }

    fn requirements(&self) -> WriterRequirements {
        WriterRequirements::COORDINATES_2D | WriterRequirements::COORDINATES_3D
    }

    fn append_body(&self, out: &mut dyn Write, graph: &Graph) -> std::io::Result<()> {
        match &graph.coordinates {
            Coordinates::None => {}
            Coordinates::TwoD(coords) => {
                for [x, y] in coords {
                    writeln!(out, "{x} {y}")?;
                }
            }
            Coordinates::ThreeD(coords) => {
                for [x, y, z] in coords {
                    writeln!(out, "{x} {y} {z}")?;
                }
            }
        }
        Ok(())
    }
}
