//! Grid model: coordinates, directions, sections and the dense section array.
pub mod dense;
pub mod point;
pub mod section;

pub use dense::Grid;
pub use point::{Direction, Point};
pub use section::GridSection;
