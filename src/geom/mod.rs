mod bbox;
mod footprint;
mod index;

pub use footprint::Footprint;
pub use index::{FootprintIndex, Neighbors};
