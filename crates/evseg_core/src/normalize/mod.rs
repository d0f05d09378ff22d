pub mod text;

pub use text::{normalize, SECTION_NOT_FOUND};
