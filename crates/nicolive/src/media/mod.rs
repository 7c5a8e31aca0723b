pub mod quality;
pub mod variant;

pub use quality::Quality;
pub use variant::{Track, Variant};
