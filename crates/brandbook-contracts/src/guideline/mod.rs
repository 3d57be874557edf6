mod normalize;
mod partial;
mod rules;

pub use normalize::normalize;
pub use partial::{
    PartialGuideline, PartialImageCategory, PartialPalette, PartialProducerNotes,
    PartialStyleDirection,
};
pub use rules::{ImageCategory, Palette, ProducerNotes, StyleDirection, VisualGuideRules};
