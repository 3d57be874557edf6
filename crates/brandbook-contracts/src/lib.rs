pub mod events;
pub mod guideline;
pub mod locales;
pub mod render;
pub mod store;
pub mod synth;
