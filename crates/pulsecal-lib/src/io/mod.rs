pub mod edf;
pub mod text;
