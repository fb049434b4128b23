pub mod delay;
pub mod envelope;
pub mod peaks;

pub use delay::estimate_delays;
pub use envelope::extract_envelope;
pub use peaks::{detect_peaks, Inversion, MAX_HEART_RATE, MIN_HEART_RATE};
