pub mod engine;
pub mod least_squares;

pub use engine::{
    CalibrationError, CalibrationSummary, CalibrationWindow, Calibrator, ChannelState,
    DelayPressureSample, ValidationStats,
};
pub use least_squares::{LeastSquares, LinearModel};
