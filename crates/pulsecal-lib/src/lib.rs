pub mod calibrate;
pub mod detect;
pub mod io;
pub mod signal;

pub use calibrate::*;
pub use detect::*;
pub use signal::*;
