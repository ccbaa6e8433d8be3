//! Process configuration: the versioned file format, the `dogstatsd`
//! section and logging settings, flattened under `crate::config`.

pub mod dogstatsd;
pub mod logging;
pub mod types;

pub use dogstatsd::*;
pub use logging::*;
pub use types::*;
