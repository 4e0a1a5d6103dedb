//! Device abstraction layer
//!
//! Provides the driver trait the renderer issues calls through, the shared
//! value types, and a call-recording dummy device.

pub mod dummy;
pub mod traits;
pub mod types;

pub use dummy::*;
pub use traits::*;
pub use types::*;
