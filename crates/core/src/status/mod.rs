//! Train status polling
//!
//! [`derivation`] turns a schedule record into a mode, [`StatusDevice`] owns
//! the externally visible mode and announces transitions to
//! [`ports::StatusListener`]s.

pub mod derivation;
pub mod device;
pub mod ports;

pub use device::StatusDevice;
