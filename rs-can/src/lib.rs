//! **`rs-can`**, the shared CAN frame model and error type for the adapter crates in this workspace.

mod constant;
pub use constant::*;
mod frame;
pub use frame::*;

pub mod error;
pub use error::CanError;
pub mod utils;
