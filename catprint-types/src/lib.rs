//! Type definitions for catprint

pub mod device;
pub mod error;
pub mod filter;

pub use device::{Advertisement, DeviceAddress, DeviceIdentity};
pub use error::{Error, Result};
pub use filter::DeviceFilter;
