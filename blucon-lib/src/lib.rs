pub mod command;
pub mod constants;
pub mod decoder;
pub mod device;
pub mod error;
pub mod hexstr;
pub mod protocol;
pub mod response;

pub use device::PatchReader;
pub use error::BluconError;
