pub mod constants;
pub mod error;
pub mod params;
pub mod request;
pub mod subscription;

pub use constants::*;
pub use error::*;
pub use params::*;
pub use request::*;
pub use subscription::*;
