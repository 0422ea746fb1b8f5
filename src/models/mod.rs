//! Data models

pub mod sensor;
pub mod attack;
pub mod user;

pub use sensor::*;
pub use attack::*;
pub use user::*;
