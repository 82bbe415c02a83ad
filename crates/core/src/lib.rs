// crates/core/src/lib.rs
pub mod config;
pub mod credentials;
pub mod error;
pub mod paths;
pub mod retry;

pub use config::*;
pub use credentials::*;
pub use error::*;
pub use retry::*;
