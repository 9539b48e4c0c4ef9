pub mod config;
pub mod consts;
pub mod engine;
pub mod error;
pub mod events;
pub mod init;
pub mod loader;
pub mod storage;

pub use init::{Initializer, Options, configure};
