// Library interface for fakestop modules
// This allows tests and other binaries to import modules

pub mod analysis;
pub mod error;
pub mod llm;
pub mod pipeline;
pub mod server;
pub mod storage;

pub use error::{Error, Result};
