//! Game library

pub mod data;
pub mod errors;
mod records;
pub(crate) mod repository;
pub mod service;

pub use errors::LibraryServiceError;
pub use service::*;
