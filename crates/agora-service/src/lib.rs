//! # Agora Service
//!
//! Content read and write paths. Reads go through the cache-aside reader;
//! writes commit to the repository first and then invalidate the cache.

pub mod content_service;
mod content_service_impl;
pub mod di;
pub mod dto;
pub mod repository;

pub use content_service::*;
pub use content_service_impl::ContentServiceImpl;
pub use dto::*;
pub use repository::*;
