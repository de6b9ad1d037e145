//! Core library for imgFS: a fixed-slot, content-addressed JPEG store with
//! lazily materialized derived resolutions, served over a small HTTP/1.1
//! implementation.

pub mod codec;
pub mod error;
pub mod format;
pub mod http;
pub mod store;

pub use error::{ErrorKind, ImgfsError, Result};
pub use format::Resolution;
pub use store::StoreFile;
