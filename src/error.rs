//! Error kinds shared by the storage engine, the HTTP layer, and the CLI.

use std::fmt;

/// The error kinds a core operation can fail with.
///
/// The discriminants double as CLI exit codes, so `None` stays `0` and every
/// other variant is non-zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorKind {
    None = 0,
    Io,
    OutOfMemory,
    Runtime,
    Debug,
    InvalidArgument,
    InvalidCommand,
    InvalidFilename,
    InvalidImgId,
    ImageNotFound,
    DuplicateId,
    ImgfsFull,
    MaxFiles,
    NotEnoughArguments,
    Resolutions,
    ImgLib,
}

impl ErrorKind {
    pub fn message(self) -> &'static str {
        match self {
            ErrorKind::None => "no error",
            ErrorKind::Io => "I/O error",
            ErrorKind::OutOfMemory => "out of memory",
            ErrorKind::Runtime => "runtime error",
            ErrorKind::Debug => "debug error",
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::InvalidCommand => "invalid command",
            ErrorKind::InvalidFilename => "invalid filename",
            ErrorKind::InvalidImgId => "invalid image ID",
            ErrorKind::ImageNotFound => "image not found",
            ErrorKind::DuplicateId => "duplicate ID",
            ErrorKind::ImgfsFull => "imgFS file is full",
            ErrorKind::MaxFiles => "invalid max_files value",
            ErrorKind::NotEnoughArguments => "not enough arguments",
            ErrorKind::Resolutions => "invalid resolution",
            ErrorKind::ImgLib => "image library error",
        }
    }

    pub fn exit_code(self) -> i32 {
        self as i32
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

/// A core operation error: an [`ErrorKind`] plus optional free-form context.
#[derive(Debug, thiserror::Error)]
#[error("{kind}{}", context.as_ref().map(|c| format!(": {c}")).unwrap_or_default())]
pub struct ImgfsError {
    pub kind: ErrorKind,
    pub context: Option<String>,
}

impl ImgfsError {
    pub fn new(kind: ErrorKind) -> Self {
        Self { kind, context: None }
    }

    pub fn with_context(kind: ErrorKind, context: impl Into<String>) -> Self {
        Self { kind, context: Some(context.into()) }
    }
}

impl From<ErrorKind> for ImgfsError {
    fn from(kind: ErrorKind) -> Self {
        ImgfsError::new(kind)
    }
}

impl From<std::io::Error> for ImgfsError {
    fn from(e: std::io::Error) -> Self {
        ImgfsError::with_context(ErrorKind::Io, e.to_string())
    }
}

impl From<image::ImageError> for ImgfsError {
    fn from(e: image::ImageError) -> Self {
        ImgfsError::with_context(ErrorKind::ImgLib, e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ImgfsError>;
