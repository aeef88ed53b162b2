//! Error type for the fallible edges of the library.
//!
//! Smoothing and viewport fitting never fail; only parsing, GPX I/O and the
//! catalog client return [`Result`].

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TrailGeometryError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("GPX error: {0}")]
    Gpx(#[from] gpx::errors::GpxError),
    #[error("GPX document has no track points")]
    EmptyGpx,
    #[error("GPX output is not UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("HTTP error: {message}")]
    Http {
        message: String,
        status_code: Option<u16>,
    },
}

impl TrailGeometryError {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            TrailGeometryError::Http { status_code, .. } => {
                matches!(status_code, None | Some(429) | Some(500..=599))
            }
            TrailGeometryError::Io(_) => true,
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, TrailGeometryError>;
