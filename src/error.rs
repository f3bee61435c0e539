//! Error types for the composition engine.

use thiserror::Error;

/// Result type alias for build operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that abort a document build. There are no retries and no partial
/// output: whichever stage fails first propagates to the caller.
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid document configuration: bad page size, margins larger than
    /// the page, unparseable font bytes. Raised during validation, before
    /// any page is produced.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A content item missing a required field, e.g. a table without
    /// columns. Raised when the item is reached during layout.
    #[error("content error: {0}")]
    Content(String),

    /// Unreadable or corrupt external bytes: an embed payload that is not
    /// a PDF, an undecodable required image.
    #[error("asset error: {0}")]
    Asset(String),

    /// Failure while serializing or rebuilding the final document.
    #[error("compose error: {0}")]
    Compose(String),
}

impl From<lopdf::Error> for Error {
    fn from(err: lopdf::Error) -> Self {
        Error::Asset(err.to_string())
    }
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Asset(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::Content("table has no columns".to_string());
        assert_eq!(err.to_string(), "content error: table has no columns");
    }

    #[test]
    fn lopdf_error_maps_to_asset() {
        let parse_err = lopdf::Document::load_mem(&[0u8; 8]).unwrap_err();
        let err: Error = parse_err.into();
        assert!(matches!(err, Error::Asset(_)));
    }
}
