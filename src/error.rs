use thiserror::Error;

/// Reasons a GPX document is rejected as a whole.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GpxError {
    #[error("malformed XML at position {position}: {message}")]
    Xml { position: u64, message: String },
    #[error("unexpected end of document inside <{element}>")]
    UnexpectedEof { element: String },
    #[error("document root is <{found}>, expected <gpx>")]
    NotGpx { found: String },
    #[error("document contains no <gpx> element")]
    Empty,
    #[error("track point is missing the `{attribute}` attribute")]
    MissingCoordinate { attribute: &'static str },
    #[error("invalid number {value:?} in `{field}`")]
    InvalidNumber { field: &'static str, value: String },
}
