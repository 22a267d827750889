use std::{io, num::ParseIntError};

/// Errors raised by layer construction and map persistence.
///
/// Bounds violations, name collisions and script failures are not errors:
/// they are clipped, reported as `false`, or sent to the diagnostic sink.
#[derive(Debug, thiserror::Error)]
pub enum MapError {
    /// A layer was requested with a zero width or height, or with more
    /// cells than fit in memory.
    #[error("Invalid layer dimensions {width}x{height}")]
    InvalidDimensions { width: usize, height: usize },

    /// A layer's tile data length does not match `width * height`.
    #[error("Invalid layer size for layer '{layer}': expected {expected} tiles, found {found}")]
    InvalidLayerSize {
        layer: String,
        expected: usize,
        found: usize,
    },

    /// A required element is missing from a map document.
    #[error("Missing <{0}> element")]
    MissingElement(String),

    /// Markup could not be split into elements.
    #[error("Malformed map document: {0}")]
    Malformed(String),

    /// An integer field failed to parse.
    #[error("Invalid number in <{field}>: {source}")]
    BadNumber {
        field: String,
        source: ParseIntError,
    },

    /// An entity fragment was rejected by the entity factory.
    #[error("Invalid entity: {0}")]
    Entity(String),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}
