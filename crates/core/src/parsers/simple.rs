use thiserror::Error;

use crate::model::DataFrame;

#[derive(Debug, Error)]
pub enum SimpleFrameError {
    #[error("{0}")]
    Json(#[from] serde_json::Error),
}

/// Parse a row-less frame object: `{name?, refId?, fields: [{name, type?,
/// values, config?}]}`. Untyped fields are guessed from name and values.
pub fn parse_simple_frame(value: serde_json::Value) -> Result<DataFrame, SimpleFrameError> {
    Ok(serde_json::from_value(value)?)
}
