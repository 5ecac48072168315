//! JSON document helpers: 4-space indentation, trailing newline, atomic writes.

use std::path::Path;

use serde::Serialize;

use crate::error::UtilError;

/// Serialize `value` with 4-space indentation and a trailing newline.
///
/// # Errors
/// Returns an error if the value cannot be serialized.
pub fn to_pretty_string<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
    let mut buf = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
    value.serialize(&mut ser)?;
    buf.push(b'\n');
    // serde_json only emits valid UTF-8.
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

/// Serialize `value` and atomically write it to `path`.
///
/// # Errors
/// Returns an error if serialization or the write fails.
pub fn write_pretty<T: Serialize>(path: &Path, value: &T) -> Result<(), UtilError> {
    let text = to_pretty_string(value).map_err(|e| UtilError::Serialize {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    crate::fs::write_atomic(path, text.as_bytes())
}
