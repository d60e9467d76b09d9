//! JSON artifact IO. Inputs map to [`ExternalDependencyError`]; outputs are
//! buffered in memory and swapped into place so a failed run never leaves a
//! half-written artifact.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tempfile::NamedTempFile;

use crate::errors::{ExternalDependencyError, PipelineError};

/// Precision applied to floats before they are persisted.
pub fn round_to(value: f64, places: i32) -> f64 {
    let scale = 10f64.powi(places);
    (value * scale).round() / scale
}

pub fn read_bytes(path: &Path) -> Result<Vec<u8>, ExternalDependencyError> {
    fs::read(path).map_err(|error| match error.kind() {
        io::ErrorKind::NotFound => ExternalDependencyError::Missing { path: path.to_path_buf() },
        _ => ExternalDependencyError::Read { path: path.to_path_buf(), reason: error.to_string() },
    })
}

pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ExternalDependencyError> {
    let bytes = read_bytes(path)?;
    serde_json::from_slice(&bytes).map_err(|error| ExternalDependencyError::Malformed {
        path: path.to_path_buf(),
        reason: error.to_string(),
    })
}

/// Reads an array of rows, either bare or wrapped as a D1 export
/// (`[{"results": [...]}]`).
pub fn read_rows<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, ExternalDependencyError> {
    #[derive(Deserialize)]
    struct Envelope {
        results: Vec<Value>,
    }

    let malformed = |reason: String| ExternalDependencyError::Malformed {
        path: path.to_path_buf(),
        reason,
    };

    let raw: Vec<Value> = read_json(path)?;
    let wrapped =
        raw.first().is_some_and(|first| first.get("results").is_some_and(Value::is_array));
    let rows = if wrapped {
        raw.into_iter()
            .map(serde_json::from_value::<Envelope>)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| malformed(error.to_string()))?
            .into_iter()
            .flat_map(|envelope| envelope.results)
            .collect()
    } else {
        raw
    };

    rows.into_iter()
        .map(serde_json::from_value::<T>)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|error| malformed(error.to_string()))
}

pub fn write_json_atomic<T: Serialize + ?Sized>(
    path: &Path,
    value: &T,
) -> Result<(), PipelineError> {
    let persistence =
        |reason: String| PipelineError::Persistence { path: path.to_path_buf(), reason };

    let mut buffer =
        serde_json::to_vec_pretty(value).map_err(|error| persistence(error.to_string()))?;
    buffer.push(b'\n');

    let directory = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => Path::new(".").to_path_buf(),
    };
    fs::create_dir_all(&directory).map_err(|error| persistence(error.to_string()))?;

    let mut staged =
        NamedTempFile::new_in(&directory).map_err(|error| persistence(error.to_string()))?;
    staged.write_all(&buffer).map_err(|error| persistence(error.to_string()))?;
    staged.as_file().sync_all().map_err(|error| persistence(error.to_string()))?;
    staged.persist(path).map_err(|error| persistence(error.error.to_string()))?;

    tracing::debug!(
        event_name = "artifact.written",
        path = %path.display(),
        bytes = buffer.len(),
        "artifact persisted"
    );
    Ok(())
}
