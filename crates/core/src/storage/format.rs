use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

use crate::errors::CoreError;

/// File name of the cached purchase prices (`{"SYMBOL": {"date": .., "price": ..}}`).
pub const PURCHASE_PRICES_FILE: &str = "purchase_prices.json";

/// File name of the latest full report snapshot.
pub const LATEST_REPORT_FILE: &str = "latest_report.json";

/// File name of the append-only history log.
pub const HISTORY_FILE: &str = "history.json";

/// Read and decode a JSON file. A file that does not exist is `Ok(None)`;
/// a file that exists but does not parse is an error.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, CoreError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(CoreError::FileIO(format!(
                "Cannot read {}: {e}",
                path.display()
            )))
        }
    };

    let value = serde_json::from_str(&text).map_err(|e| {
        CoreError::Deserialization(format!("Malformed JSON in {}: {e}", path.display()))
    })?;
    Ok(Some(value))
}

/// Encode `value` as pretty-printed UTF-8 JSON and replace the file at
/// `path`, creating parent directories as needed.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), CoreError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| CoreError::Serialization(format!("{}: {e}", path.display())))?;
    write_bytes(path, text.as_bytes())
}

/// Replace the file at `path` with `bytes`, creating parent directories.
pub fn write_bytes(path: &Path, bytes: &[u8]) -> Result<(), CoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| {
            CoreError::FileIO(format!("Cannot create {}: {e}", parent.display()))
        })?;
    }
    std::fs::write(path, bytes)
        .map_err(|e| CoreError::FileIO(format!("Cannot write {}: {e}", path.display())))
}
