use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::aggregate::AggregationPayload;
use crate::error::Result;
use crate::report::sanitize_file_stem;

#[derive(Serialize)]
struct Snapshot<'a> {
    client_name: &'a str,
    timestamp: String,
    generated_at: String,
    generated_by: &'a str,
    data: &'a AggregationPayload,
}

/// `<client>_<YYYYmmdd_HHMMSS>.json`
pub fn file_name(client_name: &str, at: NaiveDateTime) -> String {
    format!("{}_{}.json", sanitize_file_stem(client_name), at.format("%Y%m%d_%H%M%S"))
}

/// Write the payload with its metadata under `dir`. The file is an audit
/// trail only; nothing reads it back.
pub fn write(
    dir: &Path,
    client_name: &str,
    at: NaiveDateTime,
    generated_by: &str,
    payload: &AggregationPayload,
) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let snapshot = Snapshot {
        client_name,
        timestamp: at.format("%Y%m%d_%H%M%S").to_string(),
        generated_at: at.format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
        generated_by,
        data: payload,
    };
    let path = dir.join(file_name(client_name, at));
    std::fs::write(&path, serde_json::to_vec_pretty(&snapshot)?)?;
    log::info!("Wrote data snapshot {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2026, 10, 16)
            .unwrap()
            .and_hms_opt(9, 30, 5)
            .unwrap()
    }

    #[test]
    fn test_file_name() {
        assert_eq!(file_name("Acme Corp, Ltd", at()), "Acme_Corp_Ltd_20261016_093005.json");
        assert_eq!(file_name("A/B\\C", at()), "ABC_20261016_093005.json");
    }

    #[test]
    fn test_write_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("data");
        let path = write(&nested, "Acme Corp", at(), "alice", &AggregationPayload::default()).unwrap();
        assert_eq!(path.file_name().unwrap(), "Acme_Corp_20261016_093005.json");

        let value: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        assert_eq!(value["client_name"], "Acme Corp");
        assert_eq!(value["timestamp"], "20261016_093005");
        assert_eq!(value["generated_at"], "2026-10-16T09:30:05.000000");
        assert_eq!(value["generated_by"], "alice");
        assert_eq!(value["data"].as_object().unwrap().len(), 6);
    }

    #[test]
    fn test_write_into_unwritable_location_fails() {
        let file = tempfile::NamedTempFile::new().unwrap();
        // A regular file cannot act as the parent directory
        let result = write(file.path(), "Acme", at(), "alice", &AggregationPayload::default());
        assert!(result.is_err());
    }
}
