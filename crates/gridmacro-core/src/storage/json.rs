//! Structured-text codec: `{"row,col": {"value", "color", "text_color"}}`.

use std::fs;
use std::path::Path;

use serde::Serialize;
use serde_json::ser::{PrettyFormatter, Serializer};

use super::check_extent;
use crate::error::Result;
use gridmacro_engine::engine::Snapshot;

/// Parse a JSON document. Nothing is returned unless the whole input is valid
/// and fits a `MAX_EXTENT` square grid.
pub fn parse_json(content: &str) -> Result<Snapshot> {
    let snapshot: Snapshot = serde_json::from_str(content)?;
    check_extent(snapshot.iter().map(|(pos, _)| pos))?;
    Ok(snapshot)
}

pub fn read_json(path: &Path) -> Result<Snapshot> {
    let content = fs::read_to_string(path)?;
    parse_json(&content)
}

/// Serialize with a four-space indent.
pub fn write_json_content(snapshot: &Snapshot) -> Result<String> {
    let mut out = Vec::new();
    let mut serializer = Serializer::with_formatter(&mut out, PrettyFormatter::with_indent(b"    "));
    snapshot.serialize(&mut serializer)?;
    // serde_json only emits UTF-8.
    Ok(String::from_utf8_lossy(&out).into_owned())
}

pub fn write_json(path: &Path, snapshot: &Snapshot) -> Result<()> {
    fs::write(path, write_json_content(snapshot)?)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::GridError;
    use gridmacro_engine::engine::{CellPos, CellRecord, Rgb};

    #[test]
    fn test_layout() {
        let mut snapshot = Snapshot::new();
        snapshot.insert(
            CellPos::new(0, 1),
            CellRecord {
                value: "hi".to_string(),
                color: Rgb(255, 0, 0),
                text_color: Rgb::BLACK,
            },
        );
        let text = write_json_content(&snapshot).unwrap();
        assert!(text.starts_with("{\n    \"0,1\": {\n        \"value\": \"hi\","));
        assert!(text.contains("\"color\": [\n            255,\n            0,\n            0\n        ]"));
    }

    #[test]
    fn test_missing_fields_default() {
        let snapshot = parse_json(r#"{"2,3": {}, "0,0": {"value": "x", "color": null}}"#).unwrap();
        let record = snapshot.get(&CellPos::new(2, 3)).unwrap();
        assert_eq!(record.value, "");
        assert_eq!(record.color, Rgb::WHITE);
        assert_eq!(record.text_color, Rgb::BLACK);
        assert_eq!(snapshot.get(&CellPos::new(0, 0)).unwrap().color, Rgb::WHITE);
    }

    #[test]
    fn test_rejects_bad_input() {
        for bad in [
            "{",
            r#"{"a,b": {}}"#,
            r#"{"0": {}}"#,
            r#"{"0,0": {"color": [256, 0, 0]}}"#,
            r#"{"0,0": {"color": [1, 2]}}"#,
            "[]",
        ] {
            assert!(matches!(parse_json(bad), Err(GridError::Json(_))), "{}", bad);
        }
    }

    #[test]
    fn test_rejects_positions_past_max_extent() {
        for far in [
            r#"{"2000,3000": {"value": "x"}}"#,
            r#"{"0,0": {}, "100,0": {}}"#,
            r#"{"18446744073709551615,0": {"value": "x"}}"#,
        ] {
            assert!(
                matches!(parse_json(far), Err(GridError::InvalidExtent { .. })),
                "{}",
                far
            );
        }
        assert!(parse_json(r#"{"99,99": {}}"#).is_ok());
    }

    #[test]
    fn test_file_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("grid.json");
        let snapshot: Snapshot = [(
            CellPos::new(4, 2),
            CellRecord {
                value: "=not evaluated".to_string(),
                color: Rgb(1, 2, 3),
                text_color: Rgb(4, 5, 6),
            },
        )]
        .into_iter()
        .collect();
        write_json(&path, &snapshot).unwrap();
        assert_eq!(read_json(&path).unwrap(), snapshot);
    }
}
