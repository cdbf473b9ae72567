use std::path::{Path, PathBuf};

use serde_json::Value;

#[derive(Debug, thiserror::Error)]
#[error("Failed to export {}: {source}", path.display())]
pub struct ExportError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Text shown in the detail panel for a raw payload.
///
/// JSON payloads are re-indented, anything else is shown as (lossy) UTF-8.
pub fn render_payload(payload: &[u8]) -> String {
    match serde_json::from_slice::<Value>(payload) {
        Ok(value) => serde_json::to_string_pretty(&value)
            .unwrap_or_else(|_| String::from_utf8_lossy(payload).into_owned()),
        Err(_) => String::from_utf8_lossy(payload).into_owned(),
    }
}

/// Path an export of the record with display key `key` is written to.
pub fn export_path(dir: &Path, key: &str) -> PathBuf {
    let file_name: String = key
        .chars()
        .map(|c| if std::path::is_separator(c) { '_' } else { c })
        .collect();
    dir.join(format!("{file_name}.json"))
}

/// Writes `text` verbatim to `<dir>/<key>.json`.
pub fn export(dir: &Path, key: &str, text: &str) -> Result<PathBuf, ExportError> {
    let path = export_path(dir, key);
    match std::fs::write(&path, text) {
        Ok(()) => Ok(path),
        Err(source) => Err(ExportError { path, source }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_is_reindented() {
        assert_eq!(render_payload(br#"{"a":1}"#), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn json_key_order_is_kept() {
        assert_eq!(
            render_payload(br#"{"z":1,"a":[true,null]}"#),
            "{\n  \"z\": 1,\n  \"a\": [\n    true,\n    null\n  ]\n}"
        );
    }

    #[test]
    fn non_json_is_shown_as_text() {
        assert_eq!(render_payload(b"hello world"), "hello world");
        assert_eq!(render_payload(&[0x68, 0x69, 0xff]), "hi\u{fffd}");
    }

    #[test]
    fn export_writes_rendered_text() {
        let dir = tempfile::tempdir().unwrap();
        let text = render_payload(br#"{"a":1}"#);
        let key = "Tue, 14 Nov 2023 22:13:20 UTC";

        let path = export(dir.path(), key, &text).unwrap();

        assert_eq!(path, dir.path().join(format!("{key}.json")));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), text);
    }

    #[test]
    fn export_key_cannot_escape_dir() {
        let dir = Path::new("/tmp/out");
        assert_eq!(export_path(dir, "../a/b"), dir.join(".._a_b.json"));
    }

    #[test]
    fn export_into_missing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let err = export(&missing, "49600", "{}").unwrap_err();

        assert_eq!(err.path, missing.join("49600.json"));
        assert!(!err.path.exists());
    }
}
