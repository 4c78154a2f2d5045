//! Tabular side-artifact export.
//!
//! Writes RFC 4180 CSV: fields containing a comma, quote, or line break are
//! quoted, with embedded quotes doubled.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::StoreResult;

fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

fn render_row<S: AsRef<str>>(fields: &[S]) -> String {
    let cells: Vec<String> = fields.iter().map(|f| escape_field(f.as_ref())).collect();
    cells.join(",")
}

/// Write `headers` and `rows` as CSV to `path`, creating parent directories.
pub fn write_table<S: AsRef<str>>(
    path: impl AsRef<Path>,
    headers: &[&str],
    rows: &[Vec<S>],
) -> StoreResult<PathBuf> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut out = render_row(headers);
    out.push_str("\r\n");
    for row in rows {
        out.push_str(&render_row(row));
        out.push_str("\r\n");
    }
    fs::write(path, out)?;
    Ok(path.to_path_buf())
}
