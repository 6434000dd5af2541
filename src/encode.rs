use sha2::{Digest, Sha256};

use crate::domain::Row;

/// Joins cells with `,` and rows with `\n`. Cells are written verbatim: no
/// quoting, and no trailing newline, so output stays byte-compatible with
/// files already in the history.
pub fn encode_csv(rows: &[Row]) -> String {
    let mut out = String::new();
    for (idx, row) in rows.iter().enumerate() {
        if idx > 0 {
            out.push('\n');
        }
        for (col, cell) in row.iter().enumerate() {
            if col > 0 {
                out.push(',');
            }
            out.push_str(&cell.to_string());
        }
    }
    out
}

/// SHA-256 of the content as lowercase hex. Used for change detection only.
pub fn fingerprint(content: impl AsRef<[u8]>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_ref());
    format!("{:x}", hasher.finalize())
}
