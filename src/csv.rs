//! CSV encoding for table exports

use crate::value::Cell;
use std::io::{self, Write};

/// Quote a field when it contains a delimiter, quote or line break.
pub fn escape_field(field: &str) -> String {
    if field.contains(',') || field.contains('"') || field.contains('\n') || field.contains('\r') {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

/// Write a header line followed by one line per row.
///
/// Lines end with CRLF.
pub fn write_table<W: Write>(out: &mut W, columns: &[String], rows: &[Vec<Cell>]) -> io::Result<()> {
    let header: Vec<String> = columns.iter().map(|c| escape_field(c)).collect();
    out.write_all(header.join(",").as_bytes())?;
    out.write_all(b"\r\n")?;

    for row in rows {
        let fields: Vec<String> = row.iter().map(|cell| escape_field(&cell.render())).collect();
        out.write_all(fields.join(",").as_bytes())?;
        out.write_all(b"\r\n")?;
    }

    out.flush()
}
