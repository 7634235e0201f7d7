//! Comma-separated rows with RFC 4180 quoting.
//!
//! Fields containing a comma, quote or line break are wrapped in double
//! quotes with embedded quotes doubled. Blank lines are skipped on read.

use crate::error::{AllocError, Result};

fn needs_quoting(field: &str) -> bool {
    field.contains([',', '"', '\n', '\r'])
}

fn write_field(out: &mut String, field: &str) {
    if needs_quoting(field) {
        out.push('"');
        out.push_str(&field.replace('"', "\"\""));
        out.push('"');
    } else {
        out.push_str(field);
    }
}

/// Render rows as delimited text, one line per row
pub fn write_rows<R, F>(rows: &[R]) -> String
where
    R: AsRef<[F]>,
    F: AsRef<str>,
{
    let mut out = String::new();
    for row in rows {
        for (i, field) in row.as_ref().iter().enumerate() {
            if i > 0 {
                out.push(',');
            }
            write_field(&mut out, field.as_ref());
        }
        out.push('\n');
    }
    out
}

/// One parsed row and the line of the input it starts on
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub line: usize,
    pub fields: Vec<String>,
}

/// Split delimited text into rows of fields
pub fn read_rows(text: &str) -> Result<Vec<Vec<String>>> {
    Ok(read_records(text)?.into_iter().map(|r| r.fields).collect())
}

/// Split delimited text into records, keeping each row's starting line
pub fn read_records(text: &str) -> Result<Vec<Record>> {
    let mut records = Vec::new();
    let mut row: Vec<String> = Vec::new();
    let mut field = String::new();
    let mut in_quotes = false;
    let mut quoted = false;
    let mut line = 1;
    let mut row_line = 1;
    let mut quote_line = 1;
    let mut chars = text.chars().peekable();

    fn finish_row(
        records: &mut Vec<Record>,
        row: &mut Vec<String>,
        field: &mut String,
        quoted: bool,
        line: usize,
    ) {
        row.push(std::mem::take(field));
        let blank = row.len() == 1 && row[0].trim().is_empty() && !quoted;
        if blank {
            row.clear();
        } else {
            records.push(Record { line, fields: std::mem::take(row) });
        }
    }

    while let Some(c) = chars.next() {
        if in_quotes {
            match c {
                '"' if chars.peek() == Some(&'"') => {
                    chars.next();
                    field.push('"');
                }
                '"' => in_quotes = false,
                '\n' => {
                    line += 1;
                    field.push(c);
                }
                _ => field.push(c),
            }
            continue;
        }

        match c {
            '"' if field.is_empty() && !quoted => {
                in_quotes = true;
                quoted = true;
                quote_line = line;
            }
            ',' => {
                row.push(std::mem::take(&mut field));
                quoted = false;
            }
            '\r' if chars.peek() == Some(&'\n') => {}
            '\n' => {
                finish_row(&mut records, &mut row, &mut field, quoted, row_line);
                quoted = false;
                line += 1;
                row_line = line;
            }
            _ => field.push(c),
        }
    }

    if in_quotes {
        return Err(AllocError::ImportError {
            row: quote_line,
            message: "unterminated quoted field".to_string(),
        });
    }
    if !field.is_empty() || !row.is_empty() || quoted {
        finish_row(&mut records, &mut row, &mut field, quoted, row_line);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_rows() {
        let rows = read_rows("Label,Subnet\nA,10.0.0.0/26\n").unwrap();
        assert_eq!(rows, vec![vec!["Label", "Subnet"], vec!["A", "10.0.0.0/26"]]);
    }

    #[test]
    fn test_quoted_fields_survive() {
        let rows = vec![vec!["web, front".to_string(), "say \"hi\"".to_string()]];
        let text = write_rows(&rows);
        assert_eq!(text, "\"web, front\",\"say \"\"hi\"\"\"\n");
        assert_eq!(read_rows(&text).unwrap(), rows);
    }

    #[test]
    fn test_crlf_and_blank_lines() {
        let rows = read_rows("a,b\r\n\r\nc,d").unwrap();
        assert_eq!(rows, vec![vec!["a", "b"], vec!["c", "d"]]);
    }

    #[test]
    fn test_empty_trailing_field() {
        let rows = read_rows("a,\n").unwrap();
        assert_eq!(rows, vec![vec!["a", ""]]);
    }

    #[test]
    fn test_records_keep_source_lines() {
        let records = read_records("Label,Subnet\n\nA,\"multi\nline\"\nB,x\n").unwrap();
        let lines: Vec<usize> = records.iter().map(|r| r.line).collect();
        assert_eq!(lines, vec![1, 3, 5]);
        assert_eq!(records[1].fields, vec!["A", "multi\nline"]);
    }

    #[test]
    fn test_unterminated_quote_is_an_error() {
        let err = read_rows("a,b\n\"open,c\n").unwrap_err();
        assert!(matches!(err, AllocError::ImportError { row: 2, .. }));
    }
}
