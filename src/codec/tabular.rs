//! Registry rows: one header plus one row per subnet.
//!
//! Only the `Label` and `Subnet` columns are read back; network, broadcast
//! and usable-host columns are always recomputed.

use crate::error::{AllocError, Result};
use crate::ip::{AddressRange, AllocationRegistry};

use super::delimited::{self, Record};

/// Header row written on export
pub const HEADER: [&str; 5] = [
    "Label",
    "Subnet",
    "NetworkAddress",
    "BroadcastAddress",
    "UsableHosts",
];

/// A parsed data row, with its 1-based row number in the input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedEntry {
    pub row: usize,
    pub label: String,
    pub range: AddressRange,
}

/// Result of decoding rows, before any registry validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    pub summary: AddressRange,
    pub entries: Vec<DecodedEntry>,
}

impl Decoded {
    /// Build a registry, failing on the first row that does not fit
    pub fn into_registry(self) -> Result<AllocationRegistry> {
        let mut row = 0;
        let entries = self.entries.into_iter().map(|entry| {
            row = entry.row;
            (entry.label, entry.range)
        });
        AllocationRegistry::from_entries(self.summary, entries).map_err(|e| AllocError::at_row(row, e))
    }
}

/// Header row plus one row per entry in registry order
pub fn encode(registry: &AllocationRegistry) -> Vec<Vec<String>> {
    let mut rows = Vec::with_capacity(registry.len() + 1);
    rows.push(HEADER.iter().map(|h| h.to_string()).collect());
    for subnet in registry.iter() {
        let range = subnet.range();
        rows.push(vec![
            subnet.label().to_string(),
            range.to_string(),
            range.network_address().to_string(),
            range.broadcast_address().to_string(),
            range.usable_host_count().to_string(),
        ]);
    }
    rows
}

/// Normalize a header cell so `Network Address` matches `NetworkAddress`
fn header_key(cell: &str) -> String {
    cell.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

fn column(header: &Record, name: &str) -> Result<usize> {
    let wanted = header_key(name);
    header
        .fields
        .iter()
        .position(|cell| header_key(cell) == wanted)
        .ok_or_else(|| AllocError::ImportError {
            row: header.line,
            message: format!("header has no '{}' column", name),
        })
}

/// Decode rows into a summary and entries, numbering rows from 1.
///
/// Without a `summary_hint` the summary is inferred from the first data row
/// as the block one prefix bit shorter. Any unparseable subnet fails the
/// whole decode.
pub fn decode(rows: &[Vec<String>], summary_hint: Option<AddressRange>) -> Result<Decoded> {
    let records: Vec<Record> = rows
        .iter()
        .enumerate()
        .map(|(i, fields)| Record { line: i + 1, fields: fields.clone() })
        .collect();
    decode_records(&records, summary_hint)
}

/// Decode records, reporting failures at each record's source line
pub fn decode_records(records: &[Record], summary_hint: Option<AddressRange>) -> Result<Decoded> {
    let (header, data) = records.split_first().ok_or_else(|| AllocError::ImportError {
        row: 1,
        message: "missing header row".to_string(),
    })?;
    let label_col = column(header, "Label")?;
    let subnet_col = column(header, "Subnet")?;
    let min_columns = label_col.max(subnet_col) + 1;

    let mut entries = Vec::with_capacity(data.len());
    for record in data {
        let (row, cells) = (record.line, &record.fields);
        if cells.len() < min_columns {
            return Err(AllocError::ImportError {
                row,
                message: format!("expected at least {} columns, found {}", min_columns, cells.len()),
            });
        }
        let range =
            AddressRange::parse(&cells[subnet_col]).map_err(|e| AllocError::at_row(row, e))?;
        entries.push(DecodedEntry {
            row,
            label: cells[label_col].clone(),
            range,
        });
    }

    let summary = match summary_hint {
        Some(summary) => summary,
        None => match entries.first() {
            Some(first) => {
                let inferred = first.range.supernet_containing(1);
                log::info!("Inferred summary {} from subnet {}", inferred, first.range);
                inferred
            }
            None => {
                return Err(AllocError::ImportError {
                    row: header.line + 1,
                    message: "cannot infer a summary without any subnet rows".to_string(),
                })
            }
        },
    };

    Ok(Decoded { summary, entries })
}

/// Export a registry as delimited text
pub fn to_csv_string(registry: &AllocationRegistry) -> String {
    delimited::write_rows(&encode(registry))
}

/// Import delimited text into a fresh registry; nothing is kept on failure
pub fn from_csv_str(text: &str, summary_hint: Option<AddressRange>) -> Result<AllocationRegistry> {
    let records = delimited::read_records(text)?;
    decode_records(&records, summary_hint)?.into_registry()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(text: &str) -> AddressRange {
        AddressRange::parse(text).unwrap()
    }

    fn rows(data: &[&[&str]]) -> Vec<Vec<String>> {
        data.iter()
            .map(|row| row.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_encode_rows() {
        let mut reg = AllocationRegistry::new(r("10.0.0.0/24"));
        reg.add_subnet("B", r("10.0.0.64/26")).unwrap();
        reg.add_subnet("A", r("10.0.0.0/30")).unwrap();

        let encoded = encode(&reg);
        assert_eq!(encoded[0], HEADER.to_vec());
        assert_eq!(encoded[1], vec!["A", "10.0.0.0/30", "10.0.0.0", "10.0.0.3", "2"]);
        assert_eq!(encoded[2], vec!["B", "10.0.0.64/26", "10.0.0.64", "10.0.0.127", "62"]);
    }

    #[test]
    fn test_decode_infers_summary() {
        let decoded = decode(
            &rows(&[&HEADER, &["Web", "192.168.1.0/24", "x", "y", "z"]]),
            None,
        )
        .unwrap();
        assert_eq!(decoded.summary, r("192.168.0.0/23"));
        assert_eq!(decoded.entries.len(), 1);
        assert_eq!(decoded.entries[0].label, "Web");
    }

    #[test]
    fn test_decode_ignores_stale_derived_columns() {
        let decoded = decode(
            &rows(&[&HEADER, &["A", "10.0.0.0/26", "1.2.3.4", "5.6.7.8", "9999"]]),
            Some(r("10.0.0.0/24")),
        )
        .unwrap();
        let reg = decoded.into_registry().unwrap();
        let encoded = encode(&reg);
        assert_eq!(encoded[1], vec!["A", "10.0.0.0/26", "10.0.0.0", "10.0.0.63", "62"]);
    }

    #[test]
    fn test_decode_accepts_legacy_header() {
        let decoded = decode(
            &rows(&[
                &["Label", "Subnet", "Network Address", "Broadcast Address", "Number of Hosts"],
                &["A", "10.0.0.0/26", "", "", ""],
            ]),
            None,
        )
        .unwrap();
        assert_eq!(decoded.summary, r("10.0.0.0/25"));
    }

    #[test]
    fn test_bad_subnet_fails_whole_decode() {
        let err = decode(
            &rows(&[&HEADER, &["A", "10.0.0.0/26"], &["B", "10.0.0.999/26"]]),
            Some(r("10.0.0.0/24")),
        )
        .unwrap_err();
        match err {
            AllocError::ImportError { row, message } => {
                assert_eq!(row, 3);
                assert!(message.contains("10.0.0.999/26"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_missing_header_and_columns() {
        assert!(matches!(decode(&[], None), Err(AllocError::ImportError { row: 1, .. })));
        assert!(matches!(
            decode(&rows(&[&["Name", "Cidr"]]), None),
            Err(AllocError::ImportError { row: 1, .. })
        ));
        assert!(matches!(
            decode(&rows(&[&["Label", "Subnet"], &["only-label"]]), None),
            Err(AllocError::ImportError { row: 2, .. })
        ));
    }

    #[test]
    fn test_no_rows_needs_hint() {
        assert!(decode(&rows(&[&HEADER]), None).is_err());
        let decoded = decode(&rows(&[&HEADER]), Some(r("10.0.0.0/8"))).unwrap();
        assert!(decoded.into_registry().unwrap().is_empty());
    }

    #[test]
    fn test_overlapping_rows_report_row() {
        let err = from_csv_str(
            "Label,Subnet\nA,10.0.0.0/25\nB,10.0.0.64/26\n",
            Some(r("10.0.0.0/24")),
        )
        .unwrap_err();
        match err {
            AllocError::ImportError { row, message } => {
                assert_eq!(row, 3);
                assert!(message.contains("A"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_errors_name_the_source_line() {
        let text = "Label,Subnet\n\nA,10.0.0.0/26\n\nB,10.0.0.999/26\n";
        let err = from_csv_str(text, Some(r("10.0.0.0/24"))).unwrap_err();
        assert!(matches!(err, AllocError::ImportError { row: 5, .. }));

        let text = "Label,Subnet\n\nA,10.0.0.0/25\nB,10.0.0.64/26\n";
        let err = from_csv_str(text, Some(r("10.0.0.0/24"))).unwrap_err();
        assert!(matches!(err, AllocError::ImportError { row: 4, .. }));
    }

    #[test]
    fn test_csv_round_trip_with_commas_in_labels() {
        let mut reg = AllocationRegistry::new(r("10.0.0.0/24"));
        reg.add_subnet("web, front", r("10.0.0.0/26")).unwrap();
        reg.add_subnet("db \"primary\"", r("10.0.0.128/25")).unwrap();

        let text = to_csv_string(&reg);
        let back = from_csv_str(&text, Some(*reg.summary())).unwrap();
        let pairs: Vec<(&str, &AddressRange)> = back.iter().map(|s| (s.label(), s.range())).collect();
        assert_eq!(
            pairs,
            vec![("web, front", &r("10.0.0.0/26")), ("db \"primary\"", &r("10.0.0.128/25"))]
        );
    }
}
