//! Tabular import and export of a registry.
//!
//! `delimited` turns comma-separated text into rows and back; `tabular` maps
//! rows onto registry entries.

pub mod delimited;
pub mod tabular;

// Re-export commonly used items
pub use delimited::{read_records, read_rows, write_rows, Record};
pub use tabular::{decode, decode_records, encode, from_csv_str, to_csv_string, Decoded, DecodedEntry, HEADER};
