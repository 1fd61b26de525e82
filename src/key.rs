use std::cmp::Ordering;
use std::str::FromStr;

use csv::ByteRecord;

use crate::error::SortError;

#[derive(Debug)]
pub(crate) enum Key {
    Text {
        t: Vec<u8>
    },
    Number {
        n: f64
    },
}

impl Key {
    fn new(field: &[u8], column: usize, numeric: bool, record: &ByteRecord) -> Result<Key, SortError> {
        if numeric {
            let n = std::str::from_utf8(field)
                .ok()
                .and_then(|s| f64::from_str(s.trim()).ok())
                .ok_or_else(|| SortError::InvalidNumericField {
                    column,
                    value: String::from_utf8_lossy(field).to_string(),
                    record: describe(record),
                    row: None,
                })?;
            Ok(Key::Number { n })
        } else {
            Ok(Key::Text { t: field.to_vec() })
        }
    }

    fn as_text(&self) -> Option<&[u8]> {
        match self {
            Key::Text { t } => Some(t.as_slice()),
            Key::Number { .. } => None,
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Key::Text { .. } => None,
            Key::Number { n } => Some(*n),
        }
    }
}

fn describe(record: &ByteRecord) -> String {
    record
        .iter()
        .map(|field| String::from_utf8_lossy(field).to_string())
        .collect::<Vec<String>>()
        .join(",")
}

impl Eq for Key {}

impl PartialEq<Self> for Key {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd<Self> for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        // all keys of a run are built with the same numeric flag
        match self {
            Key::Text { t } => t.as_slice().cmp(other.as_text().unwrap_or_default()),
            Key::Number { n } => {
                let m = other.as_number().unwrap_or(f64::NAN);
                if n.is_nan() && m.is_nan() {
                    Ordering::Equal
                } else if !n.is_nan() && m.is_nan() {
                    Ordering::Greater
                } else if n.is_nan() && !m.is_nan() {
                    Ordering::Less
                } else {
                    n.partial_cmp(&m).unwrap_or(Ordering::Equal)
                }
            }
        }
    }
}

/// Resolved key columns and the numeric flag. Builds the sort key of a record.
#[derive(Clone, Debug)]
pub(crate) struct KeyDef {
    columns: Vec<usize>,
    numeric: bool,
}

impl KeyDef {
    pub(crate) fn new(columns: Vec<usize>, numeric: bool) -> KeyDef {
        KeyDef {
            columns,
            numeric,
        }
    }

    /// An empty column list keys on every field of the record.
    pub(crate) fn extract(&self, record: &ByteRecord) -> Result<Vec<Key>, SortError> {
        if self.columns.is_empty() {
            record
                .iter()
                .enumerate()
                .map(|(column, field)| Key::new(field, column, self.numeric, record))
                .collect()
        } else {
            self.columns
                .iter()
                .map(|&column| Key::new(record.get(column).unwrap_or_default(), column, self.numeric, record))
                .collect()
        }
    }
}
