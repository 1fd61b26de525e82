use csv::ByteRecord;

use crate::error::SortError;

/// Selects a sort column.
///
/// Columns are selected either by their zero based position or by their name in the header.
/// Selectors are resolved to positions once per run, before any record is sorted. The first
/// selector is the primary key.
///
/// # Examples
/// ```
/// use csv_file_sort::column::Column;
/// let by_position = Column::from(2);
/// let by_name = Column::from("age");
/// assert_eq!(by_position, Column::Index(2));
/// assert_eq!(by_name, Column::Name("age".to_string()));
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Column {
    /// Zero based column position
    Index(usize),
    /// Column name as it appears in the header
    Name(String),
}

impl From<usize> for Column {
    fn from(index: usize) -> Self {
        Column::Index(index)
    }
}

impl From<&str> for Column {
    fn from(name: &str) -> Self {
        Column::Name(name.to_string())
    }
}

impl From<String> for Column {
    fn from(name: String) -> Self {
        Column::Name(name)
    }
}

/// Map selectors to column positions, keeping their order.
pub(crate) fn resolve_columns(columns: &[Column], header: Option<&ByteRecord>) -> Result<Vec<usize>, SortError> {
    let mut resolved = Vec::with_capacity(columns.len());
    for column in columns {
        let index = match column {
            Column::Index(index) => {
                if let Some(header) = header {
                    if *index >= header.len() {
                        return Err(SortError::ColumnOutOfRange { index: *index, width: header.len() });
                    }
                }
                *index
            }
            Column::Name(name) => {
                let header = header.ok_or_else(|| SortError::MissingHeader { name: name.clone() })?;
                header
                    .iter()
                    .position(|field| field == name.as_bytes())
                    .ok_or_else(|| SortError::ColumnNotFound { name: name.clone() })?
            }
        };
        resolved.push(index);
    }
    Ok(resolved)
}
