use std::cmp::Ordering;

use csv::ByteRecord;

use crate::error::SortError;
use crate::key::{Key, KeyDef};

/// A record paired with its sort key. Ordering looks at the key only.
#[derive(Debug)]
pub(crate) struct KeyedRecord {
    record: ByteRecord,
    keys: Vec<Key>,
}

impl KeyedRecord {
    pub(crate) fn new(record: ByteRecord, key_def: &KeyDef) -> Result<KeyedRecord, SortError> {
        let keys = key_def.extract(&record)?;
        Ok(
            KeyedRecord {
                record,
                keys,
            }
        )
    }

    pub(crate) fn record(&self) -> &ByteRecord {
        &self.record
    }
}

impl Eq for KeyedRecord {}

impl PartialEq<Self> for KeyedRecord {
    fn eq(&self, other: &Self) -> bool {
        self.keys == other.keys
    }
}

impl PartialOrd<Self> for KeyedRecord {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for KeyedRecord {
    fn cmp(&self, other: &Self) -> Ordering {
        self.keys.cmp(&other.keys)
    }
}

#[cfg(test)]
mod tests {
    use csv::ByteRecord;

    use crate::key::KeyDef;
    use crate::keyed_record::KeyedRecord;

    #[test]
    fn test_sort_is_stable() -> Result<(), anyhow::Error> {
        let key_def = KeyDef::new(vec![0], false);
        let mut records = vec![
            KeyedRecord::new(ByteRecord::from(vec!["b", "2"]), &key_def)?,
            KeyedRecord::new(ByteRecord::from(vec!["a", "1"]), &key_def)?,
            KeyedRecord::new(ByteRecord::from(vec!["b", "1"]), &key_def)?,
        ];
        records.sort();
        let sorted: Vec<&ByteRecord> = records.iter().map(|r| r.record()).collect();
        assert_eq!(sorted[0], &ByteRecord::from(vec!["a", "1"]));
        assert_eq!(sorted[1], &ByteRecord::from(vec!["b", "2"]));
        assert_eq!(sorted[2], &ByteRecord::from(vec!["b", "1"]));
        Ok(())
    }
}
