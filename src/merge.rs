use std::collections::BinaryHeap;
use std::fs;
use std::path::PathBuf;

use anyhow::Context;

use crate::chunk_cursor::ChunkCursor;
use crate::error::{AtPath, SortError};
use crate::key::KeyDef;
use crate::workspace::{chunk_writer, Workspace};

/// Merge sorted chunk files until a single sorted file remains and return it.
///
/// Each pass walks the list front to back, merging groups of up to `fan_in` neighbouring
/// files into one file that takes the group's place in the next pass. A trailing group of
/// one file moves to the next pass untouched. Groups always cover neighbouring input
/// ranges, so preferring the leftmost file on equal keys keeps the merge stable. Consumed
/// files are removed once their merge output is complete.
pub(crate) fn merge_chunks(chunks: Vec<PathBuf>, key_def: &KeyDef, fan_in: usize, workspace: &Workspace) -> Result<Option<PathBuf>, anyhow::Error> {
    let fan_in = fan_in.max(2);
    let mut files = chunks;
    let mut pass = 0;
    while files.len() > 1 {
        pass += 1;
        log::info!("Merge pass {}, files: {}, fan in: {}", pass, files.len(), fan_in);
        let mut merged = Vec::with_capacity(files.len() / fan_in + 1);
        for group in files.chunks(fan_in) {
            if group.len() == 1 {
                merged.push(group[0].clone());
            } else {
                let path = merge_group(group, key_def, workspace)
                    .with_context(|| format!("merge pass {}", pass))?;
                merged.push(path);
            }
        }
        files = merged;
    }
    Ok(files.pop())
}

/// K-way merge of sorted files into a new file in the workspace. The inputs are removed
/// only after the output is fully written.
pub(crate) fn merge_group(group: &[PathBuf], key_def: &KeyDef, workspace: &Workspace) -> Result<PathBuf, SortError> {
    let mut merged_file = workspace.create_file("merge-")?;
    let merged_path = merged_file.path().to_path_buf();
    let mut merged_len: usize = 0;

    let mut unmerged_files = BinaryHeap::with_capacity(group.len());
    for (position, path) in group.iter().enumerate() {
        let cursor = ChunkCursor::open(path, position, key_def)?;
        if cursor.peek().is_some() {
            unmerged_files.push(cursor);
        }
    }

    {
        let mut writer = chunk_writer(merged_file.as_file_mut());
        while let Some(mut current_min) = unmerged_files.pop() {
            // comparison operators are flipped to work with BinaryHeap (Max Heap)
            loop {
                match current_min.advance()? {
                    Some(keyed_record) => {
                        writer.write_byte_record(keyed_record.record()).at_path(&merged_path)?;
                        merged_len += 1;
                    }
                    None => break,
                }
                if current_min.peek().is_none() {
                    break;
                }
                if let Some(unmerged_min) = unmerged_files.peek() {
                    if &current_min < unmerged_min {
                        unmerged_files.push(current_min);
                        break;
                    }
                }
            }
        }
        writer.flush().at_path(&merged_path)?;
    }

    let (_file, merged_path) = merged_file
        .keep()
        .map_err(|e| SortError::io(&merged_path, e.error))?;

    for path in group {
        fs::remove_file(path).at_path(path)?;
    }
    log::info!("Merged {} files into {}, records: {}", group.len(), merged_path.display(), merged_len);
    Ok(merged_path)
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::path::PathBuf;

    use csv::ByteRecord;

    use crate::key::KeyDef;
    use crate::merge::{merge_chunks, merge_group};
    use crate::workspace::{chunk_reader, Workspace};

    fn write_files(workspace: &Workspace, contents: &[&str]) -> Result<Vec<PathBuf>, anyhow::Error> {
        let mut paths = Vec::new();
        for content in contents {
            let mut file = workspace.create_file("split-")?;
            file.write_all(content.as_bytes())?;
            paths.push(file.keep()?.1);
        }
        Ok(paths)
    }

    fn read(path: &PathBuf) -> Result<Vec<ByteRecord>, anyhow::Error> {
        Ok(chunk_reader(path)?.byte_records().collect::<Result<_, _>>()?)
    }

    #[test]
    fn test_merge_group_interleaves_and_removes_inputs() -> Result<(), anyhow::Error> {
        let root = tempfile::tempdir()?;
        let workspace = Workspace::new(root.path())?;
        let key_def = KeyDef::new(vec![0], true);
        let inputs = write_files(&workspace, &["1,a\n4,a\n7,a\n", "2,b\n5,b\n", "", "3,c\n6,c\n8,c\n9,c\n"])?;

        let merged = merge_group(&inputs, &key_def, &workspace)?;
        let keys: Vec<String> = read(&merged)?
            .iter()
            .map(|r| String::from_utf8_lossy(&r[0]).to_string())
            .collect();
        assert_eq!(keys, vec!["1", "2", "3", "4", "5", "6", "7", "8", "9"]);
        for input in &inputs {
            assert!(!input.exists());
        }
        std::fs::remove_file(merged)?;
        Ok(())
    }

    #[test]
    fn test_merge_chunks_is_stable() -> Result<(), anyhow::Error> {
        let root = tempfile::tempdir()?;
        let workspace = Workspace::new(root.path())?;
        let key_def = KeyDef::new(vec![0], false);
        let contents: Vec<String> = (0..7).map(|i| format!("k,{i}\nz,{i}\n")).collect();
        let contents: Vec<&str> = contents.iter().map(|s| s.as_str()).collect();

        for fan_in in [2, 3, 16] {
            let inputs = write_files(&workspace, &contents)?;
            let merged = merge_chunks(inputs, &key_def, fan_in, &workspace)?.expect("merged file");
            let records = read(&merged)?;
            let mut expected = Vec::new();
            for key in ["k", "z"] {
                for i in 0..7 {
                    expected.push(ByteRecord::from(vec![key.to_string(), i.to_string()]));
                }
            }
            assert_eq!(records, expected, "fan in {fan_in}");
            std::fs::remove_file(merged)?;
        }
        Ok(())
    }

    #[test]
    fn test_merge_single_and_empty() -> Result<(), anyhow::Error> {
        let root = tempfile::tempdir()?;
        let workspace = Workspace::new(root.path())?;
        let key_def = KeyDef::new(vec![0], false);
        assert!(merge_chunks(vec![], &key_def, 2, &workspace)?.is_none());

        let inputs = write_files(&workspace, &["a,1\n"])?;
        let merged = merge_chunks(inputs.clone(), &key_def, 2, &workspace)?.expect("merged file");
        assert_eq!(merged, inputs[0]);
        std::fs::remove_file(merged)?;
        Ok(())
    }
}
