use std::fs;
use std::path::PathBuf;
use std::str::FromStr;

use data_encoding::HEXLOWER;
use rand::Rng;

pub fn setup() {
    let results_dir_path = PathBuf::from_str("./target/results/").unwrap();
    let parallel_results_dir_path = PathBuf::from_str("./target/parallel-results/").unwrap();

    if !results_dir_path.exists() {
        fs::create_dir_all(&results_dir_path).unwrap_or_else(|_|
            panic!("Failed to create results directory: {:?}", results_dir_path)
        );
    }

    if !parallel_results_dir_path.exists() {
        fs::create_dir_all(&parallel_results_dir_path).unwrap_or_else(|_|
            panic!("Failed to create parallel results directory: {:?}", parallel_results_dir_path)
        );
    }
}

#[allow(dead_code)]
pub fn temp_file_name(dir: &str) -> PathBuf {
    let mut result = PathBuf::from(dir);
    let name = HEXLOWER.encode(&rand::random::<[u8; 16]>());
    result.push(name);
    result.set_extension("csv");
    result
}

#[allow(dead_code)]
pub fn write_records(path: &PathBuf, records: &[Vec<String>]) -> Result<(), anyhow::Error> {
    let mut writer = csv::WriterBuilder::new().flexible(true).from_path(path)?;
    for record in records {
        writer.write_record(record)?;
    }
    writer.flush()?;
    Ok(())
}

#[allow(dead_code)]
pub fn read_records(path: &PathBuf) -> Result<Vec<Vec<String>>, anyhow::Error> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;
    let mut records = Vec::new();
    for record in reader.records() {
        records.push(record?.iter().map(|field| field.to_string()).collect());
    }
    Ok(records)
}

#[allow(dead_code)]
pub fn records(rows: &[&[&str]]) -> Vec<Vec<String>> {
    rows.iter()
        .map(|row| row.iter().map(|field| field.to_string()).collect())
        .collect()
}

/// Rows of (name, score, sequence). Names repeat so equal keys are common, the sequence
/// number records input order.
#[allow(dead_code)]
pub fn random_records(count: usize) -> Vec<Vec<String>> {
    let mut rng = rand::thread_rng();
    (0..count)
        .map(|i| {
            let name = format!("name-{:02}", rng.gen_range(0..40));
            let score = format!("{}", rng.gen_range(-500..500) as f64 / 4.0);
            vec![name, score, i.to_string()]
        })
        .collect()
}

#[allow(dead_code)]
pub fn remove(paths: &[&PathBuf]) -> Result<(), anyhow::Error> {
    for path in paths {
        if path.exists() {
            fs::remove_file(path)?;
        }
    }
    Ok(())
}
