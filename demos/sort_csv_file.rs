use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::Error;
use csv_file_sort::column::Column;
use csv_file_sort::sort::Sort;
use log::LevelFilter;
use rand::Rng;
use simple_logger::SimpleLogger;

use tikv_jemallocator::Jemalloc;
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

fn create_input(path: &Path, records: usize) -> Result<(), Error> {
    let mut rng = rand::thread_rng();
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "id,city,temperature")?;
    for id in 0..records {
        let city = ["Oslo", "Rome", "Lima", "Pune", "Kyiv"][rng.gen_range(0..5)];
        writeln!(writer, "{},{},{:.1}", id, city, rng.gen_range(-30.0..45.0))?;
    }
    Ok(())
}

fn sort_by_city(input_path: &Path, output_path: &Path) -> Result<(), Error> {
    let mut csv_file_sort = Sort::new(vec![input_path.to_path_buf()], output_path.to_path_buf());
    csv_file_sort.add_column(Column::from("city"));
    csv_file_sort.sort()?;
    Ok(())
}

fn sort_by_temperature(input_path: &Path, output_path: &Path) -> Result<(), Error> {
    let mut csv_file_sort = Sort::new(vec![input_path.to_path_buf()], output_path.to_path_buf());
    csv_file_sort.add_column(Column::from("temperature"));
    csv_file_sort.with_numeric_columns(true);
    // small chunks and a wider merge to exercise several merge passes
    csv_file_sort.with_chunk_size_bytes(1_000_000);
    csv_file_sort.with_fan_in(4);
    csv_file_sort.sort()?;
    Ok(())
}

// cargo run -r --example sort_csv_file
pub fn main() -> Result<(), Error> {
    SimpleLogger::new().with_level(LevelFilter::Info).init()?;

    let input_path = PathBuf::from("./target/weather-100000.csv");
    let by_city_path = PathBuf::from("./target/weather-by-city.csv");
    let by_temperature_path = PathBuf::from("./target/weather-by-temperature.csv");

    create_input(&input_path, 100_000)?;
    sort_by_city(&input_path, &by_city_path)?;
    sort_by_temperature(&input_path, &by_temperature_path)?;

    Ok(())
}
