use csv_file_sort::column::Column;
use csv_file_sort::error::SortError;
use csv_file_sort::sort::Sort;

mod common;

#[test]
fn test_check_sorted() -> Result<(), anyhow::Error> {
    common::setup();
    let input_path = common::temp_file_name("./target/results/");
    let output_path = common::temp_file_name("./target/results/");
    let mut input = vec![vec!["name".to_string(), "score".to_string(), "seq".to_string()]];
    input.extend(common::random_records(300));
    common::write_records(&input_path, &input)?;

    let mut seq_check = Sort::new(vec![input_path.clone()], output_path.clone());
    seq_check.add_column(Column::from("seq"));
    seq_check.with_numeric_columns(true);
    assert_eq!(seq_check.check()?, true);

    let mut csv_file_sort = Sort::new(vec![input_path.clone()], output_path.clone());
    csv_file_sort.add_column(Column::from("score"));
    csv_file_sort.with_numeric_columns(true);
    csv_file_sort.sort()?;

    let mut sorted_check = Sort::new(vec![output_path.clone()], output_path.clone());
    sorted_check.add_column(Column::from("score"));
    sorted_check.with_numeric_columns(true);
    assert_eq!(sorted_check.check()?, true);
    Ok(common::remove(&[&input_path, &output_path])?)
}

#[test]
fn test_check_not_sorted() -> Result<(), anyhow::Error> {
    common::setup();
    let input_path = common::temp_file_name("./target/results/");
    common::write_records(&input_path, &common::records(&[&["b", "1"], &["a", "2"]]))?;

    let mut csv_file_sort = Sort::new(vec![input_path.clone()], input_path.clone());
    csv_file_sort.with_header(false);
    csv_file_sort.add_column(Column::from(0));
    assert_eq!(csv_file_sort.check()?, false);

    csv_file_sort.with_columns(vec![Column::from(1)]);
    assert_eq!(csv_file_sort.check()?, true);
    common::remove(&[&input_path])
}

#[test]
fn test_check_every_input() -> Result<(), anyhow::Error> {
    common::setup();
    let first_path = common::temp_file_name("./target/results/");
    let second_path = common::temp_file_name("./target/results/");
    let third_path = common::temp_file_name("./target/results/");
    common::write_records(&first_path, &common::records(&[&["k"], &["a"], &["c"]]))?;
    common::write_records(&second_path, &common::records(&[&["k"], &["b"], &["d"]]))?;
    common::write_records(&third_path, &common::records(&[&["k"], &["z"], &["y"]]))?;

    // each input is checked on its own, the order across files does not matter
    let mut csv_file_sort = Sort::new(vec![first_path.clone(), second_path.clone()], first_path.clone());
    csv_file_sort.add_column(Column::from("k"));
    assert_eq!(csv_file_sort.check()?, true);

    let mut csv_file_sort = Sort::new(vec![first_path.clone(), second_path.clone(), third_path.clone()], first_path.clone());
    csv_file_sort.add_column(Column::from("k"));
    assert_eq!(csv_file_sort.check()?, false);
    common::remove(&[&first_path, &second_path, &third_path])
}

#[test]
fn test_check_reports_row() -> Result<(), anyhow::Error> {
    common::setup();
    let input_path = common::temp_file_name("./target/results/");
    common::write_records(&input_path, &common::records(&[&["n"], &["1"], &["2"], &["x"]]))?;

    let mut csv_file_sort = Sort::new(vec![input_path.clone()], input_path.clone());
    csv_file_sort.add_column(Column::from("n"));
    csv_file_sort.with_numeric_columns(true);
    let error = csv_file_sort.check().unwrap_err();
    match error.downcast_ref::<SortError>() {
        Some(SortError::InvalidNumericField { row, .. }) => assert_eq!(*row, Some(3)),
        other => panic!("unexpected error: {:?}", other),
    }
    common::remove(&[&input_path])
}
