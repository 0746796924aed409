use demand_forecast::data::{SeriesLoader, TimeSeries};
use demand_forecast::ForecastError;
use pretty_assertions::assert_eq;
use std::io::Write;
use tempfile::NamedTempFile;

fn csv_file(lines: &[&str]) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    for line in lines {
        writeln!(file, "{}", line).unwrap();
    }
    file
}

fn values(series: &TimeSeries) -> Vec<f64> {
    series.values()
}

#[test]
fn test_loader_canonical_columns() {
    let file = csv_file(&["ds,y", "2023-01-01,100.0", "2023-01-02,103.0", "2023-01-03,106.0"]);

    let series = SeriesLoader::default().load_csv(file.path()).unwrap();

    assert_eq!(series.len(), 3);
    assert_eq!(values(&series), vec![100.0, 103.0, 106.0]);
}

#[test]
fn test_loader_fallback_columns() {
    let file = csv_file(&[
        "timestamp,qty,warehouse",
        "2023-01-01,5,north",
        "2023-01-02,7,north",
    ]);

    let series = SeriesLoader::new("ds", "y").load_csv(file.path()).unwrap();

    assert_eq!(series.len(), 2);
    assert_eq!(values(&series), vec![5.0, 7.0]);
}

#[test]
fn test_loader_preferred_column_wins() {
    // Both "sold" and the fallback "demand" exist; the preferred name is used
    let file = csv_file(&[
        "day,date,sold,demand",
        "2023-02-01,2023-01-01,1,100",
        "2023-02-02,2023-01-02,2,200",
    ]);

    let series = SeriesLoader::new("day", "sold").load_csv(file.path()).unwrap();

    assert_eq!(values(&series), vec![1.0, 2.0]);
    assert_eq!(
        series.first().timestamp.date().to_string(),
        "2023-02-01".to_string()
    );
}

#[test]
fn test_loader_schema_error_lists_columns() {
    let file = csv_file(&["when,amount", "2023-01-01,1"]);

    let err = SeriesLoader::default().load_csv(file.path()).unwrap_err();

    match &err {
        ForecastError::SchemaError { axis, found, .. } => {
            assert_eq!(*axis, "date");
            assert_eq!(found, "when, amount");
        }
        other => panic!("Expected SchemaError, got {:?}", other),
    }
    assert!(err.to_string().contains("when, amount"));
}

#[test]
fn test_loader_missing_value_axis() {
    let file = csv_file(&["date,amount", "2023-01-01,1"]);

    let err = SeriesLoader::default().load_csv(file.path()).unwrap_err();

    assert!(matches!(err, ForecastError::SchemaError { axis: "value", .. }));
}

#[test]
fn test_loader_drops_invalid_rows_and_sorts() {
    let file = csv_file(&[
        "date,demand",
        "2023-01-03,30",
        "garbage,10",
        "2023-01-01,10",
        "2023-01-02,",
        "2023-01-04,n/a",
        "2023-01-02,20",
    ]);

    let series = SeriesLoader::default().load_csv(file.path()).unwrap();

    assert_eq!(values(&series), vec![10.0, 20.0, 30.0]);
    assert!(series
        .timestamps()
        .windows(2)
        .all(|pair| pair[0] < pair[1]));
}

#[test]
fn test_loader_keeps_first_duplicate() {
    let file = csv_file(&["ds,y", "2023-01-01,1", "2023-01-01,2", "2023-01-02,3"]);

    let series = SeriesLoader::default().load_csv(file.path()).unwrap();

    assert_eq!(values(&series), vec![1.0, 3.0]);
}

#[test]
fn test_loader_no_valid_rows() {
    let file = csv_file(&["ds,y", "nope,1", "2023-01-01,none"]);

    let err = SeriesLoader::default().load_csv(file.path()).unwrap_err();

    assert!(matches!(err, ForecastError::DataQualityError(_)));
}

#[test]
fn test_loader_missing_file() {
    let result = SeriesLoader::default().load_csv("nonexistent_file.csv");
    assert!(matches!(result, Err(ForecastError::IoError(_))));
}
