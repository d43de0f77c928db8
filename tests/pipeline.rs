use flate2::write::GzEncoder;
use flate2::Compression;
use galaxy_prep::{DataLoader, LoaderConfig, PreprocessConfig, Preprocessor};
use std::fs;
use std::io::Write;
use std::path::Path;

const ZOO_CSV: &str = "\
dr7objid,ra,dec,t01_smooth_or_features_a01_smooth_debiased,t01_smooth_or_features_a02_features_or_disk_debiased
1,10.0,1.0,0.80,0.20
2,11.0,2.0,0.60,0.40
3,12.0,3.0,0.30,0.70
4,13.0,4.0,0.90,0.10
5,14.0,5.0,0.50,0.50
6,15.0,6.0,0.40,0.60
7,16.0,7.0,0.35,0.65
8,17.0,8.0,0.65,0.35
9,18.0,9.0,0.55,0.45
10,19.0,10.0,0.45,0.55
99,20.0,11.0,0.10,0.90
";

const REDSHIFT_CSV: &str = "\
OBJID,RA,DEC,RUN,PETROMAG_R,EXTINCTION_R,PETROR50_R,PETROR90_R,PETROMAGERR_R,REDSHIFT
1,10.0,1.0,752,15.0,0.10,5.0,10.0,0.010,0.050
2,11.0,2.0,752,16.0,0.20,4.0,12.0,0.020,0.060
3,12.0,3.0,752,17.0,0.30,0.0,11.0,0.030,0.070
4,13.0,4.0,752,16.5,0.15,6.0,15.0,99999.0,0.080
5,14.0,5.0,752,15.5,0.12,5.5,13.0,0.015,0.055
6,15.0,6.0,752,16.2,0.11,4.5,900000.0,0.012,0.065
7,16.0,7.0,752,17.1,0.13,5.1,12.5,0.011,0.075
8,17.0,8.0,752,15.8,0.14,4.8,11.5,0.018,0.052
9,18.0,9.0,752,16.7,0.16,5.3,14.0,0.022,0.068
10,19.0,10.0,752,16.9,0.18,4.2,10.5,0.014,0.072
11,20.0,11.0,752,15.2,0.10,5.0,11.0,0.010,0.050
";

fn write_gzip(path: &Path, content: &str) {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(content.as_bytes()).unwrap();
    fs::write(path, encoder.finish().unwrap()).unwrap();
}

fn loader_for(dir: &Path) -> DataLoader {
    let labels_path = dir.join("zoo.gz");
    let metadata_path = dir.join("redshift.csv");
    write_gzip(&labels_path, ZOO_CSV);
    fs::write(&metadata_path, REDSHIFT_CSV).unwrap();

    DataLoader::new(LoaderConfig {
        labels_path,
        metadata_path,
        ..LoaderConfig::default()
    })
}

#[test]
fn test_load_joins_and_renames_target() {
    let dir = tempfile::tempdir().unwrap();
    let df = loader_for(dir.path()).load().unwrap();

    // Ids 1..=10 are in both tables; 99 and 11 are not.
    assert_eq!(df.height(), 10);

    let names: Vec<String> = df.get_column_names().iter().map(|s| s.to_string()).collect();
    assert_eq!(names[0], "target");
    assert_eq!(names[1], "OBJID");
    assert!(!names.iter().any(|n| n == "dr7objid" || n == "ra"));
    assert!(!names.iter().any(|n| n.starts_with("t01_")));
    assert_eq!(names.len(), 1 + 10);
}

#[test]
fn test_load_and_preprocess_end_to_end() {
    let dir = tempfile::tempdir().unwrap();
    let joined = loader_for(dir.path()).load().unwrap();

    let config = PreprocessConfig::default();
    let (out, report) = Preprocessor::preprocess_with_report(&joined, &config).unwrap();

    // Id 3 has a zero radius, id 4 the error sentinel, id 6 an extreme PETROR90_R.
    assert_eq!(out.height(), 7);
    assert_eq!(report.input_rows, 10);
    assert_eq!(report.rows_removed(), 3);

    let mut names: Vec<String> = out.get_column_names().iter().map(|s| s.to_string()).collect();
    names.sort();
    assert_eq!(
        names,
        vec![
            "CONC_R",
            "LOG_PETROMAGERR_R",
            "LOG_PETROR50_R",
            "LOG_PETROR90_R",
            "PETROMAG_R_corr",
            "REDSHIFT",
            "target",
        ]
    );

    for column in out.get_columns() {
        assert_eq!(column.null_count(), 0, "nulls left in {}", column.name());
    }

    let target: Vec<f64> = out
        .column("target")
        .unwrap()
        .f64()
        .unwrap()
        .into_no_null_iter()
        .collect();
    // Surviving ids 1, 2, 5, 7, 8, 9, 10 in label order.
    assert_eq!(target, vec![0.8, 0.6, 0.5, 0.35, 0.65, 0.55, 0.45]);
}

#[test]
fn test_missing_input_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let loader = DataLoader::new(LoaderConfig {
        labels_path: dir.path().join("absent.gz"),
        metadata_path: dir.path().join("absent.csv"),
        ..LoaderConfig::default()
    });
    assert!(loader.load().is_err());
}
