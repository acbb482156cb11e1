use std::fs;
use std::process::Command;

use tempfile::tempdir;

const DATA: &str = "Pregnancies,Glucose,BloodPressure,SkinThickness,Insulin,BMI,DiabetesPedigreeFunction,Age,Outcome\n\
6,148,72,35,0,33.6,0.627,50,1\n\
1,85,66,29,0,26.6,0.351,31,0\n\
8,183,64,0,0,23.3,0.672,32,1\n\
1,89,66,23,94,28.1,0.167,21,0\n\
0,137,40,35,168,43.1,2.288,33,1\n\
5,116,74,0,0,25.6,0.201,30,0\n\
3,78,50,32,88,31,0.248,26,1\n\
10,115,0,0,0,35.3,0.134,29,0\n\
2,197,70,45,543,30.5,0.158,53,1\n\
4,110,92,0,0,37.6,0.191,30,0\n";

#[test]
fn cli_writes_report_and_output_files() {
    let tmp = tempdir().expect("temporary directory");
    let data_path = tmp.path().join("diabetes.csv");
    fs::write(&data_path, DATA).expect("write data");
    let out_dir = tmp.path().join("out");

    let exe = env!("CARGO_BIN_EXE_diabayes");
    let output = Command::new(exe)
        .current_dir(tmp.path())
        .args([
            data_path.to_str().expect("path str"),
            "--chains",
            "2",
            "--burn-in",
            "20",
            "--draws",
            "30",
            "--no-progress",
            "--output-dir",
            out_dir.to_str().expect("path str"),
        ])
        .output()
        .expect("run diabayes cli");

    assert!(output.status.success(), "CLI exited with {:?}", output.status);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("==== Accuracy summary ===="));
    assert!(stdout.contains("Model A test accuracy:"));
    for name in [
        "posterior_model_a.toml",
        "posterior_model_b.toml",
        "predictions_model_a_train.tsv",
        "predictions_model_b_test.tsv",
        "draws_model_b.tsv",
    ] {
        assert!(out_dir.join(name).exists(), "{name} missing");
    }
}

#[test]
fn cli_reports_errors_with_exit_status_one() {
    let tmp = tempdir().expect("temporary directory");
    let exe = env!("CARGO_BIN_EXE_diabayes");
    let output = Command::new(exe)
        .args([tmp.path().join("missing.csv").to_str().expect("path str")])
        .output()
        .expect("run diabayes cli");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Error:"));
}

#[test]
fn cli_rejects_invalid_train_fraction() {
    let tmp = tempdir().expect("temporary directory");
    let data_path = tmp.path().join("diabetes.csv");
    fs::write(&data_path, DATA).expect("write data");

    let exe = env!("CARGO_BIN_EXE_diabayes");
    let output = Command::new(exe)
        .args([
            data_path.to_str().expect("path str"),
            "--train-fraction",
            "1.5",
            "--no-progress",
        ])
        .output()
        .expect("run diabayes cli");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("train_fraction"));
}
