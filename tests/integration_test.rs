use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::tempdir;

use umitrans::{transfer_umis, MergeConfig, UmiTransError};

/// Copy a fixture into `dir`, since outputs are written next to their inputs.
fn fixture(dir: &Path, name: &str) -> PathBuf {
    let src = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data").join(name);
    let dst = dir.join(name);
    fs::copy(&src, &dst).expect("copy fixture");
    dst
}

#[test]
fn test_transfer_umis_integration() {
    let tmp = tempdir().expect("create temp dir");
    let umi = fixture(tmp.path(), "umi.fastq");
    let r1 = fixture(tmp.path(), "reads_R1.fastq");
    let r2 = fixture(tmp.path(), "reads_R2.fastq");

    let config = MergeConfig::new(&umi, vec![r1.clone(), r2.clone()]);
    let summary = transfer_umis(&config, |_| {}).expect("transfer failed");

    assert_eq!(summary.positions, 3);
    assert_eq!(summary.targets[0].written, 3);
    // read2 is named readX in R2
    assert_eq!(summary.targets[1].written, 2);
    assert_eq!(summary.targets[1].mismatched, 1);

    let out1 = fs::read_to_string(tmp.path().join("reads_R1.fastq.umi")).unwrap();
    assert_eq!(
        out1,
        "@read1:ACGTACGT 1:N:0\nAAAACCCCGGGGTTTT\n+\nIIIIIIIIIIIIIIII\n\
         @read2:GGCCAATT 1:N:0\nCCCCGGGGTTTTAAAA\n+\nIIIIIIIIIIIIIIII\n\
         @read3:TTGGCCAA 1:N:0\nGGGGTTTTAAAACCCC\n+\nIIIIIIIIIIIIIIII\n"
    );
    let out2 = fs::read_to_string(tmp.path().join("reads_R2.fastq.umi")).unwrap();
    assert_eq!(
        out2,
        "@read1:ACGTACGT 2:N:0\nTTTTGGGGCCCCAAAA\n+\n################\n\
         @read3:TTGGCCAA 2:N:0\nCCCCAAAATTTTGGGG\n+\n################\n"
    );
}

#[test]
fn test_repeated_runs_are_identical() {
    let tmp = tempdir().expect("create temp dir");
    let umi = fixture(tmp.path(), "umi.fastq");
    let r1 = fixture(tmp.path(), "reads_R1.fastq");
    let out = tmp.path().join("reads_R1.fastq.umi");
    let config = MergeConfig::new(&umi, vec![r1]).with_separator("_");

    transfer_umis(&config, |_| {}).unwrap();
    let first = fs::read(&out).unwrap();
    transfer_umis(&config, |_| {}).unwrap();
    let second = fs::read(&out).unwrap();

    assert!(!first.is_empty());
    assert_eq!(first, second);
    assert!(String::from_utf8_lossy(&first).starts_with("@read1_ACGTACGT 1:N:0\n"));
}

#[test]
fn test_gzipped_target_is_read() {
    use flate2::write::GzEncoder;
    use flate2::Compression;

    let tmp = tempdir().expect("create temp dir");
    let umi = fixture(tmp.path(), "umi.fastq");
    let plain = fs::read(Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/reads_R1.fastq"))
        .unwrap();
    let gz_path = tmp.path().join("reads_R1.fastq.gz");
    let mut enc = GzEncoder::new(fs::File::create(&gz_path).unwrap(), Compression::default());
    enc.write_all(&plain).unwrap();
    enc.finish().unwrap();

    let summary = transfer_umis(&MergeConfig::new(&umi, vec![gz_path]), |_| {}).unwrap();
    assert_eq!(summary.targets[0].written, 3);
    let out = fs::read_to_string(tmp.path().join("reads_R1.fastq.gz.umi")).unwrap();
    assert!(out.starts_with("@read1:ACGTACGT 1:N:0\n"));
}

#[test]
fn test_malformed_umi_is_fatal() {
    let tmp = tempdir().expect("create temp dir");
    let umi = tmp.path().join("umi.fastq");
    fs::write(&umi, "@read1\nACGTACGT\n+\nFFFFFFFF\n@read2\nGGCCAATT\n+\n").unwrap();
    let r1 = fixture(tmp.path(), "reads_R1.fastq");

    let err = transfer_umis(&MergeConfig::new(&umi, vec![r1]), |_| {}).unwrap_err();
    match &err {
        UmiTransError::MalformedRecord { position, .. } => assert_eq!(*position, 2),
        other => panic!("expected malformed record, got {:?}", other),
    }
    assert_eq!(err.stream(), Some(umi.display().to_string().as_str()));

    // only the complete first record made it out
    let out = fs::read_to_string(tmp.path().join("reads_R1.fastq.umi")).unwrap();
    assert_eq!(out, "@read1:ACGTACGT 1:N:0\nAAAACCCCGGGGTTTT\n+\nIIIIIIIIIIIIIIII\n");
}

#[test]
fn test_missing_input_fails_to_open() {
    let tmp = tempdir().expect("create temp dir");
    let r1 = fixture(tmp.path(), "reads_R1.fastq");
    let config = MergeConfig::new(tmp.path().join("nope.fastq"), vec![r1]);
    let err = transfer_umis(&config, |_| {}).unwrap_err();
    assert!(matches!(err, UmiTransError::StreamOpen { .. }));
    assert!(!tmp.path().join("reads_R1.fastq.umi").exists());
}

#[test]
fn test_main_cli_writes_outputs() -> Result<(), Box<dyn std::error::Error>> {
    use assert_cmd::assert::OutputAssertExt;
    use assert_cmd::cargo;
    use predicates::prelude::*;
    use std::process::Command;

    let tmp = tempdir()?;
    let umi = fixture(tmp.path(), "umi.fastq");
    let r1 = fixture(tmp.path(), "reads_R1.fastq");
    let r2 = fixture(tmp.path(), "reads_R2.fastq");
    let log = tmp.path().join("run.log");

    let mut cmd = Command::new(cargo::cargo_bin!(env!("CARGO_PKG_NAME")));
    cmd.arg("--umi")
        .arg(&umi)
        .arg("--log")
        .arg(&log)
        .arg("--verbose")
        .arg("--seq")
        .arg(&r1)
        .arg(&r2);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("reads_R2.fastq.umi\t2\t1\t0"));

    assert!(tmp.path().join("reads_R1.fastq.umi").exists());
    assert!(tmp.path().join("reads_R2.fastq.umi").exists());
    let log_text = fs::read_to_string(&log)?;
    assert!(log_text.contains("program started"));
    assert!(log_text.contains("command line:"));

    Ok(())
}

#[test]
fn test_main_cli_reports_malformed_input() -> Result<(), Box<dyn std::error::Error>> {
    use assert_cmd::assert::OutputAssertExt;
    use assert_cmd::cargo;
    use predicates::prelude::*;
    use std::process::Command;

    let tmp = tempdir()?;
    let umi = tmp.path().join("umi.fastq");
    fs::write(&umi, ">read1\nACGT\n")?;
    let r1 = fixture(tmp.path(), "reads_R1.fastq");

    let mut cmd = Command::new(cargo::cargo_bin!(env!("CARGO_PKG_NAME")));
    cmd.arg("--umi").arg(&umi).arg("--seq").arg(&r1);
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("umitrans ERROR: Badly formed record 1"));

    Ok(())
}
