use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use zero::params::{default_step_list, ProofParams};

fn zero_bin(args: &[&str], params: &Path) -> std::io::Result<Output> {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_zero"));
    for (key, _) in std::env::vars() {
        if key.starts_with("ZERO_BIN_") {
            cmd.env_remove(key);
        }
    }
    cmd.args(args).arg("--params").arg(params).output()
}

fn params_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("zero-cli-{name}-{}.json", std::process::id()))
}

#[test]
fn test_setup_writes_params() -> anyhow::Result<()> {
    let path = params_path("setup");
    let output = zero_bin(
        &["setup", "--degree-log", "6", "--expand-factor", "1", "--lambda", "8"],
        &path,
    )?;
    assert!(output.status.success(), "{output:?}");

    let params = ProofParams::load(&path)?;
    assert_eq!(params.degree_log, 6);
    assert_eq!(params.expand_factor, 1);
    assert_eq!(params.lambda, 8);
    assert_eq!(params.step_list, default_step_list(6));
    std::fs::remove_file(&path)?;
    Ok(())
}

#[test]
fn test_setup_rejects_invalid_step_list() -> anyhow::Result<()> {
    let path = params_path("invalid");
    let output = zero_bin(&["setup", "--degree-log", "6", "--step-list", "9,9"], &path)?;
    assert!(!output.status.success());
    assert!(!path.exists());
    Ok(())
}
