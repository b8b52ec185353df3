use std::fs;
use tilemix::{ConcatKind, MixError, RunConfig};

fn write_cfg(dir: &std::path::Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("run.yaml");
    fs::write(&path, body).unwrap();
    path
}

const VALID: &str = "\
run_name: v001
chunk_size: 100
model_nbrs: true
bands: [g, r, i]
global_seed: 314159
concat_type: des
output_dir: /data/out
";

#[test]
fn load_valid_config() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let cfg = RunConfig::load(write_cfg(tmp.path(), VALID))?;
    assert_eq!(cfg.run_name, "v001");
    assert_eq!(cfg.chunk_size, 100);
    assert!(cfg.model_nbrs);
    assert_eq!(cfg.bands, vec!["g", "r", "i"]);
    assert_eq!(cfg.global_seed, Some(314159));
    assert_eq!(cfg.concat_type, ConcatKind::Des);
    assert_eq!(cfg.fitter, "tilefit");
    Ok(())
}

#[test]
fn unknown_keys_fail_at_load() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let body = format!("{VALID}nper: 10\n");
    let err = RunConfig::load(write_cfg(tmp.path(), &body)).unwrap_err();
    assert!(matches!(err, MixError::InvalidConfiguration(_)));
    Ok(())
}

#[test]
fn zero_chunk_size_fails_at_load() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let body = VALID.replace("chunk_size: 100", "chunk_size: 0");
    let err = RunConfig::load(write_cfg(tmp.path(), &body)).unwrap_err();
    assert!(err.to_string().contains("chunk_size"));
    Ok(())
}

#[test]
fn empty_bands_fail_at_load() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let body = VALID.replace("bands: [g, r, i]", "bands: []");
    let err = RunConfig::load(write_cfg(tmp.path(), &body)).unwrap_err();
    assert!(err.to_string().contains("bands"));
    Ok(())
}

#[test]
fn plain_concat_type_parses() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let body = VALID.replace("concat_type: des", "concat_type: plain");
    let cfg = RunConfig::load(write_cfg(tmp.path(), &body))?;
    assert_eq!(cfg.concat_type, ConcatKind::Plain);
    Ok(())
}

#[test]
fn seed_override_wins_over_config() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let cfg = RunConfig::load(write_cfg(tmp.path(), VALID))?;
    assert_eq!(cfg.resolve_seed(Some(7))?, 7);
    assert_eq!(cfg.resolve_seed(None)?, 314159);
    Ok(())
}

#[test]
fn absent_seed_without_override_fails() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let body = VALID.replace("global_seed: 314159\n", "");
    let cfg = RunConfig::load(write_cfg(tmp.path(), &body))?;
    let err = cfg.resolve_seed(None).unwrap_err();
    assert!(matches!(err, MixError::InvalidConfiguration(_)));
    Ok(())
}
