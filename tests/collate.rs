use std::fs;
use std::path::{Path, PathBuf};
use tilemix::blind::{BLIND_COLUMNS, blind_factor};
use tilemix::chunk::ChunkRange;
use tilemix::collate::{CollateOptions, collate, des_mag};
use tilemix::{ConcatKind, MixError};

fn opts(kind: ConcatKind) -> CollateOptions {
    CollateOptions {
        kind,
        bands: vec!["r".into()],
        blind_key: None,
        clobber: false,
        skip_errors: false,
        mag: des_mag,
    }
}

/// Write one chunk file of `ids`, returning its (range, path) pair.
fn chunk_file(
    dir: &Path,
    start: u64,
    ids: &[u64],
) -> anyhow::Result<(ChunkRange, PathBuf)> {
    let stop = start + ids.len() as u64 - 1;
    let path = dir.join(format!("chunk-{start:06}-{stop:06}.jsonl"));
    let mut body = String::new();
    for id in ids {
        body.push_str(&format!("{{\"id\":{id},\"flux_r\":100.0,\"g_1\":0.5,\"g_2\":-0.25}}\n"));
    }
    fs::write(&path, body)?;
    Ok((ChunkRange { start, stop }, path))
}

fn ids_of(path: &Path) -> anyhow::Result<Vec<u64>> {
    Ok(tilemix::catalog::read_rows(path)?
        .iter()
        .map(|r| r["id"].as_u64().unwrap())
        .collect())
}

#[test]
fn rows_merge_in_chunk_order_regardless_of_discovery_order() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let c0 = chunk_file(tmp.path(), 0, &[0, 1, 2])?;
    let c1 = chunk_file(tmp.path(), 3, &[3, 4, 5])?;
    let c2 = chunk_file(tmp.path(), 6, &[6, 7])?;
    let dest = tmp.path().join("merged.jsonl");

    // Feed the chunks permuted; the merge must still come out ordered.
    let report = collate(&[c2, c0, c1], &dest, &opts(ConcatKind::Plain))?;
    assert_eq!(report.rows_written, 8);
    assert_eq!(report.chunks_skipped, 0);
    assert_eq!(ids_of(&dest)?, vec![0, 1, 2, 3, 4, 5, 6, 7]);
    Ok(())
}

#[test]
fn skip_errors_excludes_and_counts_missing_chunks() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let c0 = chunk_file(tmp.path(), 0, &[0, 1, 2])?;
    let c2 = chunk_file(tmp.path(), 6, &[6, 7])?;
    let missing = (
        ChunkRange { start: 3, stop: 5 },
        tmp.path().join("chunk-000003-000005.jsonl"),
    );
    let dest = tmp.path().join("merged.jsonl");

    let mut o = opts(ConcatKind::Plain);
    o.skip_errors = true;
    let report = collate(&[c0, missing, c2], &dest, &o)?;
    assert_eq!(report.chunks_skipped, 1);
    // Partial merge: the full dataset minus the missing chunk's rows.
    assert_eq!(report.rows_written, 5);
    assert_eq!(ids_of(&dest)?, vec![0, 1, 2, 6, 7]);
    Ok(())
}

#[test]
fn missing_chunk_without_skip_errors_is_concat_error() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let c0 = chunk_file(tmp.path(), 0, &[0])?;
    let missing = (
        ChunkRange { start: 1, stop: 1 },
        tmp.path().join("chunk-000001-000001.jsonl"),
    );
    let dest = tmp.path().join("merged.jsonl");
    let err = collate(&[c0, missing], &dest, &opts(ConcatKind::Plain)).unwrap_err();
    assert!(matches!(err, MixError::Concat(_)));
    assert!(!dest.exists());
    Ok(())
}

#[test]
fn existing_destination_without_clobber_fails_with_no_writes() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let c0 = chunk_file(tmp.path(), 0, &[0])?;
    let dest = tmp.path().join("merged.jsonl");
    fs::write(&dest, "untouched\n")?;

    let err = collate(&[c0.clone()], &dest, &opts(ConcatKind::Plain)).unwrap_err();
    assert!(matches!(err, MixError::Concat(_)));
    assert_eq!(fs::read_to_string(&dest)?, "untouched\n");

    let mut o = opts(ConcatKind::Plain);
    o.clobber = true;
    collate(&[c0], &dest, &o)?;
    assert_eq!(ids_of(&dest)?, vec![0]);
    Ok(())
}

#[test]
fn des_flavor_appends_magnitude_columns() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let c0 = chunk_file(tmp.path(), 0, &[0])?;
    let dest = tmp.path().join("merged.jsonl");
    collate(&[c0], &dest, &opts(ConcatKind::Des))?;
    let rows = tilemix::catalog::read_rows(&dest)?;
    // flux 100 at zero point 30 is magnitude 25.
    assert!((rows[0]["mag_r"].as_f64().unwrap() - 25.0).abs() < 1e-12);
    Ok(())
}

#[test]
fn plain_flavor_adds_no_columns() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let c0 = chunk_file(tmp.path(), 0, &[0])?;
    let dest = tmp.path().join("merged.jsonl");
    collate(&[c0], &dest, &opts(ConcatKind::Plain))?;
    let rows = tilemix::catalog::read_rows(&dest)?;
    assert!(!rows[0].contains_key("mag_r"));
    assert_eq!(rows[0]["g_1"].as_f64().unwrap(), 0.5);
    Ok(())
}

#[test]
fn blinding_scales_sensitive_columns_deterministically() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let c0 = chunk_file(tmp.path(), 0, &[0])?;
    let dest = tmp.path().join("merged.jsonl");
    let mut o = opts(ConcatKind::Des);
    o.blind_key = Some("v001".into());
    collate(&[c0], &dest, &o)?;

    let factor = blind_factor("v001");
    assert!((0.9..1.0).contains(&factor));
    assert_eq!(factor, blind_factor("v001"));
    assert_ne!(factor, blind_factor("v002"));

    let rows = tilemix::catalog::read_rows(&dest)?;
    assert!((rows[0]["g_1"].as_f64().unwrap() - 0.5 * factor).abs() < 1e-12);
    assert!((rows[0]["g_2"].as_f64().unwrap() - (-0.25) * factor).abs() < 1e-12);
    Ok(())
}

#[test]
fn disabled_blinding_leaves_columns_alone() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let c0 = chunk_file(tmp.path(), 0, &[0])?;
    let dest = tmp.path().join("merged.jsonl");
    collate(&[c0], &dest, &opts(ConcatKind::Des))?;
    let rows = tilemix::catalog::read_rows(&dest)?;
    for col in BLIND_COLUMNS {
        assert!(rows[0].contains_key(*col));
    }
    assert_eq!(rows[0]["g_1"].as_f64().unwrap(), 0.5);
    Ok(())
}
