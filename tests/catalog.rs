use std::fs;
use tilemix::MixError;
use tilemix::catalog::{distinct_group_count, read_rows, row_count, write_rows};

#[test]
fn row_count_skips_blank_lines() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("cat.jsonl");
    fs::write(&path, "{\"id\":1}\n\n{\"id\":2}\n   \n{\"id\":3}\n")?;
    assert_eq!(row_count(&path)?, 3);
    Ok(())
}

#[test]
fn row_count_missing_file_is_missing_data() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let err = row_count(tmp.path().join("absent.jsonl")).unwrap_err();
    assert!(matches!(err, MixError::MissingData { .. }));
    assert!(err.to_string().contains("absent.jsonl"));
    Ok(())
}

#[test]
fn distinct_groups_deduplicate() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("fofs.jsonl");
    fs::write(
        &path,
        "{\"fofid\":0}\n{\"fofid\":0}\n{\"fofid\":1}\n{\"fofid\":2}\n{\"fofid\":1}\n",
    )?;
    assert_eq!(distinct_group_count(&path)?, 3);
    Ok(())
}

#[test]
fn distinct_groups_require_integer_ids() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("fofs.jsonl");
    fs::write(&path, "{\"fofid\":\"a\"}\n")?;
    let err = distinct_group_count(&path).unwrap_err();
    assert!(matches!(err, MixError::UnitIo { .. }));
    Ok(())
}

#[test]
fn write_rows_creates_parent_dirs() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("sub").join("dir").join("out.jsonl");
    let rows = read_rows_fixture();
    assert_eq!(write_rows(&path, &rows)?, 2);
    assert_eq!(read_rows(&path)?, rows);
    Ok(())
}

fn read_rows_fixture() -> Vec<tilemix::catalog::Row> {
    ["{\"id\":1,\"flux_r\":100.0}", "{\"id\":2,\"flux_r\":10.0}"]
        .iter()
        .map(|s| serde_json::from_str(s).unwrap())
        .collect()
}

#[test]
fn read_rows_reports_bad_lines() -> anyhow::Result<()> {
    let tmp = tempfile::tempdir()?;
    let path = tmp.path().join("bad.jsonl");
    fs::write(&path, "{\"id\":1}\nnot json\n")?;
    let err = read_rows(&path).unwrap_err();
    assert!(err.to_string().contains("bad.jsonl"));
    Ok(())
}
