use tilemix::chunk::{ChunkRange, plan};

#[test]
fn plan_splits_250_by_100() -> anyhow::Result<()> {
    let ranges = plan(250, 100)?;
    assert_eq!(
        ranges,
        vec![
            ChunkRange { start: 0, stop: 99 },
            ChunkRange {
                start: 100,
                stop: 199
            },
            ChunkRange {
                start: 200,
                stop: 249
            },
        ]
    );
    Ok(())
}

#[test]
fn plan_exact_multiple_is_one_chunk() -> anyhow::Result<()> {
    let ranges = plan(100, 100)?;
    assert_eq!(ranges, vec![ChunkRange { start: 0, stop: 99 }]);
    Ok(())
}

#[test]
fn plan_empty_input_is_empty_plan() -> anyhow::Result<()> {
    assert!(plan(0, 100)?.is_empty());
    Ok(())
}

#[test]
fn plan_rejects_zero_chunk_size() {
    let err = plan(10, 0).unwrap_err();
    assert!(err.to_string().contains("chunk_size"));
}

#[test]
fn plan_is_deterministic() -> anyhow::Result<()> {
    assert_eq!(plan(12345, 17)?, plan(12345, 17)?);
    Ok(())
}

#[test]
fn plan_covers_every_row_exactly_once() -> anyhow::Result<()> {
    for (total, size) in [(1u64, 1u64), (7, 3), (100, 100), (101, 100), (999, 10)] {
        let ranges = plan(total, size)?;
        assert_eq!(ranges.len() as u64, total.div_ceil(size));
        assert_eq!(ranges[0].start, 0);
        assert_eq!(ranges.last().unwrap().stop, total - 1);
        for pair in ranges.windows(2) {
            assert_eq!(pair[1].start, pair[0].stop + 1, "contiguous, no overlap");
        }
        let covered: u64 = ranges.iter().map(|r| r.len()).sum();
        assert_eq!(covered, total);
    }
    Ok(())
}

#[test]
fn range_tag_is_zero_padded() {
    let r = ChunkRange { start: 0, stop: 99 };
    assert_eq!(r.tag(), "000000-000099");
}
