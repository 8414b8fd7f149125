//! Item sequences and source files for tests.

use std::{path::PathBuf, time::Duration};

use tempfile::TempDir;

/// Returns `n` single-letter item names: `a`, `b`, `c`, ...
///
/// # Panics
///
/// Panics if `n` exceeds 26.
pub fn letters(n: usize) -> Vec<String> {
    assert!(n <= 26);
    (b'a'..b'a' + n as u8).map(|c| (c as char).to_string()).collect()
}

/// A short random sleep, used to shuffle lane interleavings between runs.
pub fn jitter(max_ms: u64) {
    std::thread::sleep(Duration::from_millis(fastrand::u64(0..=max_ms)));
}

/// Creates a temp directory with `count` source files named
/// `segment-<i>.bin`, each holding `size` bytes derived from its index.
pub fn segment_files(count: usize, size: usize) -> anyhow::Result<(TempDir, Vec<PathBuf>)> {
    let dir = tempfile::tempdir()?;
    let mut paths = Vec::with_capacity(count);
    for i in 0..count {
        let path = dir.path().join(format!("segment-{i}.bin"));
        let data = (0..size).map(|b| (b + i) as u8).collect::<Vec<u8>>();
        std::fs::write(&path, data)?;
        paths.push(path);
    }
    Ok((dir, paths))
}
