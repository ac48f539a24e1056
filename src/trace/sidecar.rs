//! LOD sidecar cache
//!
//! A built pyramid can be written next to the trace file and reloaded on
//! the next open, skipping the rebuild. The file is a gzip-compressed
//! bincode archive of named arrays:
//!
//! | Name | Type | Contents |
//! |------|------|----------|
//! | `signature` | f64 x 6 | `[count, t_first, t_last, mean(t), mean(inner), std(inner)]` |
//! | `has_outer` | i8 x 1 | 1 when outer aggregates are stored |
//! | `level_count` | i64 x 1 | number of levels |
//! | `l{i}_meta` | i64 x 2 | `[factor, bucket_size]` |
//! | `l{i}_time` | f64 | bucket centers |
//! | `l{i}_inner_mean/min/max` | f64 | inner aggregates |
//! | `l{i}_outer_mean/min/max` | f64 | outer aggregates, if `has_outer` |
//!
//! A missing, stale or structurally broken file is a cache miss, never an
//! error. Only I/O failures on an existing file are reported.

use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use super::lod::LodLevel;
use super::model::TraceModel;
use super::window::Aggregates;
use crate::error::{Result, ResultExt, TraceError};

/// Archive layout version
const ARCHIVE_VERSION: u32 = 1;

/// Suffix appended to the trace file name
pub const SIDECAR_SUFFIX: &str = ".lod.gz";

/// Absolute tolerance for signature comparison
const SIGNATURE_ATOL: f64 = 1e-6;

/// Relative tolerance for signature comparison
const SIGNATURE_RTOL: f64 = 1e-5;

/// Default cache location for a trace file: `trace.csv` -> `trace.csv.lod.gz`
pub fn lod_sidecar_path(trace_path: &Path) -> PathBuf {
    let mut name = trace_path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(SIDECAR_SUFFIX);
    trace_path.with_file_name(name)
}

/// Loose fingerprint of a series, used to detect stale caches
pub fn signature(time: &[f64], inner: &[f64]) -> [f64; 6] {
    if time.is_empty() {
        return [0.0; 6];
    }
    let (inner_mean, inner_std) = nan_mean_std(inner);
    [
        time.len() as f64,
        time[0],
        time[time.len() - 1],
        nan_mean_std(time).0,
        inner_mean,
        inner_std,
    ]
}

/// Mean and population standard deviation over the non-NaN values
fn nan_mean_std(values: &[f64]) -> (f64, f64) {
    let (sum, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(sum, count), v| (sum + v, count + 1));
    if count == 0 {
        return (f64::NAN, f64::NAN);
    }
    let mean = sum / count as f64;
    let var = values
        .iter()
        .filter(|v| !v.is_nan())
        .map(|v| (v - mean).powi(2))
        .sum::<f64>()
        / count as f64;
    (mean, var.sqrt())
}

fn all_close(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len()
        && a.iter()
            .zip(b)
            .all(|(x, y)| (x - y).abs() <= SIGNATURE_ATOL + SIGNATURE_RTOL * y.abs())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum ArchiveArray {
    F64(Vec<f64>),
    I64(Vec<i64>),
    I8(Vec<i8>),
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LodArchive {
    version: u32,
    arrays: BTreeMap<String, ArchiveArray>,
}

impl LodArchive {
    fn put_f64(&mut self, name: String, values: &[f64]) {
        self.arrays.insert(name, ArchiveArray::F64(values.to_vec()));
    }

    fn put_aggregates(&mut self, prefix: &str, channel: &str, agg: &Aggregates) {
        self.put_f64(format!("{}{}_mean", prefix, channel), &agg.mean);
        self.put_f64(format!("{}{}_min", prefix, channel), &agg.min);
        self.put_f64(format!("{}{}_max", prefix, channel), &agg.max);
    }

    fn take_f64(&mut self, name: &str) -> Option<Vec<f64>> {
        match self.arrays.remove(name)? {
            ArchiveArray::F64(values) => Some(values),
            _ => None,
        }
    }

    fn take_i64(&mut self, name: &str) -> Option<Vec<i64>> {
        match self.arrays.remove(name)? {
            ArchiveArray::I64(values) => Some(values),
            _ => None,
        }
    }

    fn take_i8(&mut self, name: &str) -> Option<Vec<i8>> {
        match self.arrays.remove(name)? {
            ArchiveArray::I8(values) => Some(values),
            _ => None,
        }
    }

    fn take_aggregates(&mut self, prefix: &str, channel: &str) -> Option<Aggregates> {
        Some(Aggregates {
            mean: self.take_f64(&format!("{}{}_mean", prefix, channel))?,
            min: self.take_f64(&format!("{}{}_min", prefix, channel))?,
            max: self.take_f64(&format!("{}{}_max", prefix, channel))?,
        })
    }
}

/// Write the model's pyramid to `path`
pub fn save_lod(path: &Path, model: &TraceModel) -> Result<()> {
    let mut archive = LodArchive {
        version: ARCHIVE_VERSION,
        ..Default::default()
    };
    archive.put_f64(
        "signature".into(),
        &signature(model.time_full(), model.inner_full()),
    );
    archive.arrays.insert(
        "has_outer".into(),
        ArchiveArray::I8(vec![model.has_outer() as i8]),
    );
    archive.arrays.insert(
        "level_count".into(),
        ArchiveArray::I64(vec![model.levels().len() as i64]),
    );

    for (idx, level) in model.levels().iter().enumerate() {
        let prefix = format!("l{}_", idx);
        archive.arrays.insert(
            format!("{}meta", prefix),
            ArchiveArray::I64(vec![level.factor as i64, level.bucket_size as i64]),
        );
        archive.put_f64(format!("{}time", prefix), &level.time_centers);
        archive.put_aggregates(&prefix, "inner", &level.inner);
        if let Some(outer) = &level.outer {
            archive.put_aggregates(&prefix, "outer", outer);
        }
    }

    write_archive(path, &archive)?;
    tracing::info!(
        "Saved {} LOD levels to {:?}",
        model.levels().len(),
        path
    );
    Ok(())
}

fn write_archive(path: &Path, archive: &LodArchive) -> Result<()> {
    let encoded = bincode::serialize(archive)
        .map_err(|e| TraceError::Serialization(format!("Failed to encode LOD archive: {}", e)))?;
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&encoded)?;
    let compressed = encoder.finish()?;
    std::fs::write(path, compressed)
        .map_err(TraceError::from)
        .with_context(|| format!("Failed to write LOD cache {:?}", path))
}

/// Load cached levels from `path` if they still match the series.
///
/// Returns `Ok(None)` when the file is absent, its signature does not match
/// `time`/`inner`, its outer-channel presence differs from `outer`, or any
/// expected array is missing or malformed.
pub fn load_lod(
    path: &Path,
    time: &[f64],
    inner: &[f64],
    outer: Option<&[f64]>,
) -> Result<Option<Vec<LodLevel>>> {
    if !path.exists() {
        return Ok(None);
    }
    let compressed = std::fs::read(path)
        .map_err(TraceError::from)
        .with_context(|| format!("Failed to read LOD cache {:?}", path))?;

    let mut encoded = Vec::new();
    if let Err(e) = GzDecoder::new(compressed.as_slice()).read_to_end(&mut encoded) {
        tracing::warn!("Ignoring unreadable LOD cache {:?}: {}", path, e);
        return Ok(None);
    }
    let mut archive: LodArchive = match bincode::deserialize(&encoded) {
        Ok(archive) => archive,
        Err(e) => {
            tracing::warn!("Ignoring corrupt LOD cache {:?}: {}", path, e);
            return Ok(None);
        }
    };

    let levels = read_levels(&mut archive, time, inner, outer.is_some());
    match &levels {
        Some(levels) => tracing::debug!("Loaded {} LOD levels from {:?}", levels.len(), path),
        None => tracing::debug!("LOD cache {:?} does not match this trace", path),
    }
    Ok(levels)
}

fn read_levels(
    archive: &mut LodArchive,
    time: &[f64],
    inner: &[f64],
    expect_outer: bool,
) -> Option<Vec<LodLevel>> {
    if archive.version != ARCHIVE_VERSION {
        return None;
    }
    let stored = archive.take_f64("signature")?;
    if !all_close(&stored, &signature(time, inner)) {
        return None;
    }

    let level_count = usize::try_from(*archive.take_i64("level_count")?.first()?).ok()?;
    let has_outer = archive
        .take_i8("has_outer")
        .and_then(|flag| flag.first().copied())
        .unwrap_or(0)
        != 0;
    if has_outer != expect_outer {
        return None;
    }
    // Every level needs its own meta array
    if level_count > archive.arrays.len() {
        return None;
    }

    let mut levels = Vec::new();
    for idx in 0..level_count {
        let prefix = format!("l{}_", idx);
        let meta = archive.take_i64(&format!("{}meta", prefix))?;
        let [factor, bucket_size] = meta.as_slice() else {
            return None;
        };
        let level = LodLevel {
            factor: usize::try_from(*factor).ok()?,
            bucket_size: usize::try_from(*bucket_size).ok()?,
            time_centers: archive.take_f64(&format!("{}time", prefix))?,
            inner: archive.take_aggregates(&prefix, "inner")?,
            outer: if has_outer {
                Some(archive.take_aggregates(&prefix, "outer")?)
            } else {
                None
            },
        };
        if !level.is_consistent() {
            return None;
        }
        levels.push(level);
    }

    if levels.is_empty() {
        None
    } else {
        Some(levels)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sidecar_path() {
        assert_eq!(
            lod_sidecar_path(Path::new("/data/run1/trace.csv")),
            PathBuf::from("/data/run1/trace.csv.lod.gz")
        );
    }

    #[test]
    fn test_signature_values() {
        let sig = signature(&[0.0, 1.0, 2.0, 3.0], &[1.0, 3.0, f64::NAN, 5.0]);
        assert_eq!(sig[0], 4.0);
        assert_eq!(sig[1], 0.0);
        assert_eq!(sig[2], 3.0);
        assert_eq!(sig[3], 1.5);
        assert_eq!(sig[4], 3.0);
        assert!((sig[5] - (8.0f64 / 3.0).sqrt()).abs() < 1e-12);
        assert_eq!(signature(&[], &[]), [0.0; 6]);
    }

    fn tampered_archive(time: &[f64], inner: &[f64], level_count: i64) -> LodArchive {
        let mut archive = LodArchive {
            version: ARCHIVE_VERSION,
            ..Default::default()
        };
        archive.put_f64("signature".into(), &signature(time, inner));
        archive
            .arrays
            .insert("has_outer".into(), ArchiveArray::I8(vec![0]));
        archive
            .arrays
            .insert("level_count".into(), ArchiveArray::I64(vec![level_count]));
        archive
            .arrays
            .insert("l0_meta".into(), ArchiveArray::I64(vec![1, 1]));
        archive.put_f64("l0_time".into(), time);
        archive.put_aggregates(
            "l0_",
            "inner",
            &Aggregates {
                mean: inner.to_vec(),
                min: inner.to_vec(),
                max: inner.to_vec(),
            },
        );
        archive
    }

    #[test]
    fn test_bogus_level_count_is_a_miss() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("trace.lod.gz");
        let time = [0.0, 1.0, 2.0];
        let inner = [5.0, 6.0, 7.0];

        for count in [i64::MAX, 1 << 40, 3, -1, 0] {
            write_archive(&path, &tampered_archive(&time, &inner, count)).unwrap();
            assert!(load_lod(&path, &time, &inner, None).unwrap().is_none());
        }

        write_archive(&path, &tampered_archive(&time, &inner, 1)).unwrap();
        let levels = load_lod(&path, &time, &inner, None).unwrap().unwrap();
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].time_centers, time);
    }

    #[test]
    fn test_all_close_tolerance() {
        assert!(all_close(&[1.0, 2.0], &[1.0 + 5e-7, 2.0]));
        assert!(!all_close(&[1.0, 2.0], &[1.1, 2.0]));
        assert!(!all_close(&[1.0], &[1.0, 2.0]));
        assert!(!all_close(&[f64::NAN], &[f64::NAN]));
    }
}
