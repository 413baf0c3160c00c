// ============================================================
// Layer 4 - Shower Loader
// ============================================================
// Reads the held-out split from a directory of JSON Lines
// shards. Every non-empty line is one sample:
//
//   {"volume": [f32; depth*height*width],
//    "target": 12.5,          ← may be written as an integer
//    "num":    3,
//    "index":  1042}          ← optional
//
// Shards are read in file-name order and lines in file order,
// so the sample order is stable between runs. When a line has
// no "index" the running sample ordinal is used instead.
//
// Reference: Rust Book §9 (Error Handling)
//            serde_json documentation

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::{
    fs,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use crate::domain::sample::{ShowerSample, VolumeShape};
use crate::domain::traits::ShowerSource;

/// One line of a shard as written on disk
#[derive(Debug, Deserialize)]
struct ShowerRecord {
    volume: Vec<f32>,
    // serde_json reads both `7` and `7.0` into f32, which is the
    // integer-to-float cast the targets need
    target: f32,
    #[serde(default)]
    num:    f32,
    #[serde(default)]
    index:  Option<i64>,
}

/// Loads all .jsonl shards from a given directory.
/// Implements the ShowerSource trait from Layer 3.
pub struct JsonlShowerLoader {
    dir:   PathBuf,
    shape: VolumeShape,
}

impl JsonlShowerLoader {
    pub fn new(dir: impl Into<PathBuf>, shape: VolumeShape) -> Self {
        Self { dir: dir.into(), shape }
    }

    /// Shard files in the directory, sorted by name
    fn shard_paths(&self) -> Result<Vec<PathBuf>> {
        let mut paths = Vec::new();
        for entry in fs::read_dir(&self.dir)
            .with_context(|| format!("Cannot read directory '{}'", self.dir.display()))?
        {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) == Some("jsonl") {
                paths.push(path);
            }
        }
        paths.sort();
        Ok(paths)
    }

    fn load_shard(&self, path: &Path, samples: &mut Vec<ShowerSample>) -> Result<()> {
        let file = fs::File::open(path)
            .with_context(|| format!("Cannot open shard '{}'", path.display()))?;

        for (line_no, line) in BufReader::new(file).lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let record: ShowerRecord = serde_json::from_str(&line).with_context(|| {
                format!("Malformed sample at {}:{}", path.display(), line_no + 1)
            })?;

            if record.volume.len() != self.shape.len() {
                bail!(
                    "Sample at {}:{} has {} cells, expected {} for shape {}",
                    path.display(),
                    line_no + 1,
                    record.volume.len(),
                    self.shape.len(),
                    self.shape,
                );
            }

            let ordinal = samples.len() as i64;
            samples.push(ShowerSample {
                volume: record.volume,
                target: record.target,
                num:    record.num,
                index:  record.index.unwrap_or(ordinal),
            });
        }
        Ok(())
    }
}

impl ShowerSource for JsonlShowerLoader {
    fn load_all(&self) -> Result<Vec<ShowerSample>> {
        // A missing directory is an empty split; the empty run is
        // reported later, once there is nothing to average.
        if !self.dir.exists() {
            tracing::warn!(
                "Data directory '{}' does not exist, returning empty dataset",
                self.dir.display()
            );
            return Ok(Vec::new());
        }

        let mut samples = Vec::new();
        for path in self.shard_paths()? {
            let before = samples.len();
            self.load_shard(&path, &mut samples)?;
            tracing::debug!("Loaded {} samples from {}", samples.len() - before, path.display());
        }

        tracing::info!("Loaded {} samples from '{}'", samples.len(), self.dir.display());
        Ok(samples)
    }
}

// ─── Unit Tests ───────────────────────────────────────────────────────────────
#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const SHAPE: VolumeShape = VolumeShape::new(1, 2, 2);

    fn write_shard(dir: &Path, name: &str, lines: &[&str]) {
        let mut f = fs::File::create(dir.join(name)).unwrap();
        for l in lines {
            writeln!(f, "{l}").unwrap();
        }
    }

    #[test]
    fn test_reads_shards_in_name_order() {
        let tmp = tempfile::tempdir().unwrap();
        write_shard(tmp.path(), "b.jsonl", &[
            r#"{"volume":[0,0,0,1],"target":3.0,"num":1,"index":30}"#,
        ]);
        write_shard(tmp.path(), "a.jsonl", &[
            r#"{"volume":[1,0,0,0],"target":1.0,"num":2,"index":10}"#,
            "",
            r#"{"volume":[0,1,0,0],"target":2.0,"num":1,"index":20}"#,
        ]);
        write_shard(tmp.path(), "notes.txt", &["ignored"]);

        let samples = JsonlShowerLoader::new(tmp.path(), SHAPE).load_all().unwrap();
        let indices: Vec<i64> = samples.iter().map(|s| s.index).collect();
        assert_eq!(indices, vec![10, 20, 30]);
        assert_eq!(samples[0].volume, vec![1.0, 0.0, 0.0, 0.0]);
        assert_eq!(samples[0].num, 2.0);
    }

    #[test]
    fn test_integer_target_and_default_index() {
        let tmp = tempfile::tempdir().unwrap();
        write_shard(tmp.path(), "a.jsonl", &[
            r#"{"volume":[0,0,0,0],"target":5}"#,
            r#"{"volume":[0,0,0,0],"target":6}"#,
        ]);

        let samples = JsonlShowerLoader::new(tmp.path(), SHAPE).load_all().unwrap();
        assert_eq!(samples[0].target, 5.0);
        assert_eq!(samples[1].index, 1);
        assert_eq!(samples[1].num, 0.0);
    }

    #[test]
    fn test_wrong_volume_length_names_the_line() {
        let tmp = tempfile::tempdir().unwrap();
        write_shard(tmp.path(), "a.jsonl", &[
            r#"{"volume":[0,0,0,0],"target":1}"#,
            r#"{"volume":[0,0,0],"target":1}"#,
        ]);

        let err = JsonlShowerLoader::new(tmp.path(), SHAPE).load_all().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("a.jsonl:2"), "{msg}");
        assert!(msg.contains("expected 4"), "{msg}");
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let tmp = tempfile::tempdir().unwrap();
        let loader = JsonlShowerLoader::new(tmp.path().join("nope"), SHAPE);
        assert!(loader.load_all().unwrap().is_empty());
    }
}
