//! Where diagnostics and checkpoints go.

use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use image::GrayImage;
use log::debug;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::imaging::grid::save_png;

pub const DIAGNOSTICS_FILE: &str = "diagnostics.jsonl";

/// Receives periodic diagnostics and checkpoints. Every failure is returned
/// to the caller; nothing is skipped silently.
pub trait Sink {
    fn emit_diagnostics(
        &mut self,
        step: u64,
        scalars: &BTreeMap<String, f64>,
        images: &GrayImage,
    ) -> Result<()>;

    fn emit_checkpoint<M: Serialize + ?Sized>(&mut self, step: u64, model: &M) -> Result<()>;
}

#[derive(Serialize)]
struct DiagnosticsLine<'a> {
    step: u64,
    scalars: &'a BTreeMap<String, f64>,
}

#[derive(Serialize)]
struct Checkpoint<'a, M: ?Sized> {
    step: u64,
    model: &'a M,
}

/// Writes into a run directory:
/// - `diagnostics.jsonl`: one `{"step", "scalars"}` object per line
/// - `rec-<step>.png`: reconstruction grid
/// - `model.ckpt-<step>.json`: `{"step", "model"}`
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> FileSink {
        FileSink { dir: dir.into() }
    }

    pub fn checkpoint_path(&self, step: u64) -> PathBuf {
        self.dir.join(format!("model.ckpt-{step}.json"))
    }

    pub fn image_path(&self, step: u64) -> PathBuf {
        self.dir.join(format!("rec-{step}.png"))
    }

    fn append_line(path: &Path, line: &str) -> Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .map_err(|e| Error::storage(path, e))?;
        writeln!(file, "{line}").map_err(|e| Error::storage(path, e))
    }
}

impl Sink for FileSink {
    fn emit_diagnostics(
        &mut self,
        step: u64,
        scalars: &BTreeMap<String, f64>,
        images: &GrayImage,
    ) -> Result<()> {
        let path = self.dir.join(DIAGNOSTICS_FILE);
        let line = serde_json::to_string(&DiagnosticsLine { step, scalars })
            .map_err(|e| Error::storage(&path, e))?;
        Self::append_line(&path, &line)?;
        save_png(images, &self.image_path(step))?;
        debug!("Wrote diagnostics for step {step}");
        Ok(())
    }

    fn emit_checkpoint<M: Serialize + ?Sized>(&mut self, step: u64, model: &M) -> Result<()> {
        let path = self.checkpoint_path(step);
        let json = serde_json::to_vec(&Checkpoint { step, model })
            .map_err(|e| Error::storage(&path, e))?;
        fs::write(&path, json).map_err(|e| Error::storage(&path, e))?;
        debug!("Wrote checkpoint {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn diagnostics_append_one_line_per_emission() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut sink = FileSink::new(dir.path());
        let mut scalars = BTreeMap::new();
        scalars.insert("elbo".to_owned(), -90.5);
        let img = GrayImage::new(4, 2);
        sink.emit_diagnostics(100, &scalars, &img).expect("emit");
        sink.emit_diagnostics(200, &scalars, &img).expect("emit");

        let text = fs::read_to_string(dir.path().join(DIAGNOSTICS_FILE)).expect("read");
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines, vec![
            r#"{"step":100,"scalars":{"elbo":-90.5}}"#,
            r#"{"step":200,"scalars":{"elbo":-90.5}}"#,
        ]);
        assert!(sink.image_path(200).is_file());
    }

    #[test]
    fn checkpoint_is_tagged_with_its_step() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut sink = FileSink::new(dir.path());
        sink.emit_checkpoint(1000, &vec![1.5, 2.5]).expect("emit");
        let text = fs::read_to_string(sink.checkpoint_path(1000)).expect("read");
        let value: serde_json::Value = serde_json::from_str(&text).expect("json");
        assert_eq!(value["step"], 1000);
        assert_eq!(value["model"][1], 2.5);
    }

    #[test]
    fn missing_directory_is_a_storage_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut sink = FileSink::new(dir.path().join("gone"));
        let err = sink.emit_checkpoint(1, &0).unwrap_err();
        assert!(matches!(err, Error::StorageWrite { .. }));
    }
}
