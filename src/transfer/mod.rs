//! Transfer manifest for pushed layers
//!
//! Resolved layers are flattened into (target path, repository URL, digest)
//! records and streamed straight to a temp file, one JSON document per line.
//! The canonical copy lives on disk; [`ContentReader`] hands out restartable
//! lazy iterators over it so a large manifest is never held in memory.

use crate::error::{PublisherError, Result};
use crate::repository::ResolvedLayer;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One pushed-layer location handed to downstream tooling
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferDetail {
    pub target_path: String,
    pub repository_url: String,
    pub sha256: String,
}

impl TransferDetail {
    pub fn from_layer(layer: &ResolvedLayer, repository_url: &str) -> Self {
        Self {
            target_path: layer.full_path(),
            repository_url: repository_url.to_string(),
            // A layer without the digest property still transfers; the digest
            // is informational here
            sha256: layer.property("sha256").unwrap_or_default().to_string(),
        }
    }
}

/// Map resolved layers to transfer details and persist them in one pass.
/// Output order equals input order.
pub fn save_transfer_details(
    layers: &[ResolvedLayer],
    repository_url: &str,
) -> Result<PushResult> {
    let path = std::env::temp_dir().join(format!("transfer-details-{}.json", Uuid::new_v4()));
    let file = File::create(&path).map_err(|e| {
        PublisherError::Serialization(format!(
            "Failed to create transfer manifest {}: {}",
            path.display(),
            e
        ))
    })?;
    let mut writer = BufWriter::new(file);

    let mut count = 0;
    for layer in layers {
        let detail = TransferDetail::from_layer(layer, repository_url);
        serde_json::to_writer(&mut writer, &detail)
            .map_err(|e| PublisherError::Serialization(e.to_string()))?;
        writer
            .write_all(b"\n")
            .map_err(|e| PublisherError::Serialization(e.to_string()))?;
        count += 1;
    }
    writer
        .flush()
        .map_err(|e| PublisherError::Serialization(e.to_string()))?;

    Ok(PushResult::new(count, ContentReader::new(path)))
}

/// Restartable lazy reader over line-delimited JSON records in temp storage
#[derive(Debug)]
pub struct ContentReader<T> {
    path: PathBuf,
    _record: PhantomData<T>,
}

impl<T: DeserializeOwned> ContentReader<T> {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            _record: PhantomData,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open a fresh pass over the records; may be called repeatedly
    pub fn iter(&self) -> Result<RecordIter<T>> {
        let file = File::open(&self.path)?;
        Ok(RecordIter {
            lines: BufReader::new(file).lines(),
            _record: PhantomData,
        })
    }

    /// Remove the backing temp file
    pub fn delete(self) -> Result<()> {
        std::fs::remove_file(&self.path)?;
        Ok(())
    }
}

pub struct RecordIter<T> {
    lines: std::io::Lines<BufReader<File>>,
    _record: PhantomData<T>,
}

impl<T: DeserializeOwned> Iterator for RecordIter<T> {
    type Item = Result<T>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let line = match self.lines.next()? {
                Ok(line) => line,
                Err(e) => return Some(Err(e.into())),
            };
            if line.trim().is_empty() {
                continue;
            }
            return Some(serde_json::from_str(&line).map_err(Into::into));
        }
    }
}

/// Outcome of one push invocation
#[derive(Debug, Default)]
pub struct PushResult {
    success_count: usize,
    reader: Option<ContentReader<TransferDetail>>,
}

impl PushResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn new(success_count: usize, reader: ContentReader<TransferDetail>) -> Self {
        Self {
            success_count,
            reader: Some(reader),
        }
    }

    pub fn success_count(&self) -> usize {
        self.success_count
    }

    pub fn reader(&self) -> Option<&ContentReader<TransferDetail>> {
        self.reader.as_ref()
    }

    pub fn take_reader(&mut self) -> Option<ContentReader<TransferDetail>> {
        self.reader.take()
    }
}
