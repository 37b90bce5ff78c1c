//! Data sources
//!
//! Models consume sources as opaque streams of records. Two sources ship
//! with the core: an in-memory one and a JSON-lines file reader.

use crate::{Error, Record, Result};
use futures::stream::{self, BoxStream, StreamExt, TryStreamExt};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

/// Trait for all record sources
pub trait Source: Send + Sync {
    /// Get the source name
    fn name(&self) -> &str;

    /// Stream every record in the source
    fn records(&self) -> BoxStream<'_, Result<Record>>;
}

/// Records held in memory
#[derive(Debug, Clone)]
pub struct MemorySource {
    name: String,
    records: Vec<Record>,
}

impl MemorySource {
    pub fn new(name: impl Into<String>, records: Vec<Record>) -> Self {
        Self {
            name: name.into(),
            records,
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Source for MemorySource {
    fn name(&self) -> &str {
        &self.name
    }

    fn records(&self) -> BoxStream<'_, Result<Record>> {
        stream::iter(self.records.iter().cloned().map(Ok)).boxed()
    }
}

/// One JSON record per line, e.g. `{"key": "0", "features": {"f1": 0.1}}`
#[derive(Debug, Clone)]
pub struct JsonLinesSource {
    name: String,
    path: PathBuf,
}

impl JsonLinesSource {
    pub fn new(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Source for JsonLinesSource {
    fn name(&self) -> &str {
        &self.name
    }

    fn records(&self) -> BoxStream<'_, Result<Record>> {
        let path = self.path.clone();

        stream::once(async move {
            let file = tokio::fs::File::open(&path).await.map_err(|e| {
                Error::data_source(format!("failed to read {}: {}", path.display(), e))
            })?;
            Ok::<_, Error>(LineReader {
                lines: BufReader::new(file).lines(),
                path,
                line_no: 0,
            })
        })
        .map_ok(|reader| stream::try_unfold(reader, LineReader::next_record))
        .try_flatten()
        .boxed()
    }
}

/// Reads one JSON record per line, skipping blank lines
struct LineReader {
    lines: Lines<BufReader<File>>,
    path: PathBuf,
    line_no: usize,
}

impl LineReader {
    async fn next_record(mut self) -> Result<Option<(Record, Self)>> {
        loop {
            let line = self.lines.next_line().await.map_err(|e| {
                Error::data_source(format!("failed to read {}: {}", self.path.display(), e))
            })?;
            let Some(line) = line else {
                return Ok(None);
            };
            self.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }

            let record = serde_json::from_str(&line).map_err(|e| {
                Error::invalid_data(format!(
                    "{} line {}: {}",
                    self.path.display(),
                    self.line_no,
                    e
                ))
            })?;
            return Ok(Some((record, self)));
        }
    }
}

/// Ordered collection of sources, read one after another
#[derive(Clone, Default)]
pub struct Sources {
    sources: Vec<Arc<dyn Source>>,
}

impl Sources {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a source
    pub fn with_source(mut self, source: impl Source + 'static) -> Self {
        self.sources.push(Arc::new(source));
        self
    }

    /// Add an already shared source
    pub fn push(&mut self, source: Arc<dyn Source>) {
        self.sources.push(source);
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Names of the contained sources, in order
    pub fn names(&self) -> Vec<&str> {
        self.sources.iter().map(|source| source.name()).collect()
    }

    /// Stream the records of every source in order
    pub fn records(&self) -> BoxStream<'_, Result<Record>> {
        stream::iter(self.sources.iter())
            .flat_map(|source| source.records())
            .boxed()
    }

    /// Collect every record, stopping at the first error
    pub async fn collect_records(&self) -> Result<Vec<Record>> {
        self.records().try_collect().await
    }
}

impl From<MemorySource> for Sources {
    fn from(source: MemorySource) -> Self {
        Self::new().with_source(source)
    }
}

impl std::fmt::Debug for Sources {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sources")
            .field("sources", &self.names())
            .finish()
    }
}
