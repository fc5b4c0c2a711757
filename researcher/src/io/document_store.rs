//! Local document store: chunked ingestion and similarity lookup.
//!
//! Chunks are kept in memory behind an `RwLock` so missions can read while an
//! ingestion runs. When a path is configured, chunks (not embeddings) are
//! persisted as JSON after every ingestion and re-embedded on load.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, instrument};

use crate::io::config::{DocumentsConfig, write_atomic};

const DEFAULT_DIMENSIONS: usize = 512;
const STORE_VERSION: u32 = 1;

/// Maps text to a fixed-dimension vector.
pub trait Embedder: Send + Sync {
    fn embed(&self, text: &str) -> Vec<f32>;
}

/// Feature-hashing embedder: lowercased alphanumeric tokens are hashed with
/// SHA-256 into buckets and the count vector is L2-normalized.
#[derive(Debug, Clone)]
pub struct HashingEmbedder {
    dimensions: usize,
}

impl HashingEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self {
            dimensions: dimensions.max(1),
        }
    }
}

impl Default for HashingEmbedder {
    fn default() -> Self {
        Self::new(DEFAULT_DIMENSIONS)
    }
}

impl Embedder for HashingEmbedder {
    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0f32; self.dimensions];
        for token in tokenize(text) {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket = [0u8; 8];
            bucket.copy_from_slice(&digest[..8]);
            // Dimensions are small, so the modulo always fits in usize.
            let index = (u64::from_le_bytes(bucket) % self.dimensions as u64) as usize;
            vector[index] += 1.0;
        }
        normalize(&mut vector);
        vector
    }
}

fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
}

fn normalize(vector: &mut [f32]) {
    let norm = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
    if norm > 0.0 {
        for value in vector.iter_mut() {
            *value /= norm;
        }
    }
}

fn cosine(a: &[f32], b: &[f32]) -> f32 {
    // Both vectors are normalized by the embedder.
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Stored unit of text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentChunk {
    pub id: String,
    pub source: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScoredChunk {
    pub chunk: DocumentChunk,
    pub score: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct StoreFile {
    version: u32,
    chunks: Vec<DocumentChunk>,
}

struct IndexedChunk {
    chunk: DocumentChunk,
    embedding: Vec<f32>,
}

/// Split `text` into contiguous chunks of `chunk_size` characters.
pub fn chunk_text(text: &str, chunk_size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(chunk_size.max(1))
        .map(|chunk| chunk.iter().collect())
        .collect()
}

pub struct DocumentStore {
    chunks: RwLock<Vec<IndexedChunk>>,
    embedder: Arc<dyn Embedder>,
    chunk_size: usize,
    path: Option<PathBuf>,
}

impl DocumentStore {
    /// In-memory store with the default embedder.
    pub fn new(chunk_size: usize) -> Self {
        Self {
            chunks: RwLock::new(Vec::new()),
            embedder: Arc::new(HashingEmbedder::default()),
            chunk_size: chunk_size.max(1),
            path: None,
        }
    }

    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = embedder;
        self
    }

    /// Open a persisted store. A missing file yields an empty store that will
    /// be created on first ingestion.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn open(path: &Path, chunk_size: usize) -> Result<Self> {
        let mut store = Self::new(chunk_size);
        store.path = Some(path.to_path_buf());
        if path.exists() {
            let contents =
                fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
            let file: StoreFile = serde_json::from_str(&contents)
                .with_context(|| format!("parse {}", path.display()))?;
            if file.version != STORE_VERSION {
                return Err(anyhow!(
                    "unsupported document store version {} in {}",
                    file.version,
                    path.display()
                ));
            }
            let indexed = file
                .chunks
                .into_iter()
                .map(|chunk| store.index(chunk))
                .collect();
            *store.chunks.get_mut().map_err(|_| anyhow!("lock poisoned"))? = indexed;
            info!(chunks = store.len(), "document store loaded");
        }
        Ok(store)
    }

    pub fn from_config(config: &DocumentsConfig) -> Result<Self> {
        if config.persist {
            Self::open(&config.store_path, config.chunk_size)
        } else {
            Ok(Self::new(config.chunk_size))
        }
    }

    fn index(&self, chunk: DocumentChunk) -> IndexedChunk {
        let embedding = self.embedder.embed(&chunk.content);
        IndexedChunk { chunk, embedding }
    }

    pub fn len(&self) -> usize {
        self.chunks.read().map(|chunks| chunks.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stored chunks in insertion order.
    pub fn chunks(&self) -> Result<Vec<DocumentChunk>> {
        let chunks = self
            .chunks
            .read()
            .map_err(|_| anyhow!("document store lock poisoned"))?;
        Ok(chunks.iter().map(|c| c.chunk.clone()).collect())
    }

    /// Chunk, index and store `text` under `source`. Returns the chunk count.
    ///
    /// Chunk ids are `{source}_{index}`; re-ingesting a source replaces chunks
    /// with the same id.
    #[instrument(skip_all, fields(source = source, bytes = text.len()))]
    pub fn ingest(&self, text: &str, source: &str) -> Result<usize> {
        let source = source.trim();
        if source.is_empty() {
            return Err(anyhow!("source label must be non-empty"));
        }
        let pieces = chunk_text(text, self.chunk_size);
        let indexed: Vec<IndexedChunk> = pieces
            .into_iter()
            .enumerate()
            .map(|(i, content)| {
                self.index(DocumentChunk {
                    id: format!("{source}_{i}"),
                    source: source.to_string(),
                    content,
                })
            })
            .collect();
        let count = indexed.len();

        let mut chunks = self
            .chunks
            .write()
            .map_err(|_| anyhow!("document store lock poisoned"))?;
        // Persist the merged list first; memory changes only once it is on disk.
        if let Some(path) = &self.path {
            let mut snapshot: Vec<DocumentChunk> = chunks.iter().map(|c| c.chunk.clone()).collect();
            for item in &indexed {
                upsert(&mut snapshot, item.chunk.clone(), |c| c.id.as_str());
            }
            persist(path, snapshot)?;
        }
        for item in indexed {
            upsert(&mut *chunks, item, |c| c.chunk.id.as_str());
        }
        drop(chunks);
        info!(chunks = count, "ingested document");
        Ok(count)
    }

    /// Up to `top_k` chunks ranked by similarity to `query`. Chunks with no
    /// overlap are dropped; ties keep insertion order.
    pub fn query(&self, query: &str, top_k: usize) -> Result<Vec<ScoredChunk>> {
        let needle = self.embedder.embed(query);
        let chunks = self
            .chunks
            .read()
            .map_err(|_| anyhow!("document store lock poisoned"))?;
        let mut scored: Vec<ScoredChunk> = chunks
            .iter()
            .map(|c| ScoredChunk {
                chunk: c.chunk.clone(),
                score: cosine(&needle, &c.embedding),
            })
            .filter(|s| s.score > 0.0)
            .collect();
        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(top_k);
        debug!(candidates = chunks.len(), hits = scored.len(), "document query");
        Ok(scored)
    }
}

/// Replace the entry with the same id as `item`, or append it.
fn upsert<T>(items: &mut Vec<T>, item: T, id: impl Fn(&T) -> &str) {
    match items.iter().position(|existing| id(existing) == id(&item)) {
        Some(index) => items[index] = item,
        None => items.push(item),
    }
}

fn persist(path: &Path, chunks: Vec<DocumentChunk>) -> Result<()> {
    let file = StoreFile {
        version: STORE_VERSION,
        chunks,
    };
    let mut buf = serde_json::to_string_pretty(&file).context("serialize document store")?;
    buf.push('\n');
    write_atomic(path, buf.as_bytes())
}
