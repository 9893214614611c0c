//! Knowledge store and retriever.
//!
//! The corpus is loaded and indexed once at startup and is immutable
//! afterwards, so the store is shared across event handlers without
//! locking. Two strategies are supported: passing the whole corpus as
//! context on every query, and chunk retrieval ranked by cosine similarity
//! over embeddings. Retrieval never fails an event; embedding errors at
//! query time degrade to an empty result.

pub mod chunker;

use std::cmp::Ordering;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::{
    base::{
        config::{Config, RetrievalMode},
        types::Res,
    },
    service::llm::LlmClient,
};

pub use chunker::{CorpusChunker, KnowledgeChunk};

/// Ordered `(chunk, score)` list, bounded to the configured top-N.
#[derive(Debug, Clone, Default)]
pub struct RetrievalResult {
    pub entries: Vec<(KnowledgeChunk, f32)>,
}

impl RetrievalResult {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Concatenate the retrieved chunk texts, separator preserved.
    pub fn context_text(&self) -> String {
        self.entries.iter().map(|(chunk, _)| chunk.text.as_str()).collect::<Vec<_>>().join("\n\n")
    }
}

/// The immutable index behind the store.
enum KnowledgeIndex {
    Whole { corpus: String },
    Chunked { chunks: Vec<KnowledgeChunk>, vectors: Vec<Vec<f32>> },
}

/// Read-only knowledge store, built once at startup.
pub struct KnowledgeStore {
    index: KnowledgeIndex,
    llm: LlmClient,
    top_n: usize,
    score_floor: f32,
}

impl KnowledgeStore {
    /// Load the corpus and build the configured index.
    ///
    /// A missing corpus file is a fatal startup error; an empty corpus is
    /// served as permanently empty retrieval with a warning.
    #[instrument(skip_all)]
    pub async fn load(config: &Config, llm: LlmClient) -> Res<Self> {
        let corpus = std::fs::read_to_string(&config.corpus_path).map_err(|e| anyhow::anyhow!("Failed to read corpus at {}: {}", config.corpus_path, e))?;

        if corpus.trim().is_empty() {
            warn!("Knowledge corpus at {} is empty; every answer will use the no-information phrase.", config.corpus_path);
        }

        match config.retrieval_mode {
            RetrievalMode::WholeCorpus => Ok(Self::whole_corpus(corpus, llm)),
            RetrievalMode::Chunked => {
                let fingerprint = corpus_fingerprint(&corpus);

                // Reuse the persisted index when it still matches the corpus.
                if let Some(path) = &config.index_path
                    && let Some((chunks, vectors)) = load_index(path, fingerprint)
                {
                    info!("Loaded persisted vector index from {} ({} chunks)", path, chunks.len());
                    return Ok(Self::chunked(chunks, vectors, llm, config.retrieval_top_n, config.retrieval_score_floor));
                }

                let chunker = CorpusChunker::new(config.chunk_max_len, config.chunk_min_len, config.chunk_overlap);
                let chunks = chunker.chunk(&corpus);

                info!("Chunked corpus into {} chunks", chunks.len());

                let mut vectors = Vec::with_capacity(chunks.len());
                for chunk in &chunks {
                    vectors.push(llm.embed(&chunk.text).await?);
                }

                if let Some(path) = &config.index_path {
                    persist_index(path, fingerprint, &chunks, &vectors);
                }

                Ok(Self::chunked(chunks, vectors, llm, config.retrieval_top_n, config.retrieval_score_floor))
            }
        }
    }

    pub fn whole_corpus(corpus: String, llm: LlmClient) -> Self {
        Self {
            index: KnowledgeIndex::Whole { corpus },
            llm,
            top_n: 1,
            score_floor: 0.0,
        }
    }

    pub fn chunked(chunks: Vec<KnowledgeChunk>, vectors: Vec<Vec<f32>>, llm: LlmClient, top_n: usize, score_floor: f32) -> Self {
        Self {
            index: KnowledgeIndex::Chunked { chunks, vectors },
            llm,
            top_n,
            score_floor,
        }
    }

    /// Look up the context for a query.
    ///
    /// Never fails the event: embedding errors are logged and produce an
    /// empty result, which downstream turns into the no-information answer.
    #[instrument(skip_all)]
    pub async fn retrieve(&self, query: &str) -> RetrievalResult {
        match &self.index {
            KnowledgeIndex::Whole { corpus } => {
                if corpus.trim().is_empty() {
                    return RetrievalResult::empty();
                }

                RetrievalResult {
                    entries: vec![(
                        KnowledgeChunk {
                            id: 0,
                            text: corpus.clone(),
                            source_tag: "corpus".to_string(),
                        },
                        1.0,
                    )],
                }
            }
            KnowledgeIndex::Chunked { chunks, vectors } => {
                if chunks.is_empty() {
                    return RetrievalResult::empty();
                }

                let query_vector = match self.llm.embed(query).await {
                    Ok(vector) => vector,
                    Err(err) => {
                        warn!("Query embedding failed, returning empty retrieval: {}", err);
                        return RetrievalResult::empty();
                    }
                };

                // Stable sort keeps insertion order between equal scores.
                let mut scored: Vec<(usize, f32)> = vectors.iter().enumerate().map(|(i, v)| (i, cosine_similarity(&query_vector, v))).collect();
                scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
                scored.truncate(self.top_n);

                if scored.first().is_none_or(|(_, score)| *score < self.score_floor) {
                    return RetrievalResult::empty();
                }

                RetrievalResult {
                    entries: scored.into_iter().map(|(i, score)| (chunks[i].clone(), score)).collect(),
                }
            }
        }
    }
}

/// Cosine similarity of two vectors; zero when either has no magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

// Index persistence.

#[derive(Serialize, Deserialize)]
struct PersistedIndex {
    fingerprint: u64,
    built_at: String,
    entries: Vec<PersistedEntry>,
}

#[derive(Serialize, Deserialize)]
struct PersistedEntry {
    text: String,
    source_tag: String,
    vector: Vec<f32>,
}

fn corpus_fingerprint(corpus: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    corpus.hash(&mut hasher);
    hasher.finish()
}

/// Load a persisted index if it exists, is non-empty, and matches the
/// current corpus fingerprint.
fn load_index(path: &str, fingerprint: u64) -> Option<(Vec<KnowledgeChunk>, Vec<Vec<f32>>)> {
    let raw = std::fs::read_to_string(path).ok()?;
    if raw.trim().is_empty() {
        return None;
    }

    let index: PersistedIndex = match serde_json::from_str(&raw) {
        Ok(index) => index,
        Err(err) => {
            warn!("Ignoring unreadable vector index at {}: {}", path, err);
            return None;
        }
    };

    if index.fingerprint != fingerprint || index.entries.is_empty() {
        return None;
    }

    let (chunks, vectors) = index
        .entries
        .into_iter()
        .enumerate()
        .map(|(id, entry)| {
            (
                KnowledgeChunk {
                    id,
                    text: entry.text,
                    source_tag: entry.source_tag,
                },
                entry.vector,
            )
        })
        .unzip();

    Some((chunks, vectors))
}

/// Persist the freshly built index; failure is logged, never fatal.
fn persist_index(path: &str, fingerprint: u64, chunks: &[KnowledgeChunk], vectors: &[Vec<f32>]) {
    let index = PersistedIndex {
        fingerprint,
        built_at: chrono::Utc::now().to_rfc3339(),
        entries: chunks
            .iter()
            .zip(vectors)
            .map(|(chunk, vector)| PersistedEntry {
                text: chunk.text.clone(),
                source_tag: chunk.source_tag.clone(),
                vector: vector.clone(),
            })
            .collect(),
    };

    let result = serde_json::to_string(&index).map_err(anyhow::Error::from).and_then(|json| std::fs::write(path, json).map_err(anyhow::Error::from));

    if let Err(err) = result {
        warn!("Failed to persist vector index to {}: {}", path, err);
    }
}

// Tests.

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;

    use super::*;
    use crate::base::prompts::ComposedPrompt;
    use crate::service::llm::GenericLlmClient;

    /// Embeds every text to one fixed vector.
    struct StubEmbedder {
        vector: Vec<f32>,
    }

    #[async_trait]
    impl GenericLlmClient for StubEmbedder {
        async fn generate(&self, _prompt: &ComposedPrompt) -> Res<String> {
            Err(anyhow::anyhow!("generation is not part of retrieval"))
        }

        async fn embed(&self, _text: &str) -> Res<Vec<f32>> {
            Ok(self.vector.clone())
        }
    }

    /// Always fails to embed.
    struct BrokenEmbedder;

    #[async_trait]
    impl GenericLlmClient for BrokenEmbedder {
        async fn generate(&self, _prompt: &ComposedPrompt) -> Res<String> {
            Err(anyhow::anyhow!("generation is not part of retrieval"))
        }

        async fn embed(&self, _text: &str) -> Res<Vec<f32>> {
            Err(anyhow::anyhow!("embedding service unavailable"))
        }
    }

    fn chunk(id: usize, text: &str) -> KnowledgeChunk {
        KnowledgeChunk {
            id,
            text: text.to_string(),
            source_tag: "guide".to_string(),
        }
    }

    fn stub_llm(vector: Vec<f32>) -> LlmClient {
        LlmClient::new(Arc::new(StubEmbedder { vector }))
    }

    #[test]
    fn cosine_similarity_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).abs() < 1e-6);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
    }

    #[tokio::test]
    async fn ranks_by_similarity_and_bounds_to_top_n() {
        let chunks = vec![chunk(0, "parking"), chunk(1, "vacation"), chunk(2, "kitchen")];
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![0.7, 0.7]];
        let store = KnowledgeStore::chunked(chunks, vectors, stub_llm(vec![0.0, 1.0]), 2, 0.1);

        let result = store.retrieve("how much vacation do I get?").await;

        assert_eq!(result.entries.len(), 2);
        assert_eq!(result.entries[0].0.text, "vacation");
        assert_eq!(result.entries[1].0.text, "kitchen");
    }

    #[tokio::test]
    async fn equal_scores_keep_insertion_order() {
        let chunks = vec![chunk(0, "first"), chunk(1, "second"), chunk(2, "third")];
        let vectors = vec![vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 0.0]];
        let store = KnowledgeStore::chunked(chunks, vectors, stub_llm(vec![1.0, 0.0]), 3, 0.1);

        let result = store.retrieve("anything").await;

        let texts: Vec<&str> = result.entries.iter().map(|(c, _)| c.text.as_str()).collect();
        assert_eq!(texts, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn below_floor_retrieval_is_empty() {
        let chunks = vec![chunk(0, "parking")];
        let vectors = vec![vec![1.0, 0.0]];
        let store = KnowledgeStore::chunked(chunks, vectors, stub_llm(vec![0.0, 1.0]), 3, 0.5);

        assert!(store.retrieve("unrelated question").await.is_empty());
    }

    #[tokio::test]
    async fn embedding_failure_degrades_to_empty() {
        let chunks = vec![chunk(0, "parking")];
        let vectors = vec![vec![1.0, 0.0]];
        let store = KnowledgeStore::chunked(chunks, vectors, LlmClient::new(Arc::new(BrokenEmbedder)), 3, 0.0);

        assert!(store.retrieve("anything").await.is_empty());
    }

    #[tokio::test]
    async fn whole_corpus_is_always_the_context() {
        let store = KnowledgeStore::whole_corpus("The whole guide text.".to_string(), stub_llm(vec![1.0]));

        let result = store.retrieve("anything").await;

        assert_eq!(result.context_text(), "The whole guide text.");
    }

    #[tokio::test]
    async fn empty_corpus_retrieves_nothing() {
        let store = KnowledgeStore::whole_corpus("  \n".to_string(), stub_llm(vec![1.0]));

        assert!(store.retrieve("anything").await.is_empty());
    }

    #[test]
    fn context_text_preserves_chunk_separator() {
        let result = RetrievalResult {
            entries: vec![(chunk(0, "first fact"), 0.9), (chunk(1, "second fact"), 0.8)],
        };

        assert_eq!(result.context_text(), "first fact\n\nsecond fact");
    }
}
