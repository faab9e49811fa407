use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One scored piece of documentation returned by a search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredChunk {
    pub text: String,
    pub score: f64,
}

/// Retrieval collaborator: scored text chunks for a query, best first.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn search(&self, query: &str) -> anyhow::Result<Vec<ScoredChunk>>;
}

/// Keyword-overlap index over the tool documentation. Relevance scoring
/// proper is out of scope; this stays behind the trait so a real backend can
/// replace it without touching the pipeline.
pub struct KeywordIndex {
    chunks: Vec<String>,
    top_k: usize,
}

impl KeywordIndex {
    pub fn new(chunks: Vec<String>, top_k: usize) -> Self {
        Self { chunks, top_k }
    }
}

#[async_trait]
impl Retriever for KeywordIndex {
    async fn search(&self, query: &str) -> anyhow::Result<Vec<ScoredChunk>> {
        let query_terms = tokenize(query);
        if query_terms.is_empty() {
            return Ok(Vec::new());
        }

        let mut scored: Vec<ScoredChunk> = self
            .chunks
            .iter()
            .filter_map(|chunk| {
                let chunk_terms = tokenize(chunk);
                let overlap = query_terms.intersection(&chunk_terms).count();
                if overlap == 0 {
                    return None;
                }
                Some(ScoredChunk {
                    text: chunk.clone(),
                    score: overlap as f64 / query_terms.len() as f64,
                })
            })
            .collect();

        scored.sort_by(|a, b| b.score.total_cmp(&a.score));
        scored.truncate(self.top_k);
        Ok(scored)
    }
}

fn tokenize(text: &str) -> BTreeSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|term| term.len() > 1)
        .map(str::to_lowercase)
        .collect()
}
