mod openai;

pub use openai::OpenAiCompatModel;

use async_trait::async_trait;
use futures_util::stream::{self, Stream};
use std::pin::Pin;

pub type TextStream = Pin<Box<dyn Stream<Item = anyhow::Result<String>> + Send>>;

/// Planning / Synthesis collaborator: given a prompt, returns text.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier for logs.
    fn name(&self) -> &str;

    async fn complete(&self, system: Option<&str>, prompt: &str) -> anyhow::Result<String>;

    /// Stream the completion incrementally. The default requests the full
    /// response and yields it in paragraph chunks, for providers without
    /// native streaming; chunk concatenation reproduces the response exactly.
    async fn complete_stream(
        &self,
        system: Option<&str>,
        prompt: &str,
    ) -> anyhow::Result<TextStream> {
        let text = self.complete(system, prompt).await?;
        let chunks: Vec<anyhow::Result<String>> =
            split_chunks(&text).into_iter().map(Ok).collect();
        Ok(Box::pin(stream::iter(chunks)))
    }
}

fn split_chunks(text: &str) -> Vec<String> {
    if text.is_empty() {
        return Vec::new();
    }
    text.split_inclusive("\n\n").map(ToString::to_string).collect()
}
