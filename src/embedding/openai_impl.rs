//! OpenAI-backed embedder.

use crate::Result;
use crate::embedding::{EMBED_DIMENSIONS, Embedder};
use crate::error::LlmError;
use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::CreateEmbeddingRequestArgs;
use async_trait::async_trait;

/// Embedder backed by the OpenAI embeddings API.
///
/// Stateless and safe for concurrent use. Newlines are stripped from
/// inputs before the request.
pub struct OpenAiEmbedder {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiEmbedder {
    /// Creates an embedder with the given API key and model.
    #[must_use]
    pub fn new(api_key: &str, model: impl Into<String>) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
            model: model.into(),
        }
    }

    fn sanitize(text: &str) -> String {
        text.replace('\n', " ")
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    fn dimensions(&self) -> usize {
        EMBED_DIMENSIONS
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let input = [text.to_string()];
        let mut vectors = self.embed_batch(&input).await?;
        vectors.pop().ok_or_else(|| {
            LlmError::Api("embeddings response carried no data".to_string()).into()
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let inputs: Vec<String> = texts.iter().map(|t| Self::sanitize(t)).collect();
        let request = CreateEmbeddingRequestArgs::default()
            .model(&self.model)
            .input(inputs)
            .build()
            .map_err(LlmError::from)?;

        let response = self
            .client
            .embeddings()
            .create(request)
            .await
            .map_err(LlmError::from)?;

        // Place each vector by its response index
        let mut vectors: Vec<Vec<f32>> = vec![Vec::new(); texts.len()];
        for item in response.data {
            let idx = item.index as usize;
            if let Some(slot) = vectors.get_mut(idx) {
                *slot = item.embedding;
            }
        }

        if vectors.iter().any(Vec::is_empty) {
            return Err(LlmError::Api(format!(
                "embeddings response incomplete: expected {} vectors",
                texts.len()
            ))
            .into());
        }

        Ok(vectors)
    }
}
