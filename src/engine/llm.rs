//! LLM streaming bridge and literal-citation bypass.
//!
//! The bridge forwards system and user prompts to the chat API and yields
//! text deltas as they arrive. Fragments arrive in order; dropping the
//! stream stops upstream work, so client disconnects propagate as
//! cancellation without buffering.

use crate::core::Evidence;
use crate::error::{LlmError, Result};
use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use futures_util::{StreamExt, TryStreamExt};
use serde::{Deserialize, Serialize};

/// A cold stream of answer fragments.
pub type TokenStream = futures_util::stream::BoxStream<'static, Result<String>>;

/// History turns attached to each chat request.
pub const HISTORY_WINDOW: usize = 4;

/// Sampling temperature for grounded answers.
pub const CHAT_TEMPERATURE: f32 = 0.2;

/// Message shown when a literal citation was requested but no specific
/// fragment could be located.
pub const NO_FRAGMENT_MESSAGE: &str =
    "No cuento con el fragmento específico solicitado en las fuentes cargadas. \
     Verifica la referencia (regla o artículo) y el ejercicio consultado.";

/// Role of a conversation turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// The asking professional.
    User,
    /// A previous engine answer.
    Assistant,
}

/// One turn of the short conversational window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    /// Who produced the turn.
    pub role: ChatRole,
    /// Turn text.
    pub content: String,
}

/// Injectable chat seam.
///
/// Implementations are stateless and safe for concurrent use.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Opens a streaming chat completion and returns its fragment stream.
    ///
    /// The last [`HISTORY_WINDOW`] history turns are attached between the
    /// system and user messages.
    ///
    /// # Errors
    ///
    /// Returns an error if the request cannot be built or the upstream
    /// call fails. Mid-stream failures surface as `Err` items.
    async fn stream_chat(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        history: &[ChatTurn],
    ) -> Result<TokenStream>;
}

/// Chat client backed by the OpenAI streaming API.
pub struct OpenAiChat {
    client: Client<OpenAIConfig>,
    model: String,
}

impl OpenAiChat {
    /// Creates a chat client with the given API key and model.
    #[must_use]
    pub fn new(api_key: &str, model: impl Into<String>) -> Self {
        let config = OpenAIConfig::new().with_api_key(api_key);
        Self {
            client: Client::with_config(config),
            model: model.into(),
        }
    }
}

#[async_trait]
impl ChatClient for OpenAiChat {
    async fn stream_chat(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        history: &[ChatTurn],
    ) -> Result<TokenStream> {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::new();
        messages.push(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system_prompt)
                .build()
                .map_err(LlmError::from)?
                .into(),
        );

        let tail = history.len().saturating_sub(HISTORY_WINDOW);
        for turn in &history[tail..] {
            let message: ChatCompletionRequestMessage = match turn.role {
                ChatRole::User => ChatCompletionRequestUserMessageArgs::default()
                    .content(turn.content.clone())
                    .build()
                    .map_err(LlmError::from)?
                    .into(),
                ChatRole::Assistant => ChatCompletionRequestAssistantMessageArgs::default()
                    .content(turn.content.clone())
                    .build()
                    .map_err(LlmError::from)?
                    .into(),
            };
            messages.push(message);
        }

        messages.push(
            ChatCompletionRequestUserMessageArgs::default()
                .content(user_prompt)
                .build()
                .map_err(LlmError::from)?
                .into(),
        );

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .temperature(CHAT_TEMPERATURE)
            .messages(messages)
            .build()
            .map_err(LlmError::from)?;

        let upstream = self
            .client
            .chat()
            .create_stream(request)
            .await
            .map_err(LlmError::from)?;

        let deltas = upstream
            .map(|item| match item {
                Ok(response) => Ok(response
                    .choices
                    .iter()
                    .filter_map(|choice| choice.delta.content.clone())
                    .collect::<String>()),
                Err(e) => Err(crate::error::Error::from(LlmError::Stream(e.to_string()))),
            })
            .try_filter(|delta| futures_util::future::ready(!delta.is_empty()));

        Ok(deltas.boxed())
    }
}

/// Scripted chat client yielding fixed fragments.
///
/// Stands in for the remote API in tests and offline smoke runs.
pub struct ScriptedChat {
    fragments: Vec<String>,
}

impl ScriptedChat {
    /// Creates a scripted client from its fragments.
    #[must_use]
    pub fn new<I, S>(fragments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fragments: fragments.into_iter().map(Into::into).collect(),
        }
    }
}

#[async_trait]
impl ChatClient for ScriptedChat {
    async fn stream_chat(
        &self,
        _system_prompt: &str,
        _user_prompt: &str,
        _history: &[ChatTurn],
    ) -> Result<TokenStream> {
        let fragments = self.fragments.clone();
        Ok(futures_util::stream::iter(fragments.into_iter().map(Ok)).boxed())
    }
}

/// Wraps a ready answer as a single-fragment stream.
#[must_use]
pub fn text_stream(text: String) -> TokenStream {
    futures_util::stream::once(async move { Ok(text) }).boxed()
}

/// Builds the literal-citation response from structural evidence.
///
/// The fragments with the highest `page_start` are selected (rule bodies
/// sit deeper in the PDF than index entries), ordered by `(page_start,
/// page_end, chunk_id)`, joined with blank lines, and rendered as a
/// markdown blockquote. Returns `None` when there is no evidence.
#[must_use]
pub fn literal_citation(evidence: &[Evidence]) -> Option<String> {
    let max_page = evidence.iter().map(|e| e.page_start.unwrap_or(0)).max()?;

    let mut selected: Vec<&Evidence> = evidence
        .iter()
        .filter(|e| e.page_start.unwrap_or(0) == max_page)
        .collect();
    selected.sort_by_key(|e| (e.page_start.unwrap_or(0), e.page_end.unwrap_or(0), e.chunk_id));

    let joined = selected
        .iter()
        .map(|e| e.text.as_str())
        .collect::<Vec<_>>()
        .join("\n\n");

    let quoted = joined
        .lines()
        .map(|line| format!("> {line}"))
        .collect::<Vec<_>>()
        .join("\n");

    Some(quoted)
}
