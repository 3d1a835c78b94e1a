//! Query-time engine facade.
//!
//! Wires expansion, embedding, routed retrieval, prompt assembly, and the
//! streaming bridge behind one `answer` call. Each request runs on one
//! worker: the store handle is held for the whole request, every external
//! call carries its own deadline, and dropping the returned stream
//! cancels upstream work.

pub mod llm;
pub mod prompt;

pub use llm::{
    ChatClient, ChatRole, ChatTurn, NO_FRAGMENT_MESSAGE, OpenAiChat, ScriptedChat, TokenStream,
};
pub use prompt::{CONTEXT_CHAR_BUDGET, PromptSet};

use crate::embedding::Embedder;
use crate::error::{LlmError, Result};
use crate::retrieval::fallback::{RetrievalOutcome, Route, retrieve_with_fallback};
use crate::routing::expand_query;
use crate::storage::Store;
use serde::Serialize;
use std::time::Duration;
use tracing::info;

/// Fiscal year assumed when the request does not name one.
pub const DEFAULT_FISCAL_YEAR: i32 = 2025;

/// Deadline for the query embedding call.
const EMBED_TIMEOUT_SECS: u64 = 30;

/// Deadline for opening the chat stream.
const CHAT_TIMEOUT_SECS: u64 = 60;

/// One chat request.
#[derive(Debug, Clone)]
pub struct AnswerRequest {
    /// The professional's question.
    pub question: String,
    /// Optional tax regime framing.
    pub regimen: Option<String>,
    /// Requested fiscal year; defaults to [`DEFAULT_FISCAL_YEAR`].
    pub ejercicio: Option<i32>,
    /// Short conversational window, oldest first.
    pub history: Vec<ChatTurn>,
}

impl AnswerRequest {
    /// Builds a bare request for a question.
    #[must_use]
    pub fn question(question: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            regimen: None,
            ejercicio: None,
            history: Vec::new(),
        }
    }
}

/// One evidence source reference in the debug trace.
#[derive(Debug, Clone, Serialize)]
pub struct SourceRef {
    /// Route that produced the entry.
    pub source: &'static str,
    /// Owning document.
    pub document_id: String,
    /// Chunk norm kind.
    pub norm_kind: String,
    /// Canonical norm identifier.
    pub norm_id: String,
    /// Retrieval score.
    pub score: f32,
}

/// Debug trace of one answered request.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerDebug {
    /// Route taken (`rmf_rule_lookup`, `article_lookup`, `hybrid`,
    /// `empty`).
    pub route_used: &'static str,
    /// Year the evidence came from; 0 for evergreen article routes.
    pub used_year: i32,
    /// Number of evidence entries.
    pub evidence_count: usize,
    /// Evidence source references, best first.
    pub sources: Vec<SourceRef>,
}

impl AnswerDebug {
    fn of(outcome: &RetrievalOutcome) -> Self {
        Self {
            route_used: outcome.route.as_str(),
            used_year: outcome.used_year,
            evidence_count: outcome.evidence.len(),
            sources: outcome
                .evidence
                .iter()
                .map(|e| SourceRef {
                    source: e.origin.as_str(),
                    document_id: e.document_id.clone(),
                    norm_kind: e.norm_kind.clone(),
                    norm_id: e.norm_id.clone(),
                    score: e.score,
                })
                .collect(),
        }
    }
}

/// A streamed answer with its debug trace.
pub struct Answer {
    /// Fragment stream; concatenate to obtain the full answer.
    pub stream: TokenStream,
    /// Retrieval trace for the `trace` flag.
    pub debug: AnswerDebug,
}

/// The retrieval engine facade.
///
/// Generic over its three seams so tests can inject an in-memory store, a
/// deterministic embedder, and a scripted chat client.
pub struct RagEngine<S, E, C> {
    store: S,
    embedder: E,
    chat: C,
    prompts: PromptSet,
    top_k: usize,
}

impl<S: Store, E: Embedder, C: ChatClient> RagEngine<S, E, C> {
    /// Assembles an engine from its collaborators.
    pub const fn new(store: S, embedder: E, chat: C, prompts: PromptSet, top_k: usize) -> Self {
        Self {
            store,
            embedder,
            chat,
            prompts,
            top_k,
        }
    }

    /// Read access to the underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Answers one question, returning the fragment stream and trace.
    ///
    /// Retrieval emptiness is not an error: the model is invoked with an
    /// empty-context placeholder and instructed to acknowledge the
    /// absence. Literal-citation requests short-circuit the model
    /// entirely.
    ///
    /// # Errors
    ///
    /// Returns an error on store failures, embedding/chat transport
    /// failures, or exceeded deadlines.
    pub async fn answer(&self, request: AnswerRequest) -> Result<Answer> {
        let ejercicio = request.ejercicio.unwrap_or(DEFAULT_FISCAL_YEAR);

        let (expanded_query, keywords) = expand_query(&request.question);

        let query_vec = tokio::time::timeout(
            Duration::from_secs(EMBED_TIMEOUT_SECS),
            self.embedder.embed(&expanded_query),
        )
        .await
        .map_err(|_| LlmError::Timeout {
            operation: "embedding",
            seconds: EMBED_TIMEOUT_SECS,
        })??;

        let outcome = retrieve_with_fallback(
            &self.store,
            &request.question,
            ejercicio,
            &query_vec,
            &keywords,
            self.top_k,
        )?;

        info!(
            route = outcome.route.as_str(),
            used_year = outcome.used_year,
            evidence = outcome.evidence.len(),
            literal = outcome.literal,
            "retrieval complete"
        );

        let debug = AnswerDebug::of(&outcome);

        if outcome.literal {
            let text = match outcome.route {
                Route::RmfRuleLookup | Route::ArticleLookup => {
                    llm::literal_citation(&outcome.evidence)
                        .unwrap_or_else(|| NO_FRAGMENT_MESSAGE.to_string())
                }
                // A verbatim request the structural lookups could not
                // ground must not be paraphrased
                Route::Hybrid | Route::Empty => NO_FRAGMENT_MESSAGE.to_string(),
            };
            return Ok(Answer {
                stream: llm::text_stream(text),
                debug,
            });
        }

        let context_block = prompt::build_context_block(&outcome.evidence, CONTEXT_CHAR_BUDGET);
        let system_prompt = prompt::build_system_prompt(&self.prompts.system_template, &context_block);
        let user_prompt = prompt::build_user_prompt(
            &request.question,
            ejercicio,
            outcome.used_year,
            request.regimen.as_deref(),
        );

        let stream = tokio::time::timeout(
            Duration::from_secs(CHAT_TIMEOUT_SECS),
            self.chat.stream_chat(&system_prompt, &user_prompt, &request.history),
        )
        .await
        .map_err(|_| LlmError::Timeout {
            operation: "chat",
            seconds: CHAT_TIMEOUT_SECS,
        })??;

        Ok(Answer { stream, debug })
    }
}
