// ============================================================
// Layer 6 — Chat-Completions Language Model
// ============================================================
// LanguageModel over any OpenAI-compatible endpoint:
//
//   POST {base_url}/chat/completions
//   Authorization: Bearer <api key>
//   { "model": "...", "messages": [ {system}, {user} ], "temperature": 0.2 }
//
//   → { "choices": [ { "message": { "content": "..." } } ] }
//
// Three prompts, one per LanguageModel method. Replies are
// cleaned up by `response_parser`; this file only talks HTTP.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::domain::chunk::ChunkMetadata;
use crate::domain::error::{CollaboratorError, CollaboratorResult};
use crate::domain::evidence::Judgment;
use crate::domain::traits::LanguageModel;
use crate::infra::response_parser;

pub const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const DEFAULT_MODEL: &str    = "google/gemini-2.0-flash-001";

const SYSTEM_PROMPT: &str =
    "You are a careful research assistant. Follow the requested output format exactly.";

/// Connection settings for the chat-completions endpoint.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub temperature: f32,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            base_url:    DEFAULT_BASE_URL.to_string(),
            model:       DEFAULT_MODEL.to_string(),
            api_key:     None,
            timeout:     Duration::from_secs(30),
            temperature: 0.2,
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ReplyMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct ChatCompletionsClient {
    client: reqwest::Client,
    settings: LlmSettings,
    max_hypotheses: usize,
    max_expansions: usize,
}

impl ChatCompletionsClient {
    pub fn new(settings: LlmSettings, max_hypotheses: usize, max_expansions: usize) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(settings.timeout)
            .build()
            .context("Cannot build HTTP client for the language model")?;

        if settings.api_key.is_none() {
            tracing::warn!("No API key configured; language model calls will fail over to defaults");
        }
        Ok(Self { client, settings, max_hypotheses, max_expansions })
    }

    /// Send one system + user exchange and return the reply text.
    async fn complete(&self, user: &str) -> CollaboratorResult<String> {
        let api_key = self
            .settings
            .api_key
            .as_deref()
            .ok_or_else(|| CollaboratorError::transport("no API key configured"))?;

        let request = ChatRequest {
            model:       &self.settings.model,
            messages:    vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: user },
            ],
            temperature: self.settings.temperature,
        };

        let url = format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'));
        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| CollaboratorError::transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::transport(format!("HTTP {status}: {body}")));
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| CollaboratorError::invalid_response(format!("deserialization failed: {e}")))?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| CollaboratorError::invalid_response("reply has no content"))
    }
}

#[async_trait]
impl LanguageModel for ChatCompletionsClient {
    async fn generate_hypotheses(&self, question: &str) -> CollaboratorResult<Vec<String>> {
        let reply = self.complete(&hypotheses_prompt(question, self.max_hypotheses)).await?;
        Ok(response_parser::parse_lines(&reply, self.max_hypotheses))
    }

    async fn expand_query(&self, question: &str) -> CollaboratorResult<Vec<String>> {
        let reply = self.complete(&expansion_prompt(question, self.max_expansions)).await?;
        Ok(response_parser::parse_lines(&reply, self.max_expansions))
    }

    async fn judge(
        &self,
        hypothesis: &str,
        chunk_text: &str,
        metadata:   &ChunkMetadata,
    ) -> CollaboratorResult<Judgment> {
        let reply = self.complete(&judge_prompt(hypothesis, chunk_text, metadata)).await?;
        response_parser::parse_judgment(&reply)
    }
}

// ─── Prompts ──────────────────────────────────────────────────────────────────
fn hypotheses_prompt(question: &str, n: usize) -> String {
    format!(
        "Propose {n} distinct, testable hypotheses that could answer the research question below.\n\
         Each hypothesis must be a single declarative sentence.\n\
         Return exactly one hypothesis per line, with no numbering and no extra text.\n\n\
         Question: {question}"
    )
}

fn expansion_prompt(question: &str, n: usize) -> String {
    format!(
        "Rewrite the research question below as {n} different search queries for finding \
         relevant passages in scientific papers. Vary the terminology.\n\
         Return exactly one query per line, with no numbering and no extra text.\n\n\
         Question: {question}"
    )
}

fn judge_prompt(hypothesis: &str, chunk_text: &str, meta: &ChunkMetadata) -> String {
    let yes_no = |b: bool| if b { "yes" } else { "no" };
    format!(
        "Does the text fragment support the hypothesis?\n\n\
         Hypothesis: {hypothesis}\n\n\
         Fragment (from \"{title}\", page ~{page}; describes a method: {method}; \
         reports results: {results}; describes experiments: {experiment}):\n\
         \"\"\"\n{chunk_text}\n\"\"\"\n\n\
         Answer with a single JSON object and nothing else:\n\
         {{\"confirmed\": true|false, \"partial\": true|false, \
         \"confidence\": <number between 0 and 1>, \"reason\": \"<one sentence>\"}}\n\
         Use \"confirmed\" only when the fragment states the claim directly; use \"partial\" \
         when it supports the claim only in part or indirectly.",
        title      = meta.source_title,
        page       = meta.page_estimate,
        method     = yes_no(meta.contains_method),
        results    = yes_no(meta.contains_results),
        experiment = yes_no(meta.contains_experiment),
    )
}
