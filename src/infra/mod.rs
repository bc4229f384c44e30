// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// Everything that talks to the outside world:
//
//   arxiv.rs           — paper discovery over the arXiv Atom API
//                        (reqwest + quick-xml serde)
//
//   download_cache.rs  — remote documents cached on disk under
//                        a directory named by blake3(url)
//
//   llm_client.rs      — LanguageModel over an OpenAI-compatible
//                        chat-completions endpoint
//
//   response_parser.rs — turns free-form model replies into
//                        clean lists and Judgments
//
//   config_store.rs    — RunConfig as JSON on disk
//
// Keeping these here means the application layer only ever
// sees the Layer 3 traits, so any of them can be swapped for a
// local or scripted implementation.
//
// Reference: Rust Book §7 (Modules)
//            Rust Book §9 (Error Handling with anyhow)

/// arXiv Atom API client
pub mod arxiv;

/// On-disk cache of downloaded documents
pub mod download_cache;

/// Chat-completions language model client
pub mod llm_client;

/// Parsing of language model replies
pub mod response_parser;

/// RunConfig loading and saving
pub mod config_store;
