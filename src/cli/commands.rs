// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `ask`, `discover` and `config`
// and all their configurable flags. `config --save FILE` writes
// a file that `--config FILE` reads back.
//
// Run settings resolve in three steps:
//   1. RunConfig::default()
//   2. --config FILE (JSON, every field optional)
//   3. individual flags, which always win
//
// clap's derive macros automatically generate:
//   - help text (--help)
//   - error messages for missing args
//   - type conversion (string → usize, u64, etc.)
//
// Reference: Rust Book §12 (Building a CLI Program)

use anyhow::Result;
use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::domain::chunk::MetadataFilter;
use crate::domain::config::RunConfig;
use crate::infra::config_store;
use crate::infra::llm_client::{self, LlmSettings};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Answer a research question from papers
    Ask(AskArgs),

    /// List the papers discovery finds for a query
    Discover(DiscoverArgs),

    /// Print the effective run configuration as JSON
    Config(ConfigArgs),
}

/// Run settings shared by every command that builds a RunConfig.
#[derive(Args, Debug, Default)]
pub struct RunArgs {
    /// JSON file with run settings; flags below override it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Extra discovery passes allowed when evidence is thin
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Maximum stage invocations before the run is halted
    #[arg(long)]
    pub step_budget: Option<u32>,

    /// Concurrent external calls inside one stage
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Results requested per similarity query
    #[arg(long)]
    pub k: Option<usize>,

    /// Papers requested on the first discovery pass
    #[arg(long)]
    pub max_papers: Option<usize>,

    /// Confirmed chunks needed to skip a retry
    #[arg(long)]
    pub min_confirmed: Option<usize>,

    /// Timeout for every language model and index call
    #[arg(long)]
    pub call_timeout_secs: Option<u64>,

    /// Timeout for discovery and downloads
    #[arg(long)]
    pub fetch_timeout_secs: Option<u64>,

    /// Only search chunks that describe a method
    #[arg(long)]
    pub require_method: bool,

    /// Only search chunks that report results
    #[arg(long)]
    pub require_results: bool,
}

impl RunArgs {
    /// Defaults, then the config file, then flags; validated.
    pub fn resolve(&self) -> Result<RunConfig> {
        let mut cfg = config_store::load_or_default(self.config.as_deref())?;

        if let Some(v) = self.max_retries        { cfg.max_retries = v; }
        if let Some(v) = self.step_budget        { cfg.step_budget = v; }
        if let Some(v) = self.concurrency        { cfg.concurrency_limit = v; }
        if let Some(v) = self.k                  { cfg.k = v; }
        if let Some(v) = self.max_papers         { cfg.max_papers = v; }
        if let Some(v) = self.min_confirmed      { cfg.min_confirmed = v; }
        if let Some(v) = self.call_timeout_secs  { cfg.call_timeout_secs = v; }
        if let Some(v) = self.fetch_timeout_secs { cfg.fetch_timeout_secs = v; }

        if self.require_method || self.require_results {
            let filter = cfg.metadata_filter.get_or_insert_with(MetadataFilter::default);
            if self.require_method  { filter.contains_method = Some(true); }
            if self.require_results { filter.contains_results = Some(true); }
        }

        cfg.validate()?;
        Ok(cfg)
    }
}

/// Language model endpoint flags.
#[derive(Args, Debug)]
pub struct LlmArgs {
    /// Base URL of an OpenAI-compatible chat-completions API
    #[arg(long, default_value = llm_client::DEFAULT_BASE_URL)]
    pub llm_base_url: String,

    /// Model name sent with every request
    #[arg(long, default_value = llm_client::DEFAULT_MODEL)]
    pub llm_model: String,

    /// API key for the language model endpoint
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,
}

/// Convert CLI LlmArgs into infrastructure LlmSettings.
/// The timeout is filled in from the run config later.
impl From<LlmArgs> for LlmSettings {
    fn from(a: LlmArgs) -> Self {
        LlmSettings {
            base_url: a.llm_base_url,
            model:    a.llm_model,
            api_key:  a.api_key,
            ..LlmSettings::default()
        }
    }
}

/// All arguments for the `ask` command
#[derive(Args, Debug)]
pub struct AskArgs {
    /// The research question to answer
    #[arg(long)]
    pub question: String,

    /// Directory of *.json paper records to use instead of arXiv
    #[arg(long)]
    pub corpus_dir: Option<PathBuf>,

    /// Where downloaded documents are cached
    #[arg(long, default_value = ".cache/documents")]
    pub cache_dir: PathBuf,

    /// Print the final run state as JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Also print the stages the run went through
    #[arg(long)]
    pub trace: bool,

    #[command(flatten)]
    pub run: RunArgs,

    #[command(flatten)]
    pub llm: LlmArgs,
}

/// All arguments for the `discover` command
#[derive(Args, Debug)]
pub struct DiscoverArgs {
    /// Free-text search query
    #[arg(long)]
    pub query: String,

    /// Maximum number of papers to list
    #[arg(long, default_value_t = 10)]
    pub max_results: usize,

    /// Directory of *.json paper records to use instead of arXiv
    #[arg(long)]
    pub corpus_dir: Option<PathBuf>,

    /// Timeout for the discovery call
    #[arg(long, default_value_t = 15)]
    pub fetch_timeout_secs: u64,
}

/// All arguments for the `config` command
#[derive(Args, Debug)]
pub struct ConfigArgs {
    /// Also write the effective config to this JSON file
    #[arg(long)]
    pub save: Option<PathBuf>,

    #[command(flatten)]
    pub run: RunArgs,
}
