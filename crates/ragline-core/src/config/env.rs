use std::str::FromStr;

use ragline_memory::FailurePolicy;

use super::Config;
use crate::secret::Secret;

fn parsed<T: FromStr>(key: &str, value: &str) -> Option<T> {
    let parsed = value.trim().parse::<T>().ok();
    if parsed.is_none() {
        tracing::warn!("ignoring invalid {key} value: {value}");
    }
    parsed
}

impl Config {
    /// Apply `RAGLINE_*` environment variables on top of the loaded values.
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary key lookup. Unparseable values are
    /// logged and ignored.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("RAGLINE_LLM_BASE_URL") {
            self.llm.base_url = v;
        }
        if let Some(v) = lookup("RAGLINE_LLM_EMBEDDING_MODEL") {
            self.llm.embedding_model = v;
        }
        if let Some(v) = lookup("RAGLINE_LLM_COMPLETION_MODEL") {
            self.llm.completion_model = v;
        }
        if let Some(v) = lookup("RAGLINE_LLM_TEMPERATURE")
            && let Some(t) = parsed::<f32>("RAGLINE_LLM_TEMPERATURE", &v)
        {
            self.llm.temperature = t;
        }
        if let Some(v) = lookup("RAGLINE_LLM_MAX_TOKENS")
            && let Some(n) = parsed::<u32>("RAGLINE_LLM_MAX_TOKENS", &v)
        {
            self.llm.max_tokens = n;
        }
        if let Some(v) = lookup("RAGLINE_LLM_EMBEDDING_DIMENSION")
            && let Some(n) = parsed::<usize>("RAGLINE_LLM_EMBEDDING_DIMENSION", &v)
        {
            self.llm.embedding_dimension = Some(n);
        }
        if let Some(v) = lookup("RAGLINE_CHUNK_SIZE")
            && let Some(n) = parsed::<usize>("RAGLINE_CHUNK_SIZE", &v)
        {
            self.retrieval.chunk_size = n;
        }
        if let Some(v) = lookup("RAGLINE_CHUNK_OVERLAP")
            && let Some(n) = parsed::<usize>("RAGLINE_CHUNK_OVERLAP", &v)
        {
            self.retrieval.chunk_overlap = n;
        }
        if let Some(v) = lookup("RAGLINE_TOP_K")
            && let Some(n) = parsed::<usize>("RAGLINE_TOP_K", &v)
        {
            self.retrieval.top_k = n;
        }
        if let Some(v) = lookup("RAGLINE_EMBED_CONCURRENCY")
            && let Some(n) = parsed::<usize>("RAGLINE_EMBED_CONCURRENCY", &v)
        {
            self.retrieval.embed_concurrency = n;
        }
        if let Some(v) = lookup("RAGLINE_FAILURE_POLICY") {
            match v.trim().to_ascii_lowercase().as_str() {
                "abort" => self.retrieval.failure_policy = FailurePolicy::Abort,
                "skip" => self.retrieval.failure_policy = FailurePolicy::Skip,
                _ => tracing::warn!("ignoring invalid RAGLINE_FAILURE_POLICY value: {v}"),
            }
        }
        if let Some(v) = lookup("RAGLINE_OPENAI_API_KEY")
            && !v.trim().is_empty()
        {
            self.secrets.openai_api_key = Some(Secret::new(v.trim()));
        }
    }
}
