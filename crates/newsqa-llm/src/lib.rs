//! newsqa-llm
//!
//! Answer generators behind `newsqa_core::traits::Generator`.

pub mod extractive;
pub mod gemini;
pub mod prompt;

pub use extractive::ExtractiveGenerator;
pub use gemini::{GeminiError, GeminiGenerator};
pub use prompt::build_prompt;

use newsqa_core::config::{LlmConfig, LlmProvider};
use newsqa_core::traits::Generator;
use tracing::info;

/// Generator selected by `llm.provider`.
pub fn get_default_generator(config: &LlmConfig) -> anyhow::Result<Box<dyn Generator>> {
    match config.provider {
        LlmProvider::Gemini => Ok(Box::new(GeminiGenerator::new(config)?)),
        LlmProvider::Extractive => {
            info!("using extractive generator");
            Ok(Box::new(ExtractiveGenerator::new()))
        }
    }
}

/// Builds the configured generator on first use, so commands that never
/// generate (build, status) do not need an API key.
pub struct DeferredGenerator {
    config: LlmConfig,
    inner: std::sync::Mutex<Option<Box<dyn Generator>>>,
}

impl DeferredGenerator {
    pub fn new(config: LlmConfig) -> Self {
        Self { config, inner: std::sync::Mutex::new(None) }
    }
}

impl Generator for DeferredGenerator {
    fn generate(&self, question: &str, context: &str) -> anyhow::Result<String> {
        let mut slot = self.inner.lock().map_err(|_| anyhow::anyhow!("generator lock poisoned"))?;
        if slot.is_none() {
            *slot = Some(get_default_generator(&self.config)?);
        }
        match slot.as_ref() {
            Some(generator) => generator.generate(question, context),
            None => anyhow::bail!("generator unavailable"),
        }
    }
}
