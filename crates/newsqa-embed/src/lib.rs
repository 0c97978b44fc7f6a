//! newsqa-embed
//!
//! Embedding functions behind `newsqa_core::traits::Embedder`:
//! - [`MiniLmEmbedder`]: a local sentence-transformer (all-MiniLM-L6-v2, BERT)
//!   run with candle, masked-mean pooled and L2-normalised;
//! - [`HashEmbedder`]: deterministic bag-of-words hashing, used for tests and
//!   offline development (`APP_USE_FAKE_EMBEDDINGS=1`).

use anyhow::{Result, anyhow};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use newsqa_core::config::{expand_path, EmbeddingConfig};
use newsqa_core::traits::Embedder;

pub mod device;
pub mod pool;
pub mod tokenize;

pub use pool::masked_mean_l2;

const DEFAULT_MODEL_DIR: &str = "models/all-MiniLM-L6-v2";

pub struct MiniLmEmbedder {
    model: BertModel,
    tokenizer: Tokenizer,
    device: Device,
    dim: usize,
    max_len: usize,
    batch_size: usize,
    id: String,
}

impl MiniLmEmbedder {
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let device = device::select_device();
        let model_dir = resolve_model_dir(config)?;
        info!(dir = %model_dir.display(), "loading sentence-transformer");

        let tokenizer_path = model_dir.join("tokenizer.json");
        let tokenizer = Tokenizer::from_file(&tokenizer_path)
            .map_err(|e| {
                anyhow!("Failed to load tokenizer from {}: {}", tokenizer_path.display(), e)
            })?;
        let config_path = model_dir.join("config.json");
        let bert_config: BertConfig =
            serde_json::from_str(&std::fs::read_to_string(&config_path)?)?;

        let weights = load_weights(&model_dir, &device)?;
        let vb = VarBuilder::from_tensors(weights, DType::F32, &device);
        let model = BertModel::load(vb, &bert_config)?;

        let dim = bert_config.hidden_size;
        let name = model_dir
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "bert".to_string());
        let id = format!("local:{}:d{}", name, dim);
        info!(%id, "sentence-transformer ready");
        Ok(Self {
            model,
            tokenizer,
            device,
            dim,
            max_len: config.max_len,
            batch_size: config.batch_size.max(1),
            id,
        })
    }

    fn embed_chunk(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let (input_ids, attention_mask) =
            tokenize::tokenize_batch(&self.tokenizer, texts, self.max_len, &self.device)?;
        let token_type_ids = input_ids.zeros_like()?;
        let hidden = self.model.forward(&input_ids, &token_type_ids, Some(&attention_mask))?;
        let pooled = masked_mean_l2(&hidden, &attention_mask)?;
        let vectors: Vec<Vec<f32>> = pooled.to_device(&Device::Cpu)?.to_vec2()?;
        Ok(vectors)
    }
}

impl Embedder for MiniLmEmbedder {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let start = Instant::now();
        let mut out = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.batch_size) {
            out.extend(self.embed_chunk(batch)?);
        }
        let elapsed_ms = start.elapsed().as_millis() as u64;
        debug!(texts = texts.len(), elapsed_ms, "embedded batch");
        Ok(out)
    }
}

/// Deterministic hashing embedder: each lower-cased alphanumeric token adds
/// weight to one bucket, and the result is L2-normalised. Texts sharing words
/// land close together, which is enough for offline runs and tests.
#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dim: usize,
    id: String,
}

impl HashEmbedder {
    pub fn new(dim: usize) -> Self {
        let dim = dim.max(1);
        Self { dim, id: format!("hash:xxh64:d{}", dim) }
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        use std::hash::{Hash, Hasher};
        use twox_hash::XxHash64;

        let mut v = vec![0f32; self.dim];
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let token = token.to_lowercase();
            let mut hasher = XxHash64::with_seed(0);
            token.hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            let weight = 0.5 + (((h >> 32) as u32) as f32) / (u32::MAX as f32);
            v[idx] += weight;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 1e-6 {
            for x in &mut v { *x /= norm; }
        }
        v
    }
}

impl Embedder for HashEmbedder {
    fn id(&self) -> &str { &self.id }
    fn dim(&self) -> usize { self.dim }
    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.embed_text(t)).collect())
    }
}

/// `HashEmbedder` when `use_fake` is set or `APP_USE_FAKE_EMBEDDINGS` is truthy,
/// the local sentence-transformer otherwise.
pub fn get_default_embedder(config: &EmbeddingConfig) -> Result<Box<dyn Embedder>> {
    let env_fake = std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    if config.use_fake || env_fake {
        info!(dim = config.fake_dim, "using hash embedder");
        return Ok(Box::new(HashEmbedder::new(config.fake_dim)));
    }
    Ok(Box::new(MiniLmEmbedder::new(config)?))
}

fn load_weights(model_dir: &Path, device: &Device) -> Result<HashMap<String, Tensor>> {
    let safetensors = model_dir.join("model.safetensors");
    if safetensors.exists() {
        return Ok(candle_core::safetensors::load(&safetensors, device)?);
    }
    let pickle = model_dir.join("pytorch_model.bin");
    if pickle.exists() {
        let weights = candle_core::pickle::read_all(&pickle)?;
        return Ok(weights.into_iter().collect());
    }
    Err(anyhow!("No model.safetensors or pytorch_model.bin in {}", model_dir.display()))
}

fn resolve_model_dir(config: &EmbeddingConfig) -> Result<PathBuf> {
    let mut candidates: Vec<PathBuf> = Vec::new();
    if let Some(dir) = &config.model_dir { candidates.push(expand_path(dir)); }
    if let Ok(dir) = std::env::var("APP_MODEL_DIR") { candidates.push(expand_path(dir)); }
    if let Ok(dir) = std::env::var("MODEL_DIR") { candidates.push(expand_path(dir)); }
    candidates.push(PathBuf::from(DEFAULT_MODEL_DIR));
    for p in &candidates {
        if p.exists() { return Ok(p.clone()); }
        warn!(dir = %p.display(), "model directory not found");
    }
    Err(anyhow!(
        "Could not locate the sentence-transformer model directory \
         (set embedding.model_dir or APP_MODEL_DIR)"
    ))
}
