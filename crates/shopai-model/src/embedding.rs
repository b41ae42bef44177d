//! Candle-based embedding model implementation.

use std::path::Path;
use std::sync::Mutex;

use candle_core::{DType, Device, Tensor};
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE};
use candle_transformers::models::xlm_roberta::{Config as XLMRobertaConfig, XLMRobertaModel};
use tokenizers::{PaddingParams, PaddingStrategy, Tokenizer, TruncationParams};
use tracing::{debug, info};

use crate::config::{EmbeddingConfig, HuggingFaceModelConfig, ModelArchitecture, ModelInfo};
use crate::device::select_device;
use crate::error::{ModelError, ModelResult};
use crate::EmbeddingModel;

// ============================================================================
// ModelBackend enum
// ============================================================================

enum ModelBackend {
    Bert(BertModel),
    Roberta(XLMRobertaModel),
}

impl ModelBackend {
    fn forward(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> candle_core::Result<Tensor> {
        match self {
            ModelBackend::Bert(model) => {
                model.forward(input_ids, token_type_ids, Some(attention_mask))
            }
            ModelBackend::Roberta(model) => {
                model.forward(input_ids, attention_mask, token_type_ids, None, None, None)
            }
        }
    }
}

// ============================================================================
// CandleEmbeddingModel
// ============================================================================

/// Candle-based sentence embedding model.
///
/// Supports BERT and XLM-RoBERTa checkpoints with mean pooling and L2
/// normalization, the sentence-transformers recipe.
pub struct CandleEmbeddingModel {
    model_info: ModelInfo,
    model: Mutex<ModelBackend>,
    tokenizer: Mutex<Tokenizer>,
    device: Device,
}

impl std::fmt::Debug for CandleEmbeddingModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandleEmbeddingModel")
            .field("model_id", &self.model_info.model_id)
            .field("dimension", &self.model_info.dimension)
            .finish()
    }
}

// Candle tensors hold device handles that are not marked Send/Sync on every
// backend; all inference goes through the mutexes above.
unsafe impl Send for CandleEmbeddingModel {}
unsafe impl Sync for CandleEmbeddingModel {}

impl CandleEmbeddingModel {
    /// Load an embedding model.
    pub fn new(config: &EmbeddingConfig) -> ModelResult<Self> {
        let model_path = config.effective_model_path();

        if !model_path.exists() {
            return Err(ModelError::ModelNotFound {
                model_id: config.model_id.clone(),
                path: model_path,
            });
        }

        let hf_config = load_hf_config(&model_path)?;
        let architecture = hf_config.infer_architecture();
        let dimension = hf_config.hidden_size;
        let max_seq_len = config.max_sequence_length.min(hf_config.usable_positions());

        info!(
            "Loading embedding model '{}' from {:?} (arch={}, dim={})",
            config.model_id, model_path, architecture, dimension
        );

        let (pad_id, pad_token) = match architecture {
            ModelArchitecture::Roberta => (1, "<pad>"),
            ModelArchitecture::Bert | ModelArchitecture::Unknown => (0, "[PAD]"),
        };

        let tokenizer = load_tokenizer(&model_path, max_seq_len, pad_id, pad_token)?;
        let device = select_device(config.device)?;
        let model = load_model(&model_path, architecture, &device)?;

        let model_info = ModelInfo::new(&config.model_id, dimension, max_seq_len)
            .with_architecture(architecture);

        Ok(Self {
            model_info,
            model: Mutex::new(model),
            tokenizer: Mutex::new(tokenizer),
            device,
        })
    }

    fn fail(&self, e: impl std::fmt::Display) -> ModelError {
        ModelError::embedding_failed(&self.model_info.model_id, e.to_string())
    }

    fn mean_pooling(&self, embeddings: &Tensor, mask: &Tensor) -> candle_core::Result<Tensor> {
        let mask_expanded = mask
            .unsqueeze(2)?
            .to_dtype(DType::F32)?
            .broadcast_as(embeddings.shape())?;
        let sum = embeddings.broadcast_mul(&mask_expanded)?.sum(1)?;
        let count = mask_expanded.sum(1)?.clamp(1e-9, f64::MAX)?;
        sum.broadcast_div(&count)
    }

    fn l2_normalize(&self, embeddings: &Tensor) -> candle_core::Result<Tensor> {
        let norm = embeddings
            .sqr()?
            .sum_keepdim(1)?
            .sqrt()?
            .clamp(1e-12, f64::MAX)?;
        embeddings.broadcast_div(&norm)
    }
}

impl EmbeddingModel for CandleEmbeddingModel {
    fn embed(&self, texts: &[&str]) -> ModelResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(vec![]);
        }

        let tokenizer = self.tokenizer.lock().map_err(|e| self.fail(e))?;
        let inputs: Vec<String> = texts.iter().map(|s| s.to_string()).collect();
        let encodings = tokenizer
            .encode_batch(inputs, true)
            .map_err(|e| ModelError::tokenization(e.to_string()))?;
        drop(tokenizer);

        let batch_size = encodings.len();
        let seq_len = encodings.first().map(|e| e.get_ids().len()).unwrap_or(0);
        debug!("Embedding {} texts (seq_len={})", batch_size, seq_len);

        let token_ids: Vec<u32> = encodings
            .iter()
            .flat_map(|e| e.get_ids().to_vec())
            .collect();
        let attention_mask: Vec<u32> = encodings
            .iter()
            .flat_map(|e| e.get_attention_mask().to_vec())
            .collect();

        let token_ids = Tensor::from_vec(token_ids, (batch_size, seq_len), &self.device)
            .map_err(|e| self.fail(e))?;
        let attention_mask = Tensor::from_vec(attention_mask, (batch_size, seq_len), &self.device)
            .map_err(|e| self.fail(e))?;
        let token_type_ids = token_ids.zeros_like().map_err(|e| self.fail(e))?;

        let model = self.model.lock().map_err(|e| self.fail(e))?;
        let hidden_states = model
            .forward(&token_ids, &token_type_ids, &attention_mask)
            .map_err(|e| self.fail(format!("Forward failed: {}", e)))?;
        drop(model);

        let pooled = self
            .mean_pooling(&hidden_states, &attention_mask)
            .map_err(|e| self.fail(e))?;
        let normalized = self.l2_normalize(&pooled).map_err(|e| self.fail(e))?;

        normalized.to_vec2::<f32>().map_err(|e| self.fail(e))
    }

    fn dimension(&self) -> usize {
        self.model_info.dimension
    }

    fn max_sequence_length(&self) -> usize {
        self.model_info.max_seq_len
    }

    fn model_info(&self) -> &ModelInfo {
        &self.model_info
    }
}

// ============================================================================
// Loading helpers
// ============================================================================

pub(crate) fn load_hf_config(model_path: &Path) -> ModelResult<HuggingFaceModelConfig> {
    let config_path = model_path.join("config.json");
    if !config_path.exists() {
        return Err(ModelError::model_load(
            model_path.display().to_string(),
            "config.json not found",
        ));
    }
    let content = std::fs::read_to_string(&config_path)?;
    Ok(serde_json::from_str(&content)?)
}

pub(crate) fn load_tokenizer(
    model_path: &Path,
    max_length: usize,
    pad_id: u32,
    pad_token: &str,
) -> ModelResult<Tokenizer> {
    let tokenizer_path = model_path.join("tokenizer.json");
    if !tokenizer_path.exists() {
        return Err(ModelError::model_load(
            model_path.display().to_string(),
            "tokenizer.json not found",
        ));
    }

    let mut tokenizer = Tokenizer::from_file(&tokenizer_path)
        .map_err(|e| ModelError::model_load(model_path.display().to_string(), e.to_string()))?;

    tokenizer.with_padding(Some(PaddingParams {
        strategy: PaddingStrategy::BatchLongest,
        pad_id,
        pad_token: pad_token.to_string(),
        ..Default::default()
    }));

    tokenizer
        .with_truncation(Some(TruncationParams {
            max_length,
            ..Default::default()
        }))
        .map_err(|e| ModelError::model_load(model_path.display().to_string(), e.to_string()))?;

    Ok(tokenizer)
}

pub(crate) fn load_weights(model_path: &Path, device: &Device) -> ModelResult<VarBuilder<'static>> {
    let weights_path = model_path.join("model.safetensors");
    if !weights_path.exists() {
        return Err(ModelError::model_load(
            model_path.display().to_string(),
            "model.safetensors not found",
        ));
    }

    // SAFETY: the weights file is not modified while mapped.
    unsafe {
        VarBuilder::from_mmaped_safetensors(&[weights_path], DTYPE, device)
            .map_err(|e| ModelError::model_load(model_path.display().to_string(), e.to_string()))
    }
}

fn load_model(
    model_path: &Path,
    architecture: ModelArchitecture,
    device: &Device,
) -> ModelResult<ModelBackend> {
    let vb = load_weights(model_path, device)?;
    let content = std::fs::read_to_string(model_path.join("config.json"))?;
    let load_err = |e: candle_core::Error| {
        ModelError::model_load(model_path.display().to_string(), e.to_string())
    };

    match architecture {
        ModelArchitecture::Bert | ModelArchitecture::Unknown => {
            let bert_config: BertConfig = serde_json::from_str(&content)?;
            let model = BertModel::load(vb, &bert_config).map_err(load_err)?;
            Ok(ModelBackend::Bert(model))
        }
        ModelArchitecture::Roberta => {
            let roberta_config: XLMRobertaConfig = serde_json::from_str(&content)?;
            let model = XLMRobertaModel::new(&roberta_config, vb).map_err(load_err)?;
            Ok(ModelBackend::Roberta(model))
        }
    }
}
