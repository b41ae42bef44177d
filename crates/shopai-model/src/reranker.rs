//! Candle-based cross-encoder implementation.

use std::sync::Mutex;

use candle_core::{Device, Tensor};
use candle_transformers::models::bert::{BertModel, Config as BertConfig};
use candle_transformers::models::xlm_roberta::{
    Config as XLMRobertaConfig, XLMRobertaForSequenceClassification,
};
use tokenizers::Tokenizer;
use tracing::{debug, info, warn};

use crate::config::{DevicePreference, ModelArchitecture, RerankerConfig, ScoreActivation};
use crate::device::{gpu_not_available_reason, try_gpu};
use crate::embedding::{load_hf_config, load_tokenizer, load_weights};
use crate::error::{ModelError, ModelResult};
use crate::model_locator::REQUIRED_MODEL_FILES;
use crate::RerankerModel;

/// Maximum batch size for a single inference pass.
/// Larger batches are split to bound memory on GPU.
const MAX_BATCH_SIZE: usize = 8;

enum RerankerBackend {
    /// BERT encoder with a single-logit linear head on the CLS token.
    Bert {
        model: BertModel,
        classifier_weight: Tensor,
        classifier_bias: Tensor,
    },
    /// XLM-RoBERTa sequence classifier (bge-reranker family).
    Roberta(XLMRobertaForSequenceClassification),
}

impl RerankerBackend {
    /// Returns one logit per pair, shape `[batch]`.
    fn logits(
        &self,
        input_ids: &Tensor,
        token_type_ids: &Tensor,
        attention_mask: &Tensor,
    ) -> candle_core::Result<Tensor> {
        match self {
            RerankerBackend::Bert {
                model,
                classifier_weight,
                classifier_bias,
            } => {
                let hidden = model.forward(input_ids, token_type_ids, Some(attention_mask))?;
                // [batch, seq, hidden] -> CLS [batch, hidden]
                let cls = hidden.narrow(1, 0, 1)?.squeeze(1)?;
                cls.matmul(&classifier_weight.t()?)?
                    .broadcast_add(classifier_bias)?
                    .squeeze(1)
            }
            RerankerBackend::Roberta(model) => model
                .forward(input_ids, attention_mask, token_type_ids)?
                .squeeze(1),
        }
    }
}

/// Candle-based cross-encoder scoring `(query, document)` pairs.
pub struct CandleRerankerModel {
    model_id: String,
    backend: RerankerBackend,
    activation: ScoreActivation,
    tokenizer: Mutex<Tokenizer>,
    device: Device,
}

impl std::fmt::Debug for CandleRerankerModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CandleRerankerModel")
            .field("model_id", &self.model_id)
            .field("activation", &self.activation)
            .finish()
    }
}

unsafe impl Send for CandleRerankerModel {}
unsafe impl Sync for CandleRerankerModel {}

impl CandleRerankerModel {
    /// Load a cross-encoder.
    pub fn new(config: &RerankerConfig) -> ModelResult<Self> {
        let model_path = config.effective_model_path();

        if !model_path.exists() {
            return Err(ModelError::ModelNotFound {
                model_id: config.model_id.clone(),
                path: model_path,
            });
        }

        for name in REQUIRED_MODEL_FILES {
            if !model_path.join(name).exists() {
                return Err(ModelError::model_load(
                    &config.model_id,
                    format!("{} not found", name),
                ));
            }
        }

        let hf_config = load_hf_config(&model_path)?;
        let architecture = hf_config.infer_architecture();

        info!(
            "Loading reranker model '{}' from {:?} (arch={})",
            config.model_id, model_path, architecture
        );

        // Batched cross-encoder matmuls are unreliable on Metal, so Auto stays
        // on CPU and only an explicit GPU request leaves it.
        let device = match config.device {
            DevicePreference::Auto | DevicePreference::Cpu => Device::Cpu,
            DevicePreference::Gpu => match try_gpu() {
                Some(d) => {
                    warn!("Reranker using GPU (may fail on some queries)");
                    d
                }
                None => {
                    return Err(ModelError::DeviceNotAvailable {
                        reason: gpu_not_available_reason(),
                    });
                }
            },
        };

        let vb = load_weights(&model_path, &device)?;
        let content = std::fs::read_to_string(model_path.join("config.json"))?;
        let load_err =
            |e: candle_core::Error| ModelError::model_load(&config.model_id, e.to_string());

        let (backend, pad_id, pad_token) = match architecture {
            ModelArchitecture::Roberta => {
                let cfg: XLMRobertaConfig = serde_json::from_str(&content)?;
                let model = XLMRobertaForSequenceClassification::new(1, &cfg, vb)
                    .map_err(load_err)?;
                (RerankerBackend::Roberta(model), 1, "<pad>")
            }
            ModelArchitecture::Bert | ModelArchitecture::Unknown => {
                let cfg: BertConfig = serde_json::from_str(&content)?;
                let model = BertModel::load(vb.clone(), &cfg).map_err(load_err)?;
                let classifier_weight = vb
                    .get((1, cfg.hidden_size), "classifier.weight")
                    .map_err(|e| {
                        ModelError::model_load(
                            &config.model_id,
                            format!("classifier.weight: {}", e),
                        )
                    })?;
                let classifier_bias = vb.get(1, "classifier.bias").map_err(|e| {
                    ModelError::model_load(&config.model_id, format!("classifier.bias: {}", e))
                })?;
                (
                    RerankerBackend::Bert {
                        model,
                        classifier_weight,
                        classifier_bias,
                    },
                    0,
                    "[PAD]",
                )
            }
        };

        let max_len = config
            .max_sequence_length
            .min(hf_config.usable_positions());
        let tokenizer = load_tokenizer(&model_path, max_len, pad_id, pad_token)?;

        info!("Reranker model loaded on {:?}", device);

        Ok(Self {
            model_id: config.model_id.clone(),
            backend,
            activation: config.activation,
            tokenizer: Mutex::new(tokenizer),
            device,
        })
    }

    fn fail(&self, e: impl std::fmt::Display) -> ModelError {
        ModelError::reranking_failed(&self.model_id, e.to_string())
    }

    fn score_chunk(&self, query: &str, documents: &[String]) -> ModelResult<Vec<f32>> {
        let tokenizer = self.tokenizer.lock().map_err(|e| self.fail(e))?;
        let pairs: Vec<(String, String)> = documents
            .iter()
            .map(|doc| (query.to_string(), doc.clone()))
            .collect();
        let encodings = tokenizer
            .encode_batch(pairs, true)
            .map_err(|e| ModelError::tokenization(e.to_string()))?;
        drop(tokenizer);

        // Padding is BatchLongest, so every encoding has the same length.
        let batch_size = encodings.len();
        let seq_len = encodings.first().map(|e| e.get_ids().len()).unwrap_or(0);

        let mut input_ids = Vec::with_capacity(batch_size * seq_len);
        let mut attention_mask = Vec::with_capacity(batch_size * seq_len);
        let mut token_type_ids = Vec::with_capacity(batch_size * seq_len);
        for encoding in &encodings {
            input_ids.extend_from_slice(encoding.get_ids());
            attention_mask.extend_from_slice(encoding.get_attention_mask());
            token_type_ids.extend_from_slice(encoding.get_type_ids());
        }

        let shape = (batch_size, seq_len);
        let input_ids =
            Tensor::from_vec(input_ids, shape, &self.device).map_err(|e| self.fail(e))?;
        let attention_mask =
            Tensor::from_vec(attention_mask, shape, &self.device).map_err(|e| self.fail(e))?;
        let token_type_ids =
            Tensor::from_vec(token_type_ids, shape, &self.device).map_err(|e| self.fail(e))?;

        let logits: Vec<f32> = self
            .backend
            .logits(&input_ids, &token_type_ids, &attention_mask)
            .and_then(|t| t.to_vec1())
            .map_err(|e| self.fail(e))?;

        Ok(logits.into_iter().map(|l| self.activation.apply(l)).collect())
    }
}

impl RerankerModel for CandleRerankerModel {
    fn score_batch(&self, query: &str, documents: &[String]) -> ModelResult<Vec<f32>> {
        if documents.is_empty() {
            return Ok(vec![]);
        }

        debug!(
            "Scoring {} pairs on {:?}",
            documents.len(),
            self.device
        );

        let mut all_scores = Vec::with_capacity(documents.len());
        for chunk in documents.chunks(MAX_BATCH_SIZE) {
            all_scores.extend(self.score_chunk(query, chunk)?);
        }

        Ok(all_scores)
    }

    fn model_id(&self) -> &str {
        &self.model_id
    }
}
