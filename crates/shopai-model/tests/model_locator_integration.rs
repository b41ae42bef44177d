//! Integration tests for ModelLocator and the config path resolution built on it.

use shopai_model::{
    EmbeddingConfig, ModelError, ModelLocator, RerankerConfig, DEFAULT_EMBEDDING_MODEL_ID,
    DEFAULT_RERANKER_MODEL_ID, EMBEDDINGS_SUBDIR, REQUIRED_MODEL_FILES, RERANKERS_SUBDIR,
    SHOPAI_MODELS_DIR_ENV,
};
use std::env;
use std::fs;
use std::sync::Mutex;
use tempfile::TempDir;

// Serializes tests that touch SHOPAI_MODELS_DIR
static ENV_MUTEX: Mutex<()> = Mutex::new(());

fn short_name(model_id: &str) -> &str {
    model_id.rsplit('/').next().unwrap_or(model_id)
}

fn setup_mock_model(temp: &TempDir, subdir: &str, model_name: &str) -> std::path::PathBuf {
    let model_path = temp.path().join(subdir).join(model_name);
    fs::create_dir_all(&model_path).expect("Failed to create model directory");

    for file in REQUIRED_MODEL_FILES {
        let content = match *file {
            "config.json" => r#"{"hidden_size": 384, "max_position_embeddings": 512}"#,
            "tokenizer.json" => r#"{"version": "1.0"}"#,
            _ => "{}",
        };
        fs::write(model_path.join(file), content).expect("Failed to write model file");
    }

    model_path
}

// ============================================================================
// Search order
// ============================================================================

#[test]
fn test_env_var_takes_precedence() {
    let _guard = ENV_MUTEX.lock().unwrap();

    let temp = TempDir::new().unwrap();
    setup_mock_model(&temp, EMBEDDINGS_SUBDIR, short_name(DEFAULT_EMBEDDING_MODEL_ID));

    env::set_var(SHOPAI_MODELS_DIR_ENV, temp.path());
    let base = ModelLocator::new().resolve_base_dir();
    env::remove_var(SHOPAI_MODELS_DIR_ENV);

    assert_eq!(base.unwrap(), temp.path());
}

#[test]
fn test_embedding_config_resolves_through_env_dir() {
    let _guard = ENV_MUTEX.lock().unwrap();

    let temp = TempDir::new().unwrap();
    let expected = setup_mock_model(&temp, EMBEDDINGS_SUBDIR, short_name(DEFAULT_EMBEDDING_MODEL_ID));

    env::set_var(SHOPAI_MODELS_DIR_ENV, temp.path());
    let resolved = EmbeddingConfig::default().effective_model_path();
    env::remove_var(SHOPAI_MODELS_DIR_ENV);

    assert_eq!(resolved, expected);
}

#[test]
fn test_explicit_local_path_wins() {
    let config = RerankerConfig::default().with_local_path("/opt/models/reranker");
    assert_eq!(
        config.effective_model_path(),
        std::path::PathBuf::from("/opt/models/reranker")
    );
}

// ============================================================================
// Path resolution
// ============================================================================

#[test]
fn test_default_models_resolve_by_full_id() {
    let temp = TempDir::new().unwrap();
    setup_mock_model(&temp, EMBEDDINGS_SUBDIR, short_name(DEFAULT_EMBEDDING_MODEL_ID));
    setup_mock_model(&temp, RERANKERS_SUBDIR, short_name(DEFAULT_RERANKER_MODEL_ID));

    let locator = ModelLocator::with_base_dir(temp.path());
    let embedding = locator.embedding_model_path(DEFAULT_EMBEDDING_MODEL_ID).unwrap();
    let reranker = locator.reranker_model_path(DEFAULT_RERANKER_MODEL_ID).unwrap();

    assert!(embedding.join("model.safetensors").exists());
    assert!(reranker.ends_with("bge-reranker-base"));
}

#[test]
fn test_hf_style_layout_is_found() {
    let temp = TempDir::new().unwrap();
    // {base}/{org}/{name}
    setup_mock_model(&temp, "BAAI", "bge-reranker-base");

    let locator = ModelLocator::with_base_dir(temp.path());
    let path = locator.reranker_model_path("BAAI/bge-reranker-base").unwrap();
    assert!(path.ends_with("BAAI/bge-reranker-base"));
}

#[test]
fn test_model_not_found_reports_preferred_location() {
    let temp = TempDir::new().unwrap();
    fs::create_dir_all(temp.path().join(EMBEDDINGS_SUBDIR)).unwrap();

    let locator = ModelLocator::with_base_dir(temp.path());
    match locator.embedding_model_path("nonexistent-model").unwrap_err() {
        ModelError::ModelNotFound { model_id, path } => {
            assert_eq!(model_id, "nonexistent-model");
            assert!(path.ends_with("embeddings/nonexistent-model"));
        }
        other => panic!("Expected ModelNotFound, got {:?}", other),
    }
}

// ============================================================================
// Validation
// ============================================================================

#[test]
fn test_validate_complete_model_dir() {
    let temp = TempDir::new().unwrap();
    let model_path = setup_mock_model(&temp, EMBEDDINGS_SUBDIR, "complete-model");

    let locator = ModelLocator::with_base_dir(temp.path());
    assert!(locator.validate_model_dir(&model_path).is_ok());
}

#[test]
fn test_validate_empty_model_dir_lists_all_files() {
    let temp = TempDir::new().unwrap();
    let model_path = temp.path().join("empty-model");
    fs::create_dir_all(&model_path).unwrap();

    let locator = ModelLocator::with_base_dir(temp.path());
    match locator.validate_model_dir(&model_path).unwrap_err() {
        ModelError::IncompleteModelFiles { path, missing } => {
            assert_eq!(path, model_path);
            assert_eq!(missing.len(), 3);
        }
        other => panic!("Expected IncompleteModelFiles, got {:?}", other),
    }
}

// ============================================================================
// Error messages
// ============================================================================

#[test]
fn test_models_dir_not_found_error_message() {
    let locator = ModelLocator::with_base_dir("/nonexistent/path");
    let msg = locator.resolve_base_dir().unwrap_err().to_string();

    assert!(msg.contains("Models directory not found"));
    assert!(msg.contains("shopai searched these locations"));
    assert!(msg.contains("$SHOPAI_MODELS_DIR"));
}

#[test]
fn test_incomplete_model_error_message() {
    let temp = TempDir::new().unwrap();
    let model_path = temp.path().join("incomplete");
    fs::create_dir_all(&model_path).unwrap();
    fs::write(model_path.join("config.json"), "{}").unwrap();

    let locator = ModelLocator::with_base_dir(temp.path());
    let msg = locator.validate_model_dir(&model_path).unwrap_err().to_string();

    assert!(msg.contains("Incomplete model installation"));
    assert!(msg.contains("model.safetensors"));
}
