use super::*;
use crate::{EmbedderKind, LlmProviderKind};
use pretty_assertions::assert_eq;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn write_json5(path: &Path, contents: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("dir");
    }
    fs::write(path, contents).expect("write");
}

#[test]
fn parse_minimal_config() {
    let config = StewardConfig::load_from_str("{}").expect("config");
    assert_eq!(config.llm.provider, LlmProviderKind::DeepSeek);
    assert_eq!(config.llm.model, "deepseek-chat");
    assert_eq!(config.orchestrator.max_iterations, 10);
    assert_eq!(config.memory.search_k, 3);
    assert_eq!(config.memory.embedder, EmbedderKind::Hashing);
    assert_eq!(config.memory.resolved_path(), "data/user_memory.json");
    assert!(config.tools.weather.enabled);
    assert!(!config.sessions.enabled);
}

#[test]
fn parses_json5_comments_and_trailing_commas() {
    let json5 = r#"{
        // use the OpenAI backend
        llm: { provider: "openai", model: "gpt-4o-mini", base_url: null, },
        memory: { embedder: "fastembed", search_k: 5 },
    }"#;
    let config = StewardConfig::load_from_str(json5).expect("config");
    assert_eq!(config.llm.provider, LlmProviderKind::OpenAI);
    assert_eq!(config.llm.base_url, None);
    assert_eq!(config.memory.embedder, EmbedderKind::Fastembed);
    assert_eq!(config.memory.search_k, 5);
}

#[test]
fn llm_defaults_follow_the_provider() {
    let config = StewardConfig::load_from_str("{ llm: { provider: 'openai' } }").expect("config");
    assert_eq!(config.llm.base_url, None);
    assert_eq!(config.llm.api_key_var(), "OPENAI_API_KEY");

    let config = StewardConfig::load_from_str("{}").expect("config");
    assert_eq!(config.llm.base_url, None);
    assert_eq!(config.llm.api_key_var(), "DEEPSEEK_API_KEY");

    let config =
        StewardConfig::load_from_str("{ llm: { provider: 'openai', api_key_env: 'AZURE_KEY' } }")
            .expect("config");
    assert_eq!(config.llm.api_key_var(), "AZURE_KEY");
}

#[test]
fn rejects_unknown_top_level_key() {
    let err = StewardConfig::load_from_str("{ unexpected: true }").unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("config:unexpected"));
    assert!(msg.contains("unknown key"));
}

#[test]
fn rejects_unknown_provider() {
    let err = StewardConfig::load_from_str(r#"{ llm: { provider: "mystery" } }"#).unwrap_err();
    assert!(format!("{err}").contains("llm.provider"));
}

#[test]
fn rejects_wrong_type_for_nested_field() {
    let err = StewardConfig::load_from_str(r#"{ tools: { weather: { enabled: "yes" } } }"#)
        .unwrap_err();
    assert!(format!("{err}").contains("tools.weather.enabled"));
}

#[test]
fn validate_rejects_zero_iteration_cap() {
    let err =
        StewardConfig::load_from_str("{ orchestrator: { max_iterations: 0 } }").unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}

#[test]
fn validate_rejects_out_of_range_temperature() {
    let err = StewardConfig::load_from_str("{ llm: { temperature: 3.5 } }").unwrap_err();
    assert!(format!("{err}").contains("temperature"));
}

#[test]
fn layered_config_applies_precedence() {
    let temp = TempDir::new().expect("tmp");
    let root = temp.path();
    let project_root = root.join("project");
    fs::create_dir_all(project_root.join(".git")).expect("git");
    let cwd = project_root.join("subdir");
    fs::create_dir_all(&cwd).expect("cwd");

    let user_config = root.join("user.json5");
    write_json5(
        &user_config,
        r#"{ llm: { model: "user-model" }, memory: { search_k: 7 } }"#,
    );
    write_json5(
        &project_root.join(DEFAULT_CONFIG_FILE),
        r#"{ llm: { model: "project-model" } }"#,
    );
    write_json5(
        &cwd.join(DEFAULT_CONFIG_FILE),
        r#"{ orchestrator: { max_iterations: 4 } }"#,
    );
    let runtime_config = root.join("runtime.json5");
    write_json5(&runtime_config, r#"{ orchestrator: { max_iterations: 6 } }"#);

    let mut options = LayeredConfigOptions::new(&cwd).with_runtime_path(&runtime_config);
    options.user_config_path = Some(user_config);

    let layered = StewardConfig::load_layered_with_options(options).expect("layered");
    assert_eq!(layered.config.llm.model, "project-model");
    assert_eq!(layered.config.memory.search_k, 7);
    assert_eq!(layered.config.orchestrator.max_iterations, 6);
    let sources: Vec<_> = layered.layers.iter().map(|layer| layer.source).collect();
    assert_eq!(
        sources,
        vec![
            ConfigLayerSource::User,
            ConfigLayerSource::Project,
            ConfigLayerSource::Cwd,
            ConfigLayerSource::Runtime,
        ]
    );
}

#[test]
fn project_and_cwd_layers_deduplicate() {
    let temp = TempDir::new().expect("tmp");
    let project_root = temp.path().join("project");
    fs::create_dir_all(project_root.join(".git")).expect("git");
    write_json5(
        &project_root.join(DEFAULT_CONFIG_FILE),
        r#"{ memory: { search_k: 2 } }"#,
    );

    let options = LayeredConfigOptions::new(&project_root).without_user_layer();
    let layered = StewardConfig::load_layered_with_options(options).expect("layered");
    assert_eq!(layered.layers.len(), 1);
    assert_eq!(layered.layers[0].source, ConfigLayerSource::Project);
    assert_eq!(layered.config.memory.search_k, 2);
}

#[test]
fn invalid_layer_error_names_the_layer() {
    let temp = TempDir::new().expect("tmp");
    let cwd = temp.path();
    write_json5(&cwd.join(DEFAULT_CONFIG_FILE), "{ sessions: { enabled: 1 } }");

    let options = LayeredConfigOptions::new(cwd).without_user_layer();
    let err = StewardConfig::load_layered_with_options(options).unwrap_err();
    let msg = format!("{err}");
    assert!(msg.contains("cwd("));
    assert!(msg.contains("sessions.enabled"));
}

#[test]
fn missing_runtime_layer_is_an_error() {
    let temp = TempDir::new().expect("tmp");
    let options = LayeredConfigOptions::new(temp.path())
        .without_user_layer()
        .with_runtime_path(temp.path().join("missing.json5"));
    let err = StewardConfig::load_layered_with_options(options).unwrap_err();
    assert!(matches!(err, ConfigError::Read { ref path, .. } if path.ends_with("missing.json5")));
}

#[test]
fn overlay_replaces_scalars_and_merges_objects() {
    let base = serde_json::json!({ "a": { "b": 1, "c": 2 }, "d": [1] });
    let top = serde_json::json!({ "a": { "c": 3 }, "d": [2, 3], "e": null });
    assert_eq!(
        layer::overlay(base, top),
        serde_json::json!({ "a": { "b": 1, "c": 3 }, "d": [2, 3], "e": null })
    );
}

#[test]
fn syntax_errors_name_their_origin() {
    let err = StewardConfig::load_from_str("{ llm: ").unwrap_err();
    assert!(matches!(err, ConfigError::Syntax { ref origin, .. } if origin == "config"));
}

#[test]
fn zero_call_timeout_is_accepted() {
    let config =
        StewardConfig::load_from_str("{ tools: { call_timeout_secs: 0 } }").expect("config");
    assert_eq!(config.tools.call_timeout_secs, 0);
}

#[test]
fn builder_replaces_sections_and_validates() {
    let config = StewardConfig::builder()
        .memory(crate::MemoryConfig {
            search_k: 5,
            ..Default::default()
        })
        .build()
        .expect("config");
    assert_eq!(config.memory.search_k, 5);
    assert_eq!(config.orchestrator.max_iterations, 10);

    let err = StewardConfig::builder()
        .orchestrator(crate::OrchestratorConfig {
            max_iterations: 0,
            ..Default::default()
        })
        .build()
        .unwrap_err();
    assert!(matches!(err, ConfigError::Invalid(_)));
}
