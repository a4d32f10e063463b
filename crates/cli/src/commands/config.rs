use std::env;
use std::fs;
use std::path::Path;

use ringside_core::config::{resolve_config_path, AppConfig, LoadOptions, RoleModelConfig};
use secrecy::ExposeSecret;
use toml::Value;

use crate::commands::CommandResult;

struct Field {
    key_path: String,
    value: String,
    env_keys: Vec<&'static str>,
}

pub fn run() -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return CommandResult::failure("config", "config_validation", error.to_string(), 2)
        }
    };

    let config_file_path = resolve_config_path(None);
    let config_file_doc = load_config_file_doc(config_file_path.as_deref());

    let mut fields = vec![
        Field {
            key_path: "simulation.num_simulations".to_string(),
            value: config.simulation.num_simulations.to_string(),
            env_keys: vec!["RINGSIDE_SIMULATION_NUM_SIMULATIONS"],
        },
        Field {
            key_path: "simulation.max_message_exchanges".to_string(),
            value: config.simulation.max_message_exchanges.to_string(),
            env_keys: vec!["RINGSIDE_SIMULATION_MAX_MESSAGE_EXCHANGES"],
        },
        Field {
            key_path: "simulation.concurrency".to_string(),
            value: config.simulation.concurrency.to_string(),
            env_keys: vec!["RINGSIDE_SIMULATION_CONCURRENCY"],
        },
    ];

    for (role, model) in [
        ("sales", &config.simulation.sales),
        ("prospect", &config.simulation.prospect),
        ("assessor", &config.simulation.assessor),
    ] {
        fields.extend(role_fields(role, model));
    }

    fields.push(Field {
        key_path: "llm.provider".to_string(),
        value: format!("{:?}", config.llm.provider),
        env_keys: vec!["RINGSIDE_LLM_PROVIDER"],
    });
    fields.push(Field {
        key_path: "llm.base_url".to_string(),
        value: config.llm.effective_base_url().to_string(),
        env_keys: vec!["RINGSIDE_LLM_BASE_URL"],
    });
    fields.push(Field {
        key_path: "llm.api_key".to_string(),
        value: config
            .llm
            .api_key
            .as_ref()
            .map(|key| redact_key(key.expose_secret()))
            .unwrap_or_else(|| "<unset>".to_string()),
        env_keys: vec!["RINGSIDE_LLM_API_KEY", config.llm.provider.api_key_env()],
    });
    fields.push(Field {
        key_path: "llm.timeout_secs".to_string(),
        value: config
            .llm
            .timeout_secs
            .map(|secs| secs.to_string())
            .unwrap_or_else(|| "<unset>".to_string()),
        env_keys: vec!["RINGSIDE_LLM_TIMEOUT_SECS"],
    });
    fields.push(Field {
        key_path: "output.directory".to_string(),
        value: config.output.directory.display().to_string(),
        env_keys: vec!["RINGSIDE_OUTPUT_DIRECTORY"],
    });
    fields.push(Field {
        key_path: "logging.level".to_string(),
        value: config.logging.level.clone(),
        env_keys: vec!["RINGSIDE_LOGGING_LEVEL", "RINGSIDE_LOG_LEVEL"],
    });
    fields.push(Field {
        key_path: "logging.format".to_string(),
        value: format!("{:?}", config.logging.format),
        env_keys: vec!["RINGSIDE_LOGGING_FORMAT", "RINGSIDE_LOG_FORMAT"],
    });

    let mut lines = vec!["effective config (source precedence: env > file > default):".to_string()];
    for field in fields {
        let source = field_source(
            &field.key_path,
            &field.env_keys,
            config_file_doc.as_ref(),
            config_file_path.as_deref(),
        );
        lines.push(render_line(&field.key_path, &field.value, source));
    }

    CommandResult { exit_code: 0, output: lines.join("\n") }
}

/// Role env keys are derived from the key path in `field_source`.
fn role_fields(role: &str, model: &RoleModelConfig) -> Vec<Field> {
    vec![
        Field {
            key_path: format!("simulation.{role}.model"),
            value: model.model.clone(),
            env_keys: Vec::new(),
        },
        Field {
            key_path: format!("simulation.{role}.temperature"),
            value: model.temperature.to_string(),
            env_keys: Vec::new(),
        },
        Field {
            key_path: format!("simulation.{role}.max_tokens"),
            value: model.max_tokens.to_string(),
            env_keys: Vec::new(),
        },
    ]
}

fn load_config_file_doc(path: Option<&Path>) -> Option<Value> {
    let path = path?;
    let raw = fs::read_to_string(path).ok()?;
    raw.parse::<Value>().ok()
}

fn field_source(
    key_path: &str,
    env_keys: &[&str],
    config_file_doc: Option<&Value>,
    config_file_path: Option<&Path>,
) -> String {
    let role_env_key = role_env_key(key_path);
    let candidates = env_keys.iter().copied().chain(role_env_key.as_deref());
    for env_key in candidates {
        if env::var_os(env_key).is_some() {
            return format!("env ({env_key})");
        }
    }

    if let Some(doc) = config_file_doc {
        if contains_path(doc, key_path) {
            let file_path = config_file_path
                .map(|path| path.display().to_string())
                .unwrap_or_else(|| "config file".to_string());
            return format!("file ({file_path})");
        }
    }

    "default".to_string()
}

/// `simulation.sales.max_tokens` is overridden by `RINGSIDE_SALES_MAX_TOKENS`.
fn role_env_key(key_path: &str) -> Option<String> {
    let mut parts = key_path.split('.');
    match (parts.next(), parts.next(), parts.next(), parts.next()) {
        (Some("simulation"), Some(role), Some(field), None) => Some(format!(
            "RINGSIDE_{}_{}",
            role.to_ascii_uppercase(),
            field.to_ascii_uppercase()
        )),
        _ => None,
    }
}

fn contains_path(root: &Value, key_path: &str) -> bool {
    let mut current = root;
    for key in key_path.split('.') {
        let Some(next) = current.get(key) else {
            return false;
        };
        current = next;
    }
    true
}

fn render_line(key: &str, value: &str, source: String) -> String {
    format!("- {key} = {value} (source: {source})")
}

fn redact_key(key: &str) -> String {
    let trimmed = key.trim();
    if trimmed.is_empty() {
        return "<empty>".to_string();
    }

    if let Some((prefix, _)) = trimmed.split_once('-') {
        return format!("{prefix}-***");
    }

    "<redacted>".to_string()
}
