use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub simulation: SimulationConfig,
    pub llm: LlmConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Read-only parameters of a simulation run.
///
/// Validated once when the configuration is loaded; the engine shares it behind an `Arc`
/// and never mutates it while conversations are in flight.
#[derive(Clone, Debug, PartialEq)]
pub struct SimulationConfig {
    pub sales: RoleModelConfig,
    pub prospect: RoleModelConfig,
    pub assessor: RoleModelConfig,
    pub max_message_exchanges: u32,
    pub num_simulations: u32,
    pub concurrency: u32,
}

/// Capability record for one agent role.
#[derive(Clone, Debug, PartialEq)]
pub struct RoleModelConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Sales,
    Prospect,
    Assessor,
}

impl AgentRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sales => "sales",
            Self::Prospect => "prospect",
            Self::Assessor => "assessor",
        }
    }
}

#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub provider: LlmProvider,
    pub api_key: Option<SecretString>,
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Clone, Debug)]
pub struct OutputConfig {
    pub directory: PathBuf,
}

#[derive(Clone, Debug)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LlmProvider {
    #[serde(rename = "openai")]
    OpenAi,
    Groq,
    Together,
}

impl LlmProvider {
    pub fn default_base_url(&self) -> &'static str {
        match self {
            Self::OpenAi => "https://api.openai.com/v1",
            Self::Groq => "https://api.groq.com/openai/v1",
            Self::Together => "https://api.together.xyz/v1",
        }
    }

    pub fn api_key_env(&self) -> &'static str {
        match self {
            Self::OpenAi => "OPENAI_API_KEY",
            Self::Groq => "GROQ_API_KEY",
            Self::Together => "TOGETHER_API_KEY",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Compact,
    Pretty,
    Json,
}

#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    pub num_simulations: Option<u32>,
    pub max_message_exchanges: Option<u32>,
    pub concurrency: Option<u32>,
    pub sales_model: Option<String>,
    pub prospect_model: Option<String>,
    pub llm_provider: Option<LlmProvider>,
    pub llm_api_key: Option<String>,
    pub output_directory: Option<PathBuf>,
    pub log_level: Option<String>,
}

#[derive(Clone, Debug, Default)]
pub struct LoadOptions {
    pub config_path: Option<PathBuf>,
    pub require_file: bool,
    pub overrides: ConfigOverrides,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse config file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
    #[error("required config file was not found: `{0}`")]
    MissingConfigFile(PathBuf),
    #[error("environment variable interpolation failed for `{var}`")]
    MissingEnvInterpolation { var: String },
    #[error("unterminated environment interpolation expression")]
    UnterminatedInterpolation,
    #[error("invalid environment override for `{key}`: `{value}`")]
    InvalidEnvOverride { key: String, value: String },
    #[error("configuration validation failed: {0}")]
    Validation(String),
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            sales: RoleModelConfig {
                model: "gpt-4o-mini".to_string(),
                temperature: 0.3,
                max_tokens: 120,
            },
            prospect: RoleModelConfig {
                model: "gpt-4o-mini".to_string(),
                temperature: 0.85,
                max_tokens: 100,
            },
            assessor: RoleModelConfig {
                model: "gpt-4o-mini".to_string(),
                temperature: 0.1,
                max_tokens: 150,
            },
            max_message_exchanges: 3,
            num_simulations: 100,
            concurrency: 1,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            simulation: SimulationConfig::default(),
            llm: LlmConfig {
                provider: LlmProvider::OpenAi,
                api_key: None,
                base_url: None,
                timeout_secs: None,
            },
            output: OutputConfig { directory: PathBuf::from("transcripts") },
            logging: LoggingConfig { level: "info".to_string(), format: LogFormat::Compact },
        }
    }
}

fn secret_value(value: String) -> SecretString {
    value.into()
}

impl std::str::FromStr for LlmProvider {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "groq" => Ok(Self::Groq),
            "together" => Ok(Self::Together),
            other => Err(ConfigError::Validation(format!(
                "unsupported llm provider `{other}` (expected openai|groq|together)"
            ))),
        }
    }
}

impl std::str::FromStr for LogFormat {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" => Ok(Self::Compact),
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(ConfigError::Validation(format!(
                "unsupported log format `{other}` (expected compact|pretty|json)"
            ))),
        }
    }
}

impl SimulationConfig {
    /// Single lookup for a role's model, temperature and token cap.
    pub fn role_model(&self, role: AgentRole) -> &RoleModelConfig {
        match role {
            AgentRole::Sales => &self.sales,
            AgentRole::Prospect => &self.prospect,
            AgentRole::Assessor => &self.assessor,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        for role in [AgentRole::Sales, AgentRole::Prospect, AgentRole::Assessor] {
            validate_role_model(role, self.role_model(role))?;
        }

        if self.max_message_exchanges == 0 || self.max_message_exchanges > 20 {
            return Err(ConfigError::Validation(
                "simulation.max_message_exchanges must be in range 1..=20".to_string(),
            ));
        }
        if self.num_simulations == 0 || self.num_simulations > 10_000 {
            return Err(ConfigError::Validation(
                "simulation.num_simulations must be in range 1..=10000".to_string(),
            ));
        }
        if self.concurrency == 0 || self.concurrency > 64 {
            return Err(ConfigError::Validation(
                "simulation.concurrency must be in range 1..=64".to_string(),
            ));
        }

        Ok(())
    }
}

impl LlmConfig {
    pub fn effective_base_url(&self) -> &str {
        self.base_url.as_deref().unwrap_or(self.provider.default_base_url())
    }
}

impl AppConfig {
    pub fn load(options: LoadOptions) -> Result<Self, ConfigError> {
        let mut config = Self::default();
        let maybe_path = resolve_config_path(options.config_path.as_deref());

        if let Some(path) = maybe_path {
            let patch = read_patch(&path)?;
            config.apply_patch(patch);
        } else if options.require_file {
            let expected = options.config_path.unwrap_or_else(|| PathBuf::from("ringside.toml"));
            return Err(ConfigError::MissingConfigFile(expected));
        }

        config.apply_env_overrides()?;
        config.apply_overrides(options.overrides);
        config.resolve_provider_api_key();
        config.validate()?;

        Ok(config)
    }

    fn apply_patch(&mut self, patch: ConfigPatch) {
        if let Some(simulation) = patch.simulation {
            if let Some(sales) = simulation.sales {
                apply_role_patch(&mut self.simulation.sales, sales);
            }
            if let Some(prospect) = simulation.prospect {
                apply_role_patch(&mut self.simulation.prospect, prospect);
            }
            if let Some(assessor) = simulation.assessor {
                apply_role_patch(&mut self.simulation.assessor, assessor);
            }
            if let Some(max_message_exchanges) = simulation.max_message_exchanges {
                self.simulation.max_message_exchanges = max_message_exchanges;
            }
            if let Some(num_simulations) = simulation.num_simulations {
                self.simulation.num_simulations = num_simulations;
            }
            if let Some(concurrency) = simulation.concurrency {
                self.simulation.concurrency = concurrency;
            }
        }

        if let Some(llm) = patch.llm {
            if let Some(provider) = llm.provider {
                self.llm.provider = provider;
            }
            if let Some(llm_api_key_value) = llm.api_key {
                self.llm.api_key = Some(secret_value(llm_api_key_value));
            }
            if let Some(base_url) = llm.base_url {
                self.llm.base_url = Some(base_url);
            }
            if let Some(timeout_secs) = llm.timeout_secs {
                self.llm.timeout_secs = Some(timeout_secs);
            }
        }

        if let Some(output) = patch.output {
            if let Some(directory) = output.directory {
                self.output.directory = directory;
            }
        }

        if let Some(logging) = patch.logging {
            if let Some(level) = logging.level {
                self.logging.level = level;
            }
            if let Some(format) = logging.format {
                self.logging.format = format;
            }
        }
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        if let Some(value) = read_env("RINGSIDE_SIMULATION_NUM_SIMULATIONS") {
            self.simulation.num_simulations =
                parse_u32("RINGSIDE_SIMULATION_NUM_SIMULATIONS", &value)?;
        }
        if let Some(value) = read_env("RINGSIDE_SIMULATION_MAX_MESSAGE_EXCHANGES") {
            self.simulation.max_message_exchanges =
                parse_u32("RINGSIDE_SIMULATION_MAX_MESSAGE_EXCHANGES", &value)?;
        }
        if let Some(value) = read_env("RINGSIDE_SIMULATION_CONCURRENCY") {
            self.simulation.concurrency = parse_u32("RINGSIDE_SIMULATION_CONCURRENCY", &value)?;
        }

        apply_role_env("SALES", &mut self.simulation.sales)?;
        apply_role_env("PROSPECT", &mut self.simulation.prospect)?;
        apply_role_env("ASSESSOR", &mut self.simulation.assessor)?;

        if let Some(value) = read_env("RINGSIDE_LLM_PROVIDER") {
            self.llm.provider = value.parse()?;
        }
        if let Some(value) = read_env("RINGSIDE_LLM_API_KEY") {
            self.llm.api_key = Some(secret_value(value));
        }
        if let Some(value) = read_env("RINGSIDE_LLM_BASE_URL") {
            self.llm.base_url = Some(value);
        }
        if let Some(value) = read_env("RINGSIDE_LLM_TIMEOUT_SECS") {
            self.llm.timeout_secs = Some(parse_u64("RINGSIDE_LLM_TIMEOUT_SECS", &value)?);
        }

        if let Some(value) = read_env("RINGSIDE_OUTPUT_DIRECTORY") {
            self.output.directory = PathBuf::from(value);
        }

        let log_level =
            read_env("RINGSIDE_LOGGING_LEVEL").or_else(|| read_env("RINGSIDE_LOG_LEVEL"));
        if let Some(value) = log_level {
            self.logging.level = value;
        }
        let log_format =
            read_env("RINGSIDE_LOGGING_FORMAT").or_else(|| read_env("RINGSIDE_LOG_FORMAT"));
        if let Some(value) = log_format {
            self.logging.format = value.parse()?;
        }

        Ok(())
    }

    fn apply_overrides(&mut self, overrides: ConfigOverrides) {
        if let Some(num_simulations) = overrides.num_simulations {
            self.simulation.num_simulations = num_simulations;
        }
        if let Some(max_message_exchanges) = overrides.max_message_exchanges {
            self.simulation.max_message_exchanges = max_message_exchanges;
        }
        if let Some(concurrency) = overrides.concurrency {
            self.simulation.concurrency = concurrency;
        }
        if let Some(sales_model) = overrides.sales_model {
            self.simulation.sales.model = sales_model;
        }
        if let Some(prospect_model) = overrides.prospect_model {
            self.simulation.prospect.model = prospect_model;
        }
        if let Some(llm_provider) = overrides.llm_provider {
            self.llm.provider = llm_provider;
        }
        if let Some(llm_api_key) = overrides.llm_api_key {
            self.llm.api_key = Some(secret_value(llm_api_key));
        }
        if let Some(output_directory) = overrides.output_directory {
            self.output.directory = output_directory;
        }
        if let Some(log_level) = overrides.log_level {
            self.logging.level = log_level;
        }
    }

    fn resolve_provider_api_key(&mut self) {
        if self.llm.api_key.is_none() {
            self.llm.api_key = read_env(self.llm.provider.api_key_env()).map(secret_value);
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.simulation.validate()?;
        validate_llm(&self.llm)?;
        validate_output(&self.output)?;
        validate_logging(&self.logging)?;
        Ok(())
    }
}

fn apply_role_patch(target: &mut RoleModelConfig, patch: RoleModelPatch) {
    if let Some(model) = patch.model {
        target.model = model;
    }
    if let Some(temperature) = patch.temperature {
        target.temperature = temperature;
    }
    if let Some(max_tokens) = patch.max_tokens {
        target.max_tokens = max_tokens;
    }
}

fn apply_role_env(role: &str, target: &mut RoleModelConfig) -> Result<(), ConfigError> {
    let model_key = format!("RINGSIDE_{role}_MODEL");
    if let Some(value) = read_env(&model_key) {
        target.model = value;
    }
    let temperature_key = format!("RINGSIDE_{role}_TEMPERATURE");
    if let Some(value) = read_env(&temperature_key) {
        target.temperature = parse_f32(&temperature_key, &value)?;
    }
    let max_tokens_key = format!("RINGSIDE_{role}_MAX_TOKENS");
    if let Some(value) = read_env(&max_tokens_key) {
        target.max_tokens = parse_u32(&max_tokens_key, &value)?;
    }
    Ok(())
}

pub fn resolve_config_path(explicit_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit_path {
        return path.exists().then_some(path.to_path_buf());
    }

    [PathBuf::from("ringside.toml"), PathBuf::from("config/ringside.toml")]
        .into_iter()
        .find(|path| path.exists())
}

fn read_patch(path: &Path) -> Result<ConfigPatch, ConfigError> {
    let raw = fs::read_to_string(path)
        .map_err(|source| ConfigError::ReadFile { path: path.to_path_buf(), source })?;

    let interpolated = interpolate_env_vars(&raw)?;
    toml::from_str::<ConfigPatch>(&interpolated)
        .map_err(|source| ConfigError::ParseFile { path: path.to_path_buf(), source })
}

fn interpolate_env_vars(input: &str) -> Result<String, ConfigError> {
    let mut output = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' && matches!(chars.peek(), Some('{')) {
            chars.next();
            let mut key = String::new();

            loop {
                match chars.next() {
                    Some('}') => break,
                    Some(next) => key.push(next),
                    None => return Err(ConfigError::UnterminatedInterpolation),
                }
            }

            let value = env::var(&key)
                .map_err(|_| ConfigError::MissingEnvInterpolation { var: key.clone() })?;
            output.push_str(&value);
            continue;
        }

        output.push(ch);
    }

    Ok(output)
}

fn validate_role_model(role: AgentRole, model: &RoleModelConfig) -> Result<(), ConfigError> {
    let role = role.as_str();
    if model.model.trim().is_empty() {
        return Err(ConfigError::Validation(format!("simulation.{role}.model must not be empty")));
    }
    if !model.temperature.is_finite() || !(0.0..=2.0).contains(&model.temperature) {
        return Err(ConfigError::Validation(format!(
            "simulation.{role}.temperature must be in range 0.0..=2.0"
        )));
    }
    if model.max_tokens == 0 || model.max_tokens > 4096 {
        return Err(ConfigError::Validation(format!(
            "simulation.{role}.max_tokens must be in range 1..=4096"
        )));
    }
    Ok(())
}

fn validate_llm(llm: &LlmConfig) -> Result<(), ConfigError> {
    if let Some(base_url) = &llm.base_url {
        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(ConfigError::Validation(
                "llm.base_url must start with http:// or https://".to_string(),
            ));
        }
    }

    if let Some(timeout_secs) = llm.timeout_secs {
        if timeout_secs == 0 || timeout_secs > 600 {
            return Err(ConfigError::Validation(
                "llm.timeout_secs must be in range 1..=600 when set".to_string(),
            ));
        }
    }

    if let Some(api_key) = &llm.api_key {
        if api_key.expose_secret().trim().is_empty() {
            return Err(ConfigError::Validation("llm.api_key must not be blank".to_string()));
        }
    }

    Ok(())
}

fn validate_output(output: &OutputConfig) -> Result<(), ConfigError> {
    if output.directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation("output.directory must not be empty".to_string()));
    }
    Ok(())
}

fn validate_logging(logging: &LoggingConfig) -> Result<(), ConfigError> {
    let level = logging.level.trim().to_ascii_lowercase();
    match level.as_str() {
        "trace" | "debug" | "info" | "warn" | "error" => Ok(()),
        _ => Err(ConfigError::Validation(
            "logging.level must be one of trace|debug|info|warn|error".to_string(),
        )),
    }
}

fn read_env(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn parse_u32(key: &str, value: &str) -> Result<u32, ConfigError> {
    value.parse::<u32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_u64(key: &str, value: &str) -> Result<u64, ConfigError> {
    value.parse::<u64>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

fn parse_f32(key: &str, value: &str) -> Result<f32, ConfigError> {
    value.parse::<f32>().map_err(|_| ConfigError::InvalidEnvOverride {
        key: key.to_string(),
        value: value.to_string(),
    })
}

#[derive(Debug, Default, Deserialize)]
struct ConfigPatch {
    simulation: Option<SimulationPatch>,
    llm: Option<LlmPatch>,
    output: Option<OutputPatch>,
    logging: Option<LoggingPatch>,
}

#[derive(Debug, Default, Deserialize)]
struct SimulationPatch {
    sales: Option<RoleModelPatch>,
    prospect: Option<RoleModelPatch>,
    assessor: Option<RoleModelPatch>,
    max_message_exchanges: Option<u32>,
    num_simulations: Option<u32>,
    concurrency: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct RoleModelPatch {
    model: Option<String>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
struct LlmPatch {
    provider: Option<LlmProvider>,
    api_key: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
struct OutputPatch {
    directory: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct LoggingPatch {
    level: Option<String>,
    format: Option<LogFormat>,
}

#[cfg(test)]
mod tests {
    use std::env;
    use std::fs;
    use std::io;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};

    use secrecy::ExposeSecret;
    use tempfile::TempDir;

    use super::{
        AgentRole, AppConfig, ConfigError, ConfigOverrides, LlmProvider, LoadOptions, LogFormat,
        SimulationConfig,
    };

    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();

    const RINGSIDE_VARS: &[&str] = &[
        "RINGSIDE_SIMULATION_NUM_SIMULATIONS",
        "RINGSIDE_SIMULATION_MAX_MESSAGE_EXCHANGES",
        "RINGSIDE_SIMULATION_CONCURRENCY",
        "RINGSIDE_SALES_MODEL",
        "RINGSIDE_SALES_TEMPERATURE",
        "RINGSIDE_PROSPECT_TEMPERATURE",
        "RINGSIDE_LLM_PROVIDER",
        "RINGSIDE_LLM_API_KEY",
        "RINGSIDE_LOG_LEVEL",
        "RINGSIDE_LOG_FORMAT",
        "OPENAI_API_KEY",
        "GROQ_API_KEY",
        "TEST_RINGSIDE_API_KEY",
    ];

    fn env_lock() -> &'static Mutex<()> {
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn clear_vars(vars: &[&str]) {
        for var in vars {
            env::remove_var(var);
        }
    }

    fn ensure(condition: bool, message: &'static str) -> Result<(), String> {
        if condition {
            Ok(())
        } else {
            Err(message.to_string())
        }
    }

    fn missing_file() -> Option<PathBuf> {
        Some(PathBuf::from("does-not-exist/ringside.toml"))
    }

    #[test]
    fn defaults_mirror_reference_simulation_settings() {
        let config = SimulationConfig::default();
        assert_eq!(config.max_message_exchanges, 3);
        assert_eq!(config.num_simulations, 100);
        assert_eq!(config.concurrency, 1);
        assert_eq!(config.role_model(AgentRole::Prospect).temperature, 0.85);
        assert_eq!(config.role_model(AgentRole::Sales).max_tokens, 120);
        assert_eq!(config.role_model(AgentRole::Assessor).temperature, 0.1);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn file_load_supports_env_interpolation() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(RINGSIDE_VARS);

        env::set_var("TEST_RINGSIDE_API_KEY", "sk-from-env");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("ringside.toml");
            fs::write(
                &path,
                r#"
[llm]
provider = "groq"
api_key = "${TEST_RINGSIDE_API_KEY}"

[simulation]
max_message_exchanges = 5

[simulation.prospect]
model = "llama-3.1-8b-instant"
temperature = 0.9
"#,
            )
            .map_err(|err| err.to_string())?;

            let config =
                AppConfig::load(LoadOptions { config_path: Some(path), ..LoadOptions::default() })
                    .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.llm.provider == LlmProvider::Groq, "provider should come from file")?;
            ensure(
                config.llm.api_key.as_ref().map(|key| key.expose_secret() == "sk-from-env")
                    == Some(true),
                "api key should be interpolated from environment",
            )?;
            ensure(
                config.simulation.max_message_exchanges == 5,
                "exchange ceiling should come from file",
            )?;
            ensure(
                config.simulation.prospect.model == "llama-3.1-8b-instant",
                "prospect model should come from file",
            )?;
            ensure(
                config.simulation.sales.model == "gpt-4o-mini",
                "sales model should keep its default",
            )?;
            ensure(
                config.llm.effective_base_url() == "https://api.groq.com/openai/v1",
                "groq base url should be derived from provider",
            )?;
            Ok(())
        })();

        clear_vars(RINGSIDE_VARS);
        result
    }

    #[test]
    fn logging_env_aliases_are_supported() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(RINGSIDE_VARS);

        env::set_var("RINGSIDE_LOG_LEVEL", "warn");
        env::set_var("RINGSIDE_LOG_FORMAT", "pretty");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions {
                config_path: missing_file(),
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.logging.level == "warn", "warning log level should be set from env var")?;
            ensure(
                matches!(config.logging.format, LogFormat::Pretty),
                "pretty logging format should be set from env var",
            )?;
            Ok(())
        })();

        clear_vars(RINGSIDE_VARS);
        result
    }

    #[test]
    fn precedence_defaults_file_env_overrides() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(RINGSIDE_VARS);

        env::set_var("RINGSIDE_SIMULATION_NUM_SIMULATIONS", "40");
        env::set_var("RINGSIDE_SALES_MODEL", "gpt-4o");
        env::set_var("RINGSIDE_SALES_TEMPERATURE", "0.2");

        let result = (|| -> Result<(), String> {
            let dir = TempDir::new().map_err(|err: io::Error| err.to_string())?;
            let path = dir.path().join("ringside.toml");
            fs::write(
                &path,
                r#"
[simulation]
num_simulations = 10
concurrency = 4

[simulation.sales]
model = "gpt-4o-mini"

[logging]
level = "warn"
"#,
            )
            .map_err(|err| err.to_string())?;

            let config = AppConfig::load(LoadOptions {
                config_path: Some(path),
                overrides: ConfigOverrides {
                    num_simulations: Some(7),
                    log_level: Some("debug".to_string()),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(config.simulation.num_simulations == 7, "override batch size should win")?;
            ensure(config.logging.level == "debug", "overridden log level should be debug")?;
            ensure(config.simulation.concurrency == 4, "file concurrency should apply")?;
            ensure(config.simulation.sales.model == "gpt-4o", "env sales model should beat file")?;
            ensure(
                (config.simulation.sales.temperature - 0.2).abs() < f32::EPSILON,
                "env sales temperature should apply",
            )?;
            Ok(())
        })();

        clear_vars(RINGSIDE_VARS);
        result
    }

    #[test]
    fn provider_api_key_fallback_is_used_when_unset() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(RINGSIDE_VARS);

        env::set_var("GROQ_API_KEY", "gsk-fallback");
        env::set_var("OPENAI_API_KEY", "sk-ignored");

        let result = (|| -> Result<(), String> {
            let config = AppConfig::load(LoadOptions {
                config_path: missing_file(),
                overrides: ConfigOverrides {
                    llm_provider: Some(LlmProvider::Groq),
                    ..ConfigOverrides::default()
                },
                ..LoadOptions::default()
            })
            .map_err(|err| format!("config load failed: {err}"))?;

            ensure(
                config.llm.api_key.as_ref().map(|key| key.expose_secret() == "gsk-fallback")
                    == Some(true),
                "provider-specific key should be picked up",
            )?;
            Ok(())
        })();

        clear_vars(RINGSIDE_VARS);
        result
    }

    #[test]
    fn validation_fails_fast_with_actionable_error() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(RINGSIDE_VARS);

        env::set_var("RINGSIDE_PROSPECT_TEMPERATURE", "3.5");

        let result = (|| -> Result<(), String> {
            let error = match AppConfig::load(LoadOptions {
                config_path: missing_file(),
                ..LoadOptions::default()
            }) {
                Ok(_) => {
                    return Err("expected validation failure but config load succeeded".to_string())
                }
                Err(error) => error,
            };

            ensure(
                matches!(error, ConfigError::Validation(_)),
                "invalid temperature should be a validation error",
            )?;
            ensure(
                error.to_string().contains("simulation.prospect.temperature"),
                "error should name the offending key",
            )?;
            Ok(())
        })();

        clear_vars(RINGSIDE_VARS);
        result
    }

    #[test]
    fn invalid_env_override_is_reported_with_key() -> Result<(), String> {
        let _guard = env_lock().lock().map_err(|_| "env lock is poisoned".to_string())?;
        clear_vars(RINGSIDE_VARS);

        env::set_var("RINGSIDE_SIMULATION_CONCURRENCY", "many");

        let result = match AppConfig::load(LoadOptions {
            config_path: missing_file(),
            ..LoadOptions::default()
        }) {
            Err(ConfigError::InvalidEnvOverride { key, .. }) => ensure(
                key == "RINGSIDE_SIMULATION_CONCURRENCY",
                "error should carry the env key",
            ),
            Err(other) => Err(format!("unexpected error: {other}")),
            Ok(_) => Err("expected invalid override error".to_string()),
        };

        clear_vars(RINGSIDE_VARS);
        result
    }

    #[test]
    fn exchange_ceiling_and_batch_size_must_be_positive() {
        let mut config = SimulationConfig::default();
        config.max_message_exchanges = 0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.num_simulations = 0;
        assert!(config.validate().is_err());

        let mut config = SimulationConfig::default();
        config.assessor.model = "  ".to_string();
        let error = config.validate().expect_err("blank assessor model must fail");
        assert!(error.to_string().contains("simulation.assessor.model"));
    }

    #[test]
    fn require_file_reports_missing_path() {
        let _guard = env_lock().lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let result = AppConfig::load(LoadOptions {
            config_path: missing_file(),
            require_file: true,
            ..LoadOptions::default()
        });
        assert!(matches!(result, Err(ConfigError::MissingConfigFile(_))));
    }
}
