use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use serde::Deserialize;
use tracing::warn;

use crate::error::ConfigError;

const DEFAULT_INSTRUCTIONS: &str = "Eres un asistente docente. Respondes en español, con un tono formal, \
usando exclusivamente la información de los documentos cargados en tu base de conocimiento.";

/// 程序配置
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- OpenAI 助手配置 ---
    pub openai_api_key: String,
    pub openai_api_base: String,
    pub assistant_model: String,
    /// 创建助手时使用的系统指令
    pub assistant_instructions: String,
    // --- 会话轮询 ---
    /// 轮询运行状态的间隔（毫秒）
    pub poll_interval_ms: u64,
    /// 单次运行的最长等待时间（秒）
    pub poll_timeout_secs: u64,
    /// 单个 HTTP 请求超时（秒）
    pub request_timeout_secs: u64,
    /// 每次生成的最大尝试次数
    pub max_attempts: u32,
    /// 同一会话内最多尝试次数，超过后新建会话
    pub max_thread_attempts: u32,
    // --- 评分 ---
    /// 论述题相对客观题的权重
    pub essay_weight: f64,
    // --- 并发 ---
    /// 同时运行的生成会话数量
    pub max_concurrent_sessions: usize,
    // --- 日志 ---
    pub verbose_logging: bool,
    pub output_log_file: String,
    /// 记录结构不合法的回复（可选）
    pub rejected_log_file: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            openai_api_key: String::new(),
            openai_api_base: "https://api.openai.com/v1".to_string(),
            assistant_model: "gpt-4o-mini".to_string(),
            assistant_instructions: DEFAULT_INSTRUCTIONS.to_string(),
            poll_interval_ms: 1000,
            poll_timeout_secs: 180,
            request_timeout_secs: 60,
            max_attempts: 4,
            max_thread_attempts: 2,
            essay_weight: 2.0,
            max_concurrent_sessions: 4,
            verbose_logging: false,
            output_log_file: "output.txt".to_string(),
            rejected_log_file: None,
        }
    }
}

impl Config {
    /// 从环境变量加载，解析失败的数值回退到默认值
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            openai_api_key: std::env::var("OPENAI_API_KEY").unwrap_or(default.openai_api_key),
            openai_api_base: std::env::var("OPENAI_API_BASE").unwrap_or(default.openai_api_base),
            assistant_model: first_env(&["ASSISTANT_MODEL", "MODELO"]).unwrap_or(default.assistant_model),
            assistant_instructions: first_env(&["ASSISTANT_INSTRUCTIONS", "INSTRUCCIONES"])
                .unwrap_or(default.assistant_instructions),
            poll_interval_ms: parse_or("POLL_INTERVAL_MS", default.poll_interval_ms),
            poll_timeout_secs: parse_or("POLL_TIMEOUT_SECS", default.poll_timeout_secs),
            request_timeout_secs: parse_or("REQUEST_TIMEOUT_SECS", default.request_timeout_secs),
            max_attempts: parse_or("MAX_ATTEMPTS", default.max_attempts),
            max_thread_attempts: parse_or("MAX_THREAD_ATTEMPTS", default.max_thread_attempts),
            essay_weight: parse_or("ESSAY_WEIGHT", default.essay_weight),
            max_concurrent_sessions: parse_or("MAX_CONCURRENT_SESSIONS", default.max_concurrent_sessions),
            verbose_logging: parse_or("VERBOSE_LOGGING", default.verbose_logging),
            output_log_file: std::env::var("OUTPUT_LOG_FILE").unwrap_or(default.output_log_file),
            rejected_log_file: std::env::var("REJECTED_LOG_FILE").ok().or(default.rejected_log_file),
        }
    }

    /// 从环境变量加载，任何数值解析失败都返回错误
    pub fn try_from_env() -> Result<Self, ConfigError> {
        let mut config = Self::from_env();
        config.poll_interval_ms = try_parse("POLL_INTERVAL_MS", config.poll_interval_ms)?;
        config.poll_timeout_secs = try_parse("POLL_TIMEOUT_SECS", config.poll_timeout_secs)?;
        config.request_timeout_secs = try_parse("REQUEST_TIMEOUT_SECS", config.request_timeout_secs)?;
        config.max_attempts = try_parse("MAX_ATTEMPTS", config.max_attempts)?;
        config.max_thread_attempts = try_parse("MAX_THREAD_ATTEMPTS", config.max_thread_attempts)?;
        config.essay_weight = try_parse("ESSAY_WEIGHT", config.essay_weight)?;
        config.max_concurrent_sessions = try_parse("MAX_CONCURRENT_SESSIONS", config.max_concurrent_sessions)?;
        config.verbose_logging = try_parse("VERBOSE_LOGGING", config.verbose_logging)?;
        Ok(config)
    }

    /// 从 TOML 文件加载，缺失字段使用默认值
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    fn from_toml_str(content: &str, origin: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(|source| ConfigError::Toml {
            path: origin.to_string(),
            source,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_secs(self.poll_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn first_env(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| std::env::var(name).ok())
}

fn parse_or<T: FromStr + Copy>(var_name: &str, default: T) -> T {
    match std::env::var(var_name) {
        Ok(value) => value.trim().parse().unwrap_or_else(|_| {
            warn!("环境变量 {} 的值 '{}' 无法解析，使用默认值", var_name, value);
            default
        }),
        Err(_) => default,
    }
}

fn try_parse<T: FromStr>(var_name: &str, default: T) -> Result<T, ConfigError> {
    match std::env::var(var_name) {
        Ok(value) => value.trim().parse().map_err(|_| ConfigError::EnvVarParseFailed {
            var_name: var_name.to_string(),
            expected_type: std::any::type_name::<T>(),
            value,
        }),
        Err(_) => Ok(default),
    }
}
