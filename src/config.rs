//! 服务配置 - 按部署环境加载 API key
//!
//! 配置文件位于 `<root>/config/service.yml`，结构为：
//!
//! ```yaml
//! production:
//!   api_key: UBERSECRET
//! development:
//!   api_key: DEVKEY
//! transport:          # 可选
//!   host: hoptoadapp.com
//!   read_timeout_ms: 5000
//! filters:            # 可选
//!   params_filters: [password]
//! ```
//!
//! 环境名和内部字段既可以写成 `production` 也可以写成 Ruby symbol 风格的 `:production`。

use serde::{Deserialize, Serialize};
use serde_yaml::{Mapping, Value};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// 相对于应用根目录的配置文件路径
pub const CONFIG_RELATIVE_PATH: &str = "config/service.yml";

/// 读取当前环境名的环境变量
pub const DEFAULT_ENV_VAR: &str = "APP_ENV";

/// 环境变量未设置时使用的环境名
pub const DEFAULT_ENVIRONMENT: &str = "development";

/// 默认服务主机
pub const DEFAULT_HOST: &str = "hoptoadapp.com";

/// 建立连接超时（毫秒）
pub const DEFAULT_OPEN_TIMEOUT_MS: u64 = 2000;

/// 读取响应超时（毫秒）
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 5000;

/// 保留的顶层 key，不会被当作环境名
const TRANSPORT_KEY: &str = "transport";
const FILTERS_KEY: &str = "filters";

/// 配置加载错误
#[derive(Debug, Error)]
pub enum ConfigError {
    /// 读取配置文件失败
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// YAML 解析失败
    #[error("Failed to parse service config: {0}")]
    Parse(#[from] serde_yaml::Error),

    /// 文档结构不符合预期
    #[error("Invalid service config: {0}")]
    Invalid(String),
}

/// 单个环境的配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default)]
    pub api_key: Option<String>,
}

/// HTTP 传输配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub host: String,
    pub port: u16,
    /// 使用 https
    pub secure: bool,
    pub open_timeout_ms: u64,
    pub read_timeout_ms: u64,
    /// 是否使用系统代理（HTTP_PROXY 等）
    pub use_proxy: bool,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: 80,
            secure: false,
            open_timeout_ms: DEFAULT_OPEN_TIMEOUT_MS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
            use_proxy: true,
        }
    }
}

/// 参数 / 环境变量过滤规则（正则表达式）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// 匹配的请求参数值替换为 `[FILTERED]`
    pub params_filters: Vec<String>,
    /// 匹配的环境变量直接丢弃
    pub environment_filters: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            params_filters: vec!["password".to_string()],
            environment_filters: Vec::new(),
        }
    }
}

/// 服务配置（加载后不可变）
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceConfig {
    environments: BTreeMap<String, EnvironmentConfig>,
    pub transport: TransportConfig,
    pub filters: FilterConfig,
}

impl ServiceConfig {
    /// 空配置（无任何环境）
    pub fn new() -> Self {
        Self::default()
    }

    /// 添加一个环境的 API key
    pub fn with_environment(mut self, name: impl Into<String>, api_key: impl Into<String>) -> Self {
        self.environments.insert(
            name.into(),
            EnvironmentConfig {
                api_key: Some(api_key.into()),
            },
        );
        self
    }

    /// 设置传输配置
    pub fn with_transport(mut self, transport: TransportConfig) -> Self {
        self.transport = transport;
        self
    }

    /// 设置过滤规则
    pub fn with_filters(mut self, filters: FilterConfig) -> Self {
        self.filters = filters;
        self
    }

    /// 配置文件路径
    pub fn path(root: &Path) -> PathBuf {
        root.join(CONFIG_RELATIVE_PATH)
    }

    /// 从 `<root>/config/service.yml` 加载
    pub fn load(root: &Path) -> Result<Self, ConfigError> {
        let path = Self::path(root);
        let content = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;

        let config = Self::from_yaml_str(&content)?;
        debug!(
            path = %path.display(),
            environments = config.environments.len(),
            "Loaded service config"
        );
        Ok(config)
    }

    /// 从 YAML 文本解析
    pub fn from_yaml_str(content: &str) -> Result<Self, ConfigError> {
        let document: Value = serde_yaml::from_str(content)?;
        let root = match document {
            Value::Null => return Ok(Self::default()),
            Value::Mapping(mapping) => stringify_keys(&mapping),
            other => {
                return Err(ConfigError::Invalid(format!(
                    "expected a mapping of environments, found {}",
                    value_kind(&other)
                )))
            }
        };

        let mut config = Self::default();
        for (key, value) in root {
            let name = match key {
                Value::String(name) => name,
                _ => continue,
            };

            match name.as_str() {
                TRANSPORT_KEY => config.transport = serde_yaml::from_value(normalize_section(value))?,
                FILTERS_KEY => config.filters = serde_yaml::from_value(normalize_section(value))?,
                _ => {
                    let environment = parse_environment(&name, value)?;
                    config.environments.insert(name, environment);
                }
            }
        }

        Ok(config)
    }

    /// 指定环境的 API key
    pub fn api_key_for(&self, environment: &str) -> Option<&str> {
        self.environments
            .get(environment)
            .and_then(|e| e.api_key.as_deref())
    }

    /// 已配置的环境名（按字母序）
    pub fn environment_names(&self) -> Vec<&str> {
        self.environments.keys().map(|k| k.as_str()).collect()
    }
}

/// 加载配置（`ServiceConfig::load` 的便捷入口）
pub fn configure(root: &Path) -> Result<ServiceConfig, ConfigError> {
    ServiceConfig::load(root)
}

fn parse_environment(name: &str, value: Value) -> Result<EnvironmentConfig, ConfigError> {
    let mapping = match value {
        Value::Null => return Ok(EnvironmentConfig::default()),
        Value::Mapping(mapping) => stringify_keys(&mapping),
        other => {
            return Err(ConfigError::Invalid(format!(
                "environment '{}' must be a mapping, found {}",
                name,
                value_kind(&other)
            )))
        }
    };

    let api_key = match mapping.get("api_key") {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(other) => {
            return Err(ConfigError::Invalid(format!(
                "environment '{}' has a non-string api_key ({})",
                name,
                value_kind(other)
            )))
        }
    };

    Ok(EnvironmentConfig { api_key })
}

fn normalize_section(value: Value) -> Value {
    match value {
        Value::Mapping(mapping) => Value::Mapping(stringify_keys(&mapping)),
        Value::Null => Value::Mapping(Mapping::new()),
        other => other,
    }
}

/// 将 key 统一为字符串，value 保持不变
///
/// 字符串 key 原样保留；Ruby symbol 风格的 `:name` 和 `!ruby/symbol name` 去掉前缀；
/// 数字、布尔等标量转为其文本形式。
pub fn stringify_keys(mapping: &Mapping) -> Mapping {
    mapping
        .iter()
        .map(|(k, v)| (Value::String(stringify_key(k)), v.clone()))
        .collect()
}

fn stringify_key(key: &Value) -> String {
    match key {
        Value::String(s) => s.strip_prefix(':').unwrap_or(s).to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        Value::Tagged(tagged) => stringify_key(&tagged.value),
        other => serde_yaml::to_string(other)
            .map(|s| s.trim_end().to_string())
            .unwrap_or_default(),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Sequence(_) => "a sequence",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}

/// 当前部署环境的来源（每次调用时读取，不缓存）
pub trait EnvironmentSource: Send + Sync {
    fn current(&self) -> String;
}

/// 固定环境名
#[derive(Debug, Clone)]
pub struct FixedEnvironment(String);

impl FixedEnvironment {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }
}

impl EnvironmentSource for FixedEnvironment {
    fn current(&self) -> String {
        self.0.clone()
    }
}

/// 从环境变量读取环境名
#[derive(Debug, Clone)]
pub struct EnvVarEnvironment {
    var: String,
    fallback: String,
}

impl EnvVarEnvironment {
    pub fn new(var: impl Into<String>, fallback: impl Into<String>) -> Self {
        Self {
            var: var.into(),
            fallback: fallback.into(),
        }
    }
}

impl Default for EnvVarEnvironment {
    fn default() -> Self {
        Self::new(DEFAULT_ENV_VAR, DEFAULT_ENVIRONMENT)
    }
}

impl EnvironmentSource for EnvVarEnvironment {
    fn current(&self) -> String {
        std::env::var(&self.var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| self.fallback.clone())
    }
}

/// 按当前环境解析 API key
#[derive(Clone)]
pub struct ConfigResolver {
    config: Arc<ServiceConfig>,
    environment: Arc<dyn EnvironmentSource>,
}

impl ConfigResolver {
    pub fn new(config: Arc<ServiceConfig>, environment: Arc<dyn EnvironmentSource>) -> Self {
        Self { config, environment }
    }

    /// 当前环境名
    pub fn current_environment(&self) -> String {
        self.environment.current()
    }

    /// 当前环境的 API key；环境未配置时返回 None
    pub fn api_key(&self) -> Option<String> {
        let environment = self.environment.current();
        let key = self.config.api_key_for(&environment).map(|k| k.to_string());
        if key.is_none() {
            debug!(environment = %environment, "No api_key configured for environment");
        }
        key
    }

    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }
}

impl std::fmt::Debug for ConfigResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigResolver")
            .field("config", &self.config)
            .field("environment", &self.environment.current())
            .finish()
    }
}
