//! 接收器运行配置加载。
//!
//! 支持两种来源：
//! - JSON（`ReceiverConfig::from_json`，也可经 `MDT_CONFIG_FILE` 指定文件）
//! - 环境变量（`ReceiverConfig::from_env`，标量项覆盖 JSON 中的值）
//!
//! ```json
//! {
//!   "transport": "grpc",
//!   "service_address": "0.0.0.0:57000",
//!   "aliases": { "ifstats": "ifmgr-oper:interface-properties/interfaces" },
//!   "embedded_tags": ["type:model/extra/list/name"],
//!   "field_conversions": { "sys/lldp": { "portIdV": "string" } }
//! }
//! ```

use serde::Deserialize;
use std::collections::HashMap;
use std::env;

/// 配置加载错误。
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
    #[error("config parse error: {0}")]
    Parse(String),
}

/// gRPC keepalive 执行策略。
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EnforcementPolicy {
    /// 无活动流时是否允许客户端 keepalive
    #[serde(default)]
    pub permit_keepalive_without_calls: bool,
    /// 客户端 ping 的最小间隔（秒）
    #[serde(default = "default_keepalive_min_time")]
    pub keepalive_min_time_secs: u64,
}

impl Default for EnforcementPolicy {
    fn default() -> Self {
        Self {
            permit_keepalive_without_calls: false,
            keepalive_min_time_secs: default_keepalive_min_time(),
        }
    }
}

/// 接收器运行配置。
#[derive(Debug, Clone, Deserialize)]
pub struct ReceiverConfig {
    /// 传输方式：`tcp` 或 `grpc`（在启动时校验）
    #[serde(default = "default_transport")]
    pub transport: String,
    /// 监听地址，端口为 0 时由系统分配
    #[serde(default = "default_service_address")]
    pub service_address: String,
    /// 别名 → 编码路径
    #[serde(default)]
    pub aliases: HashMap<String, String>,
    /// 嵌入标签路径（`<编码路径>/<容器>/<叶子名>`）
    #[serde(default)]
    pub embedded_tags: Vec<String>,
    /// 是否输出 `delete` 布尔字段
    #[serde(default)]
    pub include_delete_field: bool,
    /// keys 中名为 `source` 的叶子改用的标签名
    #[serde(default = "default_source_field_name")]
    pub source_field_name: String,
    /// 单条消息最大字节数
    #[serde(default = "default_max_msg_size")]
    pub max_msg_size: usize,
    /// 编码路径 → (字段路径 → 输出字段名)
    #[serde(default)]
    pub field_names: HashMap<String, HashMap<String, String>>,
    /// 编码路径 → (字段名 → 目标类型)
    #[serde(default)]
    pub field_conversions: HashMap<String, HashMap<String, String>>,
    #[serde(default)]
    pub enforcement_policy: EnforcementPolicy,
}

fn default_transport() -> String {
    "grpc".to_string()
}

fn default_service_address() -> String {
    "0.0.0.0:57000".to_string()
}

fn default_source_field_name() -> String {
    "mdt_source".to_string()
}

fn default_max_msg_size() -> usize {
    4 * 1024 * 1024
}

fn default_keepalive_min_time() -> u64 {
    300
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            transport: default_transport(),
            service_address: default_service_address(),
            aliases: HashMap::new(),
            embedded_tags: Vec::new(),
            include_delete_field: false,
            source_field_name: default_source_field_name(),
            max_msg_size: default_max_msg_size(),
            field_names: HashMap::new(),
            field_conversions: HashMap::new(),
            enforcement_policy: EnforcementPolicy::default(),
        }
    }
}

impl ReceiverConfig {
    /// 从 JSON 配置字符串解析并校验。
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config = Self::parse_json(json)?;
        config.validate()?;
        Ok(config)
    }

    /// 从环境变量读取配置。
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = match read_optional("MDT_CONFIG_FILE") {
            Some(path) => {
                let json = std::fs::read_to_string(&path).map_err(|e| {
                    ConfigError::Invalid("MDT_CONFIG_FILE".to_string(), format!("{}: {}", path, e))
                })?;
                Self::parse_json(&json)?
            }
            None => Self::default(),
        };

        if let Some(transport) = read_optional("MDT_TRANSPORT") {
            config.transport = transport;
        }
        if let Some(address) = read_optional("MDT_SERVICE_ADDRESS") {
            config.service_address = address;
        }
        if let Some(aliases) = read_optional("MDT_ALIASES") {
            config.aliases.extend(parse_pairs("MDT_ALIASES", &aliases)?);
        }
        if let Some(tags) = read_optional("MDT_EMBEDDED_TAGS") {
            config.embedded_tags.extend(parse_list(&tags));
        }
        if let Some(name) = read_optional("MDT_SOURCE_FIELD_NAME") {
            config.source_field_name = name;
        }
        config.include_delete_field =
            read_bool_with_default("MDT_INCLUDE_DELETE_FIELD", config.include_delete_field);
        config.max_msg_size = read_usize_with_default("MDT_MAX_MSG_SIZE", config.max_msg_size)?;
        config.enforcement_policy.permit_keepalive_without_calls = read_bool_with_default(
            "MDT_KEEPALIVE_PERMIT_WITHOUT_CALLS",
            config.enforcement_policy.permit_keepalive_without_calls,
        );
        config.enforcement_policy.keepalive_min_time_secs = read_u64_with_default(
            "MDT_KEEPALIVE_MIN_TIME_SECS",
            config.enforcement_policy.keepalive_min_time_secs,
        )?;

        config.validate()?;
        Ok(config)
    }

    /// 校验加载方式无关的约束（两种加载方式与接收器启动都会调用）。
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_msg_size == 0 {
            return Err(ConfigError::Invalid("max_msg_size".to_string(), "0".to_string()));
        }
        Ok(())
    }

    fn parse_json(json: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))
    }
}

/// 解析 `alias=path,alias2=path2` 形式的列表。
fn parse_pairs(key: &str, value: &str) -> Result<HashMap<String, String>, ConfigError> {
    let mut pairs = HashMap::new();
    for item in parse_list(value) {
        let (alias, path) = item
            .split_once('=')
            .ok_or_else(|| ConfigError::Invalid(key.to_string(), item.clone()))?;
        let (alias, path) = (alias.trim(), path.trim());
        if alias.is_empty() || path.is_empty() {
            return Err(ConfigError::Invalid(key.to_string(), item.clone()));
        }
        pairs.insert(alias.to_string(), path.to_string());
    }
    Ok(pairs)
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

fn read_u64_with_default(key: &str, default: u64) -> Result<u64, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<u64>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_usize_with_default(key: &str, default: usize) -> Result<usize, ConfigError> {
    let value = match env::var(key) {
        Ok(value) => value,
        Err(_) => return Ok(default),
    };
    value
        .parse::<usize>()
        .map_err(|_| ConfigError::Invalid(key.to_string(), value))
}

fn read_optional(key: &str) -> Option<String> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Some(value),
        _ => None,
    }
}

fn read_bool_with_default(key: &str, default: bool) -> bool {
    match env::var(key) {
        Ok(value) => matches!(value.to_ascii_lowercase().as_str(), "1" | "true" | "on"),
        Err(_) => default,
    }
}
