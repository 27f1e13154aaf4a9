//! 解析器配置
//!
//! 签名校验的两个策略（loggable / failable）以及影响解析的容器级开关。
//! 配置以显式参数的形式传入解析器，不读取进程级全局状态。

use anyhow::Context;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;

/// 拦截器规范修订版本
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum InterceptorRevision {
    #[serde(rename = "1.1")]
    V1_1,
    /// 允许生命周期方法返回顶层类型
    #[serde(rename = "1.2")]
    V1_2,
}

impl Default for InterceptorRevision {
    fn default() -> Self {
        InterceptorRevision::V1_1
    }
}

impl FromStr for InterceptorRevision {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim() {
            "1.1" => Ok(InterceptorRevision::V1_1),
            "1.2" => Ok(InterceptorRevision::V1_2),
            _ => Err(format!("Invalid interceptor revision: {}", s)),
        }
    }
}

/// 解析器配置
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// 是否记录被容忍的签名偏差（默认：false）
    pub validation_loggable: bool,

    /// 是否把被容忍的签名偏差升级为致命错误（默认：false）
    pub validation_failable: bool,

    /// 拦截器规范修订版本（默认：1.1）
    pub interceptor_revision: InterceptorRevision,

    /// 有状态组件是否在事务上下文中执行生命周期回调（默认：false）
    /// 为 true 时有状态组件也会收集目标类自身声明的生命周期方法
    pub transactional_stateful_lifecycle: bool,
}

/// 配置文件中的 `[interceptor]` 表
#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    interceptor: ResolverConfig,
}

impl ResolverConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置是否记录被容忍的签名偏差
    pub fn validation_loggable(mut self, loggable: bool) -> Self {
        self.validation_loggable = loggable;
        self
    }

    /// 设置是否把被容忍的签名偏差升级为错误
    pub fn validation_failable(mut self, failable: bool) -> Self {
        self.validation_failable = failable;
        self
    }

    /// 设置拦截器规范修订版本
    pub fn interceptor_revision(mut self, revision: InterceptorRevision) -> Self {
        self.interceptor_revision = revision;
        self
    }

    /// 设置有状态组件生命周期回调是否需要事务上下文
    pub fn transactional_stateful_lifecycle(mut self, enabled: bool) -> Self {
        self.transactional_stateful_lifecycle = enabled;
        self
    }

    /// 生命周期方法是否可以返回顶层类型
    pub fn allows_lifecycle_return_value(&self) -> bool {
        self.interceptor_revision == InterceptorRevision::V1_2
    }

    /// 从 TOML 文本解析，读取 `[interceptor]` 表
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let file: ConfigFile =
            toml::from_str(content).context("Failed to parse interceptor configuration")?;
        Ok(file.interceptor)
    }

    /// 从 TOML 文件加载
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file '{}'", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file '{}'", path.display()))
    }

    /// 从环境变量读取配置
    pub fn from_env() -> Self {
        Self::default().with_env_overrides()
    }

    /// 用环境变量覆盖当前配置，无法解析的值会被忽略
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(value) = env_bool("CHIMERA_INTERCEPTOR_VALIDATION_LOGGABLE") {
            self.validation_loggable = value;
        }

        if let Some(value) = env_bool("CHIMERA_INTERCEPTOR_VALIDATION_FAILABLE") {
            self.validation_failable = value;
        }

        if let Ok(revision) = std::env::var("CHIMERA_INTERCEPTOR_REVISION") {
            match revision.parse() {
                Ok(revision) => self.interceptor_revision = revision,
                Err(e) => tracing::warn!("Ignoring CHIMERA_INTERCEPTOR_REVISION: {}", e),
            }
        }

        if let Some(value) = env_bool("CHIMERA_INTERCEPTOR_TX_STATEFUL_LIFECYCLE") {
            self.transactional_stateful_lifecycle = value;
        }

        self
    }
}

fn env_bool(key: &str) -> Option<bool> {
    let value = std::env::var(key).ok()?;
    match parse_bool(&value) {
        Some(b) => Some(b),
        None => {
            tracing::warn!("Ignoring {}: '{}' is not a boolean", key, value);
            None
        }
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" => Some(true),
        "false" | "no" | "0" => Some(false),
        _ => None,
    }
}
