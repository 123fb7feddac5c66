//! 统一错误处理模块
//!
//! 提供广告插件范围内的统一错误类型定义。
//!
//! 调用边界上的用法错误只记录日志、不进入异步管线；此处的错误类型
//! 用于基础设施层（配置加载、注册表、队列投递）。

use thiserror::Error;

use crate::config::ConfigError;
use crate::registry::RegistryError;

/// 广告插件错误类型
#[derive(Error, Debug)]
pub enum AdsError {
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Dispatch error: {0}")]
    Dispatch(String),
}

/// 插件结果类型别名
pub type AdsResult<T> = Result<T, AdsError>;
