//! 插件配置
//!
//! 提供 TOML/JSON 配置文件、环境变量覆盖和校验。init 的 options
//! 表优先于配置文件；配置只提供缺省值。

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::layout::BannerSize;

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// 文件读取错误
    #[error("Config file error: {0}")]
    FileError(#[from] std::io::Error),
    /// 解析错误
    #[error("Config parse error: {0}")]
    ParseError(String),
    /// 验证错误
    #[error("Config validation error: {0}")]
    ValidationError(String),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

fn default_banner_size() -> String {
    "BANNER_50".to_string()
}

/// 广告插件配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdsConfig {
    /// 测试模式缺省值；init 的 options.testMode 优先
    #[serde(default)]
    pub test_mode: bool,

    /// load 未指定 bannerSize 时使用的档位
    #[serde(default = "default_banner_size")]
    pub default_banner_size: String,

    /// load 未指定 bannerTransparency 时使用的缺省值
    #[serde(default)]
    pub banner_transparency: bool,
}

impl Default for AdsConfig {
    fn default() -> Self {
        Self {
            test_mode: false,
            default_banner_size: default_banner_size(),
            banner_transparency: false,
        }
    }
}

impl AdsConfig {
    /// 创建默认配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 从TOML文件加载配置
    pub fn from_toml_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_toml_str(&content)
    }

    /// 从TOML字符串解析配置
    pub fn from_toml_str(content: &str) -> ConfigResult<Self> {
        toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(ConfigError::FileError)?;
        Self::from_json_str(&content)
    }

    /// 从JSON字符串解析配置
    pub fn from_json_str(content: &str) -> ConfigResult<Self> {
        serde_json::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))
    }

    /// 从环境变量覆盖配置
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = env::var("ADS_TEST_MODE") {
            self.test_mode = val.parse().unwrap_or(self.test_mode);
        }
        if let Ok(val) = env::var("ADS_DEFAULT_BANNER_SIZE") {
            self.default_banner_size = val;
        }
        if let Ok(val) = env::var("ADS_BANNER_TRANSPARENCY") {
            self.banner_transparency = val.parse().unwrap_or(self.banner_transparency);
        }
    }

    /// 验证配置
    pub fn validate(&self) -> ConfigResult<()> {
        if BannerSize::parse(&self.default_banner_size).is_none() {
            return Err(ConfigError::ValidationError(format!(
                "unknown banner size '{}'",
                self.default_banner_size
            )));
        }
        Ok(())
    }

    /// 解析后的缺省横幅档位
    pub fn banner_size(&self) -> BannerSize {
        BannerSize::parse(&self.default_banner_size).unwrap_or_default()
    }

    /// 自动查找并加载配置文件
    ///
    /// 按以下顺序查找：
    /// 1. ./ads.toml
    /// 2. ./ads.json
    /// 3. ~/.config/game_engine/ads.toml
    /// 4. 使用默认配置
    pub fn load_or_default() -> Self {
        if let Ok(config) = Self::from_toml_file("ads.toml") {
            log::info!("Loaded ads config from ads.toml");
            return config;
        }

        if let Ok(config) = Self::from_json_file("ads.json") {
            log::info!("Loaded ads config from ads.json");
            return config;
        }

        if let Some(home) = env::var_os("HOME") {
            let config_path = PathBuf::from(home)
                .join(".config")
                .join("game_engine")
                .join("ads.toml");

            if let Ok(config) = Self::from_toml_file(&config_path) {
                log::info!("Loaded ads config from {:?}", config_path);
                return config;
            }
        }

        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AdsConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.banner_size(), BannerSize::Banner50);
        assert!(!config.test_mode);
    }

    #[test]
    fn test_toml_parse() {
        let config = AdsConfig::from_toml_str(
            r#"
            test_mode = true
            default_banner_size = "BANNER_90"
            "#,
        )
        .unwrap();
        assert!(config.test_mode);
        assert_eq!(config.banner_size(), BannerSize::Banner90);
        // 未指定的字段取缺省值
        assert!(!config.banner_transparency);
    }

    #[test]
    fn test_invalid_banner_size_fails_validation() {
        let config = AdsConfig {
            default_banner_size: "BANNER_320".to_string(),
            ..AdsConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ValidationError(_))
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = AdsConfig::default();
        env::set_var("ADS_TEST_MODE", "true");
        env::set_var("ADS_DEFAULT_BANNER_SIZE", "BANNER_250");
        config.apply_env_overrides();
        env::remove_var("ADS_TEST_MODE");
        env::remove_var("ADS_DEFAULT_BANNER_SIZE");

        assert!(config.test_mode);
        assert_eq!(config.banner_size(), BannerSize::Banner250);
    }

    #[test]
    fn test_config_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ads.toml");
        std::fs::write(&path, "test_mode = true\n").unwrap();

        let config = AdsConfig::from_toml_file(&path).unwrap();
        assert!(config.test_mode);
        assert_eq!(config.banner_size(), BannerSize::Banner50);
    }
}
