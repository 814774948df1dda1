//! 配置管理器
//!
//! 按 `.env` 文件 → 配置文件 → 环境变量 的顺序合成最终配置

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::constants;
use crate::translation::error::{TranslationError, TranslationResult};

/// 翻译客户端与设置存储的配置
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TranslationConfig {
    // 端点配置
    pub api_url: String,
    pub client: String,
    pub output_format: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    // 请求策略
    pub max_chunk_chars: usize,
    pub max_retries: usize,
    pub retry_delay_ms: u64,

    // 设置存储位置
    pub settings_path: String,
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            api_url: constants::DEFAULT_API_URL.to_string(),
            client: constants::DEFAULT_CLIENT.to_string(),
            output_format: constants::DEFAULT_OUTPUT_FORMAT.to_string(),
            user_agent: None,

            max_chunk_chars: constants::MAX_CHUNK_CHARS,
            max_retries: constants::MAX_RETRIES,
            retry_delay_ms: constants::RETRY_DELAY_MS,

            settings_path: constants::DEFAULT_SETTINGS_PATH.to_string(),
        }
    }
}

impl TranslationConfig {
    /// 使用指定端点的默认配置
    pub fn with_api_url(api_url: &str) -> Self {
        Self {
            api_url: api_url.to_string(),
            ..Self::default()
        }
    }

    /// 验证配置
    pub fn validate(&self) -> TranslationResult<()> {
        if self.max_chunk_chars == 0 {
            return Err(TranslationError::ConfigError("分块大小不能为0".to_string()));
        }

        if self.client.is_empty() {
            return Err(TranslationError::ConfigError("client 参数不能为空".to_string()));
        }

        url::Url::parse(&self.api_url)
            .map_err(|e| TranslationError::ConfigError(format!("API URL 无效: {}", e)))?;

        if self.settings_path.trim().is_empty() {
            return Err(TranslationError::ConfigError("设置文件路径不能为空".to_string()));
        }

        Ok(())
    }

    /// 应用环境变量覆盖，仅覆盖显式设置的变量
    pub fn apply_env_overrides(&mut self) {
        use crate::env::{translation, EnvVar};

        match translation::ApiUrl::get_explicit() {
            Ok(Some(api_url)) => {
                tracing::info!("环境变量覆盖 API URL: {}", api_url);
                self.api_url = api_url;
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("忽略无效环境变量: {}", e),
        }

        match translation::ChunkSize::get_explicit() {
            Ok(Some(size)) => self.max_chunk_chars = size,
            Ok(None) => {}
            Err(e) => tracing::warn!("忽略无效环境变量: {}", e),
        }

        match translation::MaxRetries::get_explicit() {
            Ok(Some(retries)) => self.max_retries = retries,
            Ok(None) => {}
            Err(e) => tracing::warn!("忽略无效环境变量: {}", e),
        }

        match translation::RetryDelay::get_explicit() {
            Ok(Some(delay)) => self.retry_delay_ms = delay.as_millis() as u64,
            Ok(None) => {}
            Err(e) => tracing::warn!("忽略无效环境变量: {}", e),
        }

        match translation::SettingsPath::get_explicit() {
            Ok(Some(path)) => self.settings_path = path,
            Ok(None) => {}
            Err(e) => tracing::warn!("忽略无效环境变量: {}", e),
        }
    }

    /// 重试延迟单位
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms)
    }

    /// 展开 `~` 后的设置文件路径
    pub fn settings_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.settings_path).as_ref())
    }
}

/// 配置管理器
pub struct ConfigManager {
    config: TranslationConfig,
}

impl ConfigManager {
    /// 搜索默认路径创建配置管理器
    pub fn new() -> TranslationResult<Self> {
        let config = Self::load_config()?;
        Self::finish(config)
    }

    /// 从指定文件创建配置管理器
    pub fn from_file<P: AsRef<Path>>(path: P) -> TranslationResult<Self> {
        Self::load_dotenv();
        let config = Self::load_from_file(path.as_ref())?;
        Self::finish(config)
    }

    fn finish(mut config: TranslationConfig) -> TranslationResult<Self> {
        config.apply_env_overrides();
        config.validate()?;

        Ok(Self { config })
    }

    /// 获取配置
    pub fn get_config(&self) -> &TranslationConfig {
        &self.config
    }

    pub fn into_config(self) -> TranslationConfig {
        self.config
    }

    fn load_config() -> TranslationResult<TranslationConfig> {
        // 首先尝试加载 .env 文件
        Self::load_dotenv();

        for path in constants::CONFIG_PATHS {
            let expanded_path = shellexpand::tilde(path);
            let candidate = Path::new(expanded_path.as_ref());
            if candidate.exists() {
                tracing::info!("加载配置文件: {}", expanded_path);
                return Self::load_from_file(candidate);
            }
        }

        tracing::debug!("未找到配置文件，使用默认配置");
        Ok(TranslationConfig::default())
    }

    fn load_from_file(path: &Path) -> TranslationResult<TranslationConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| TranslationError::ConfigError(format!("读取配置文件失败: {}", e)))?;

        if path.extension().map_or(false, |ext| ext == "json") {
            serde_json::from_str(&content)
                .map_err(|e| TranslationError::ConfigError(format!("解析JSON配置失败: {}", e)))
        } else {
            toml::from_str(&content)
                .map_err(|e| TranslationError::ConfigError(format!("解析TOML配置失败: {}", e)))
        }
    }

    fn load_dotenv() {
        let env_files = [".env.local", ".env"];

        for env_file in &env_files {
            if Path::new(env_file).exists() && dotenv::from_filename(env_file).is_ok() {
                tracing::info!("已加载环境变量文件: {}", env_file);
                break;
            }
        }
    }

    /// 生成示例配置文件
    pub fn generate_example_config<P: AsRef<Path>>(path: P) -> TranslationResult<()> {
        let config = TranslationConfig::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| TranslationError::ConfigError(format!("序列化配置失败: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| TranslationError::ConfigError(format!("写入配置文件失败: {}", e)))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_endpoint_contract() {
        let config = TranslationConfig::default();
        assert_eq!(config.client, "gtx");
        assert_eq!(config.output_format, "t");
        assert_eq!(config.max_chunk_chars, 5000);
        assert_eq!(config.max_retries, 2);
        assert_eq!(config.retry_delay(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let mut config = TranslationConfig::default();
        config.max_chunk_chars = 0;
        assert!(config.validate().is_err());

        let config = TranslationConfig::with_api_url("not a url");
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: TranslationConfig = toml::from_str("max_retries = 0\n").unwrap();
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.api_url, constants::DEFAULT_API_URL);
    }

    #[test]
    fn test_generate_and_reload_example_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("page-translate.toml");

        ConfigManager::generate_example_config(&path).unwrap();
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("api_url"));

        let parsed: TranslationConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed, TranslationConfig::default());
    }

    #[test]
    fn test_json_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"retry_delay_ms": 5}"#).unwrap();

        let config = ConfigManager::load_from_file(&path).unwrap();
        assert_eq!(config.retry_delay_ms, 5);
    }
}
