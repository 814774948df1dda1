//! 用户设置存储
//!
//! 设置以扩展存储的字段名（camelCase）序列化，缺失字段取默认值。

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

use crate::translation::config::constants;
use crate::translation::error::{helpers::settings_error, TranslationResult};

/// 持久化的翻译设置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TranslationSettings {
    pub is_enabled: bool,
    pub source_language: String,
    pub target_language: String,
    /// 按加入顺序排列的主机名
    pub excluded_sites: Vec<String>,
    pub translate_service: String,
}

impl Default for TranslationSettings {
    fn default() -> Self {
        Self {
            is_enabled: true,
            source_language: constants::DEFAULT_SOURCE_LANG.to_string(),
            target_language: constants::DEFAULT_TARGET_LANG.to_string(),
            excluded_sites: Vec::new(),
            translate_service: constants::DEFAULT_SERVICE.to_string(),
        }
    }
}

impl TranslationSettings {
    pub fn is_site_excluded(&self, host: &str) -> bool {
        self.excluded_sites.iter().any(|site| site == host)
    }

    /// 追加排除站点，已存在时返回 `false`
    pub fn exclude_site(&mut self, host: &str) -> bool {
        if self.is_site_excluded(host) {
            return false;
        }
        self.excluded_sites.push(host.to_string());
        true
    }
}

/// 设置存储接口
pub trait SettingsStore: Send + Sync {
    fn load(&self) -> TranslationResult<TranslationSettings>;

    fn save(&self, settings: &TranslationSettings) -> TranslationResult<()>;

    /// 读取、修改并写回设置
    fn update(
        &self,
        apply: &mut dyn FnMut(&mut TranslationSettings),
    ) -> TranslationResult<TranslationSettings> {
        let mut settings = self.load()?;
        apply(&mut settings);
        self.save(&settings)?;
        Ok(settings)
    }
}

/// 安装时写入默认设置，保留已有的翻译服务选择
pub fn install_defaults(store: &dyn SettingsStore) -> TranslationResult<TranslationSettings> {
    let settings = store.update(&mut |settings: &mut TranslationSettings| {
        settings.is_enabled = true;
        settings.target_language = constants::DEFAULT_TARGET_LANG.to_string();
        settings.source_language = constants::DEFAULT_SOURCE_LANG.to_string();
        settings.excluded_sites.clear();
    })?;
    tracing::info!("已写入默认设置");
    Ok(settings)
}

/// 基于 JSON 文件的设置存储
#[derive(Debug, Clone)]
pub struct JsonFileSettingsStore {
    path: PathBuf,
}

impl JsonFileSettingsStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SettingsStore for JsonFileSettingsStore {
    fn load(&self) -> TranslationResult<TranslationSettings> {
        if !self.path.exists() {
            tracing::debug!("设置文件不存在，使用默认设置: {}", self.path.display());
            return Ok(TranslationSettings::default());
        }

        let content = fs::read_to_string(&self.path)
            .map_err(|e| settings_error(e).with_context(self.path.display()))?;
        serde_json::from_str(&content)
            .map_err(|e| settings_error(format!("解析设置失败: {}", e)).with_context(self.path.display()))
    }

    fn save(&self, settings: &TranslationSettings) -> TranslationResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let content = serde_json::to_string_pretty(settings)?;
        fs::write(&self.path, content)
            .map_err(|e| settings_error(e).with_context(self.path.display()))?;
        tracing::debug!("设置已保存: {}", self.path.display());
        Ok(())
    }
}

/// 内存设置存储
#[derive(Debug, Default)]
pub struct MemorySettingsStore {
    settings: Mutex<TranslationSettings>,
}

impl MemorySettingsStore {
    pub fn new(settings: TranslationSettings) -> Self {
        Self {
            settings: Mutex::new(settings),
        }
    }
}

impl SettingsStore for MemorySettingsStore {
    fn load(&self) -> TranslationResult<TranslationSettings> {
        self.settings
            .lock()
            .map(|settings| settings.clone())
            .map_err(|_| settings_error("设置存储锁已损坏"))
    }

    fn save(&self, settings: &TranslationSettings) -> TranslationResult<()> {
        let mut guard = self
            .settings
            .lock()
            .map_err(|_| settings_error("设置存储锁已损坏"))?;
        *guard = settings.clone();
        Ok(())
    }
}
