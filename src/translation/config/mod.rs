//! 翻译配置管理模块
//!
//! 提供简化的配置管理，支持环境变量、配置文件和默认值

pub mod manager;

// 重新导出主要类型
pub use manager::{ConfigManager, TranslationConfig};

/// 配置常量
pub mod constants {
    // 默认翻译端点
    pub const DEFAULT_API_URL: &str = "https://translate.googleapis.com/translate_a/single";
    pub const DEFAULT_CLIENT: &str = "gtx";
    pub const DEFAULT_OUTPUT_FORMAT: &str = "t";

    // 长文本按此字符数切分后并发翻译
    pub const MAX_CHUNK_CHARS: usize = 5000;

    // 首次请求之外的重试次数，延迟为 attempt × RETRY_DELAY_MS
    pub const MAX_RETRIES: usize = 2;
    pub const RETRY_DELAY_MS: u64 = 1000;

    // 默认语言
    pub const DEFAULT_SOURCE_LANG: &str = "auto";
    pub const DEFAULT_TARGET_LANG: &str = "zh";
    pub const DEFAULT_SERVICE: &str = "google";

    // 设置存储
    pub const DEFAULT_SETTINGS_PATH: &str = "~/.config/page-translate/settings.json";

    // 不翻译标记
    pub const NO_TRANSLATE_CLASS: &str = "notranslate";
    pub const SKIP_ELEMENTS: &[&str] = &["script", "style"];

    // 配置文件搜索路径
    pub const CONFIG_PATHS: &[&str] = &[
        "page-translate.toml",
        ".page-translate.toml",
        "~/.config/page-translate/config.toml",
        "/etc/page-translate/config.toml",
    ];
}

/// 便利函数
pub fn config_file_exists() -> bool {
    constants::CONFIG_PATHS
        .iter()
        .any(|path| std::path::Path::new(shellexpand::tilde(path).as_ref()).exists())
}

/// 加载配置，失败时回退到默认值
pub fn load_translation_config() -> TranslationConfig {
    match ConfigManager::new() {
        Ok(manager) => manager.into_config(),
        Err(e) => {
            tracing::warn!("配置加载失败，使用默认配置: {}", e);
            TranslationConfig::default()
        }
    }
}
