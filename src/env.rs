//! 统一的环境变量管理系统
//!
//! 提供类型安全、可验证的环境变量访问，所有变量均以 `PAGE_TRANSLATE_` 为前缀
//! （`NO_COLOR` 遵循通用约定除外）。

use std::env;
use std::fmt;
use std::time::Duration;

/// 环境变量解析错误
#[derive(Debug, Clone)]
pub struct EnvError {
    pub variable: String,
    pub message: String,
}

impl fmt::Display for EnvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Environment variable '{}': {}", self.variable, self.message)
    }
}

impl std::error::Error for EnvError {}

pub type EnvResult<T> = Result<T, EnvError>;

/// 环境变量访问器特性
pub trait EnvVar<T> {
    const NAME: &'static str;
    const DEFAULT: Option<T>;
    const DESCRIPTION: &'static str;

    fn parse(value: &str) -> EnvResult<T>;

    fn get() -> EnvResult<T> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value),
            Err(_) => {
                if let Some(default) = Self::DEFAULT {
                    Ok(default)
                } else {
                    Err(EnvError {
                        variable: Self::NAME.to_string(),
                        message: "Required environment variable not set".to_string(),
                    })
                }
            }
        }
    }

    /// 仅在变量被显式设置时返回值，未设置时返回 `None`
    fn get_explicit() -> EnvResult<Option<T>> {
        match env::var(Self::NAME) {
            Ok(value) => Self::parse(&value).map(Some),
            Err(_) => Ok(None),
        }
    }

    fn get_or_default(default: T) -> T {
        Self::get().unwrap_or(default)
    }
}

/// 核心环境变量定义
pub mod core {
    use super::*;

    /// 日志级别
    pub struct LogLevel;
    impl EnvVar<String> for LogLevel {
        const NAME: &'static str = "PAGE_TRANSLATE_LOG_LEVEL";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("info".to_string()),
            }
        }
        const DESCRIPTION: &'static str = "Log level: trace, debug, info, warn, error";

        fn parse(value: &str) -> EnvResult<String> {
            match value.to_lowercase().as_str() {
                "trace" | "debug" | "info" | "warn" | "error" => Ok(value.to_lowercase()),
                _ => Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: format!(
                        "Invalid log level '{}'. Use: trace, debug, info, warn, error",
                        value
                    ),
                }),
            }
        }
    }

    /// 禁用颜色输出
    pub struct NoColor;
    impl EnvVar<bool> for NoColor {
        const NAME: &'static str = "NO_COLOR";
        const DEFAULT: Option<bool> = Some(false);
        const DESCRIPTION: &'static str = "Disable colored output when set to any value";

        fn parse(value: &str) -> EnvResult<bool> {
            // NO_COLOR 遵循标准：任何值都表示禁用颜色
            Ok(!value.is_empty())
        }
    }
}

/// 翻译相关环境变量
pub mod translation {
    use super::*;

    /// 源语言
    pub struct SourceLang;
    impl EnvVar<String> for SourceLang {
        const NAME: &'static str = "PAGE_TRANSLATE_SOURCE_LANG";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("auto".to_string()),
            }
        }
        const DESCRIPTION: &'static str = "Source language for translation ('auto' for detection)";

        fn parse(value: &str) -> EnvResult<String> {
            parse_language(value, Self::NAME, true)
        }
    }

    /// 目标语言
    pub struct TargetLang;
    impl EnvVar<String> for TargetLang {
        const NAME: &'static str = "PAGE_TRANSLATE_TARGET_LANG";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("zh".to_string()),
            }
        }
        const DESCRIPTION: &'static str = "Target language for translation (ISO code, e.g. zh, en, zh-TW)";

        fn parse(value: &str) -> EnvResult<String> {
            parse_language(value, Self::NAME, false)
        }
    }

    /// 翻译端点地址
    pub struct ApiUrl;
    impl EnvVar<String> for ApiUrl {
        const NAME: &'static str = "PAGE_TRANSLATE_API_URL";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("https://translate.googleapis.com/translate_a/single".to_string()),
            }
        }
        const DESCRIPTION: &'static str = "Translation endpoint URL";

        fn parse(value: &str) -> EnvResult<String> {
            let url = value.trim();
            if url.starts_with("http://") || url.starts_with("https://") {
                Ok(url.to_string())
            } else {
                Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "API URL must start with http:// or https://".to_string(),
                })
            }
        }
    }

    /// 单次请求的最大字符数
    pub struct ChunkSize;
    impl EnvVar<usize> for ChunkSize {
        const NAME: &'static str = "PAGE_TRANSLATE_CHUNK_SIZE";
        const DEFAULT: Option<usize> = Some(5000);
        const DESCRIPTION: &'static str = "Maximum characters sent in one translation request";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 1, 50000)
        }
    }

    /// 最大重试次数（不含首次请求）
    pub struct MaxRetries;
    impl EnvVar<usize> for MaxRetries {
        const NAME: &'static str = "PAGE_TRANSLATE_MAX_RETRIES";
        const DEFAULT: Option<usize> = Some(2);
        const DESCRIPTION: &'static str = "Additional attempts after a failed translation request";

        fn parse(value: &str) -> EnvResult<usize> {
            parse_positive_usize(value, Self::NAME, 0, 10)
        }
    }

    /// 重试的基础延迟
    pub struct RetryDelay;
    impl EnvVar<Duration> for RetryDelay {
        const NAME: &'static str = "PAGE_TRANSLATE_RETRY_DELAY_MS";
        const DEFAULT: Option<Duration> = Some(Duration::from_millis(1000));
        const DESCRIPTION: &'static str = "Retry delay unit in milliseconds (delay = attempt x unit)";

        fn parse(value: &str) -> EnvResult<Duration> {
            let millis: u64 = value.parse().map_err(|_| EnvError {
                variable: Self::NAME.to_string(),
                message: "Must be a valid number of milliseconds".to_string(),
            })?;

            if millis > 60_000 {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Delay too long (max 60000 ms)".to_string(),
                });
            }

            Ok(Duration::from_millis(millis))
        }
    }

    /// 设置文件路径
    pub struct SettingsPath;
    impl EnvVar<String> for SettingsPath {
        const NAME: &'static str = "PAGE_TRANSLATE_SETTINGS_PATH";
        const DEFAULT: Option<String> = None;

        fn get() -> EnvResult<String> {
            match env::var(Self::NAME) {
                Ok(value) => Self::parse(&value),
                Err(_) => Ok("~/.config/page-translate/settings.json".to_string()),
            }
        }
        const DESCRIPTION: &'static str = "Path of the persisted settings store (JSON)";

        fn parse(value: &str) -> EnvResult<String> {
            let path = value.trim();
            if path.is_empty() {
                return Err(EnvError {
                    variable: Self::NAME.to_string(),
                    message: "Path must not be empty".to_string(),
                });
            }
            Ok(path.to_string())
        }
    }
}

/// 辅助函数
fn parse_language(value: &str, var_name: &str, allow_auto: bool) -> EnvResult<String> {
    let lang = value.trim();
    if allow_auto && lang.eq_ignore_ascii_case("auto") {
        return Ok("auto".to_string());
    }

    let (primary, region) = match lang.split_once('-') {
        Some((primary, region)) => (primary, Some(region)),
        None => (lang, None),
    };

    let primary_ok = (2..=3).contains(&primary.len()) && primary.chars().all(|c| c.is_ascii_alphabetic());
    let region_ok = region.map_or(true, |r| {
        (2..=4).contains(&r.len()) && r.chars().all(|c| c.is_ascii_alphanumeric())
    });

    if primary_ok && region_ok {
        Ok(lang.to_string())
    } else {
        Err(EnvError {
            variable: var_name.to_string(),
            message: if allow_auto {
                format!("Invalid language '{}'. Use 'auto' or an ISO code", value)
            } else {
                format!("Invalid language '{}'. Use an ISO code", value)
            },
        })
    }
}

fn parse_positive_usize(value: &str, var_name: &str, min: usize, max: usize) -> EnvResult<usize> {
    let num: usize = value.parse().map_err(|_| EnvError {
        variable: var_name.to_string(),
        message: "Must be a valid positive number".to_string(),
    })?;

    if num < min {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} is below minimum {}", num, min),
        });
    }

    if num > max {
        return Err(EnvError {
            variable: var_name.to_string(),
            message: format!("Value {} exceeds maximum {}", num, max),
        });
    }

    Ok(num)
}

/// 环境变量配置汇总
#[derive(Debug, Clone)]
pub struct EnvConfig {
    pub log_level: String,
    pub no_color: bool,

    pub source_lang: String,
    pub target_lang: String,
    pub api_url: String,
    pub chunk_size: usize,
    pub max_retries: usize,
    pub retry_delay: Duration,
    pub settings_path: String,
}

impl EnvConfig {
    /// 从环境变量加载配置
    pub fn from_env() -> EnvResult<Self> {
        Ok(Self {
            log_level: core::LogLevel::get()?,
            no_color: core::NoColor::get()?,

            source_lang: translation::SourceLang::get()?,
            target_lang: translation::TargetLang::get()?,
            api_url: translation::ApiUrl::get()?,
            chunk_size: translation::ChunkSize::get()?,
            max_retries: translation::MaxRetries::get()?,
            retry_delay: translation::RetryDelay::get()?,
            settings_path: translation::SettingsPath::get()?,
        })
    }

    /// 当前生效配置的摘要
    pub fn summary(&self) -> String {
        format!(
            "Environment Configuration Summary:\n  \
             Log Level: {}\n  \
             Languages: {} -> {}\n  \
             Endpoint: {}\n  \
             Chunk Size: {}\n  \
             Retries: {} (unit {} ms)\n  \
             Settings: {}",
            self.log_level,
            self.source_lang,
            self.target_lang,
            self.api_url,
            self.chunk_size,
            self.max_retries,
            self.retry_delay.as_millis(),
            self.settings_path
        )
    }
}

/// 环境变量文档生成器
pub fn generate_env_docs() -> String {
    let mut docs = String::new();
    docs.push_str("# Environment Variables Documentation\n\n");

    docs.push_str("## Core Configuration\n\n");
    docs.push_str(&format!(
        "- `{}`: {} (default: \"info\")\n",
        core::LogLevel::NAME,
        core::LogLevel::DESCRIPTION
    ));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        core::NoColor::NAME,
        core::NoColor::DESCRIPTION,
        core::NoColor::DEFAULT
    ));

    docs.push_str("\n## Translation Configuration\n\n");
    docs.push_str(&format!(
        "- `{}`: {} (default: \"auto\")\n",
        translation::SourceLang::NAME,
        translation::SourceLang::DESCRIPTION
    ));
    docs.push_str(&format!(
        "- `{}`: {} (default: \"zh\")\n",
        translation::TargetLang::NAME,
        translation::TargetLang::DESCRIPTION
    ));
    docs.push_str(&format!(
        "- `{}`: {}\n",
        translation::ApiUrl::NAME,
        translation::ApiUrl::DESCRIPTION
    ));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        translation::ChunkSize::NAME,
        translation::ChunkSize::DESCRIPTION,
        translation::ChunkSize::DEFAULT
    ));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        translation::MaxRetries::NAME,
        translation::MaxRetries::DESCRIPTION,
        translation::MaxRetries::DEFAULT
    ));
    docs.push_str(&format!(
        "- `{}`: {} (default: {:?})\n",
        translation::RetryDelay::NAME,
        translation::RetryDelay::DESCRIPTION,
        translation::RetryDelay::DEFAULT
    ));
    docs.push_str(&format!(
        "- `{}`: {}\n",
        translation::SettingsPath::NAME,
        translation::SettingsPath::DESCRIPTION
    ));

    docs
}
