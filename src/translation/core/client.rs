//! 翻译客户端
//!
//! 对公共翻译端点的一次调用做了两层包装：
//!
//! - 超过 `max_chunk_chars` 的文本按字符切分，各块并发翻译，按块顺序拼接
//! - 每块独立重试，最多 `max_retries` 次，第 n 次重试前等待 `n × retry_delay_ms`
//!
//! 重试有两条路径：HTTP 状态码 ≥ 500 时显式重试；其余失败（4xx、网络异常、
//! 响应解析失败）经由异常路径同样重试。两条路径的次数和延迟一致，只在日志上区分。
//! 重试耗尽后统一返回 [`TranslationError::ServiceUnavailable`]。

use std::time::Duration;

use async_trait::async_trait;
use futures::future::try_join_all;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use tokio::time::sleep;

use crate::translation::config::TranslationConfig;
use crate::translation::error::{TranslationError, TranslationResult};

/// `encodeURIComponent` 保留的字符之外全部编码
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// 文本翻译接口
#[async_trait]
pub trait Translator: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> TranslationResult<String>;
}

/// 第 `attempt` 次重试前的等待时间
pub fn retry_delay(attempt: usize, unit: Duration) -> Duration {
    unit * attempt as u32
}

/// 按 Unicode 标量值切分文本，块内顺序与原文一致
pub fn split_chunks(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(max_chars)
        .map(|chunk| chunk.iter().collect())
        .collect()
}

/// 编码查询参数
pub fn encode_component(value: &str) -> String {
    utf8_percent_encode(value, COMPONENT).to_string()
}

/// 提取响应中的译文，即 `data[0][0][0]`
pub fn extract_translation(data: &serde_json::Value) -> TranslationResult<String> {
    data.get(0)
        .and_then(|sentences| sentences.get(0))
        .and_then(|sentence| sentence.get(0))
        .and_then(|text| text.as_str())
        .map(|text| text.to_string())
        .ok_or_else(|| {
            let preview: String = data.to_string().chars().take(120).collect();
            TranslationError::InvalidResponse(preview)
        })
}

/// 基于 Google gtx 端点的翻译客户端
#[derive(Debug, Clone)]
pub struct GoogleTranslateClient {
    http: reqwest::Client,
    config: TranslationConfig,
}

impl GoogleTranslateClient {
    pub fn new(config: TranslationConfig) -> TranslationResult<Self> {
        config.validate()?;

        let mut builder = reqwest::Client::builder();
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }
        let http = builder
            .build()
            .map_err(|e| TranslationError::ConfigError(format!("创建HTTP客户端失败: {}", e)))?;

        Ok(Self { http, config })
    }

    pub fn config(&self) -> &TranslationConfig {
        &self.config
    }

    /// 构造单次请求的地址
    pub fn request_url(&self, text: &str, source_lang: &str, target_lang: &str) -> String {
        let separator = if self.config.api_url.contains('?') { '&' } else { '?' };
        format!(
            "{}{}client={}&sl={}&tl={}&dt={}&q={}",
            self.config.api_url,
            separator,
            encode_component(&self.config.client),
            encode_component(source_lang),
            encode_component(target_lang),
            encode_component(&self.config.output_format),
            encode_component(text)
        )
    }

    async fn request_once(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> TranslationResult<String> {
        let url = self.request_url(text, source_lang, target_lang);
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(TranslationError::HttpStatus(status.as_u16()));
        }

        let body = response.text().await?;
        let data: serde_json::Value = serde_json::from_str(&body)
            .map_err(|e| TranslationError::Transport(format!("响应不是有效的JSON: {}", e)))?;
        extract_translation(&data)
    }

    /// 单块翻译，带重试
    async fn translate_chunk(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> TranslationResult<String> {
        let max_retries = self.config.max_retries;
        let unit = self.config.retry_delay();

        let mut attempt = 0;
        loop {
            let error = match self.request_once(text, source_lang, target_lang).await {
                Ok(translation) => return Ok(translation),
                Err(error) => error,
            };

            if !error.is_retryable() {
                return Err(error);
            }

            if attempt >= max_retries {
                tracing::error!("翻译失败，已尝试 {} 次: {}", attempt + 1, error);
                return Err(TranslationError::ServiceUnavailable);
            }

            attempt += 1;
            let delay = retry_delay(attempt, unit);
            match error {
                TranslationError::HttpStatus(status) if status >= 500 => {
                    tracing::warn!(
                        "服务端错误 {}，{}ms后重试 ({}/{})",
                        status,
                        delay.as_millis(),
                        attempt,
                        max_retries
                    );
                }
                error => {
                    tracing::warn!(
                        "翻译请求异常，{}ms后重试 ({}/{}): {}",
                        delay.as_millis(),
                        attempt,
                        max_retries,
                        error
                    );
                }
            }
            sleep(delay).await;
        }
    }
}

#[async_trait]
impl Translator for GoogleTranslateClient {
    async fn translate(
        &self,
        text: &str,
        source_lang: &str,
        target_lang: &str,
    ) -> TranslationResult<String> {
        if text.is_empty() {
            return Ok(String::new());
        }

        if text.chars().count() <= self.config.max_chunk_chars {
            return self.translate_chunk(text, source_lang, target_lang).await;
        }

        let chunks = split_chunks(text, self.config.max_chunk_chars);
        tracing::debug!("长文本切分为 {} 块并发翻译", chunks.len());

        let translations = try_join_all(
            chunks
                .iter()
                .map(|chunk| self.translate_chunk(chunk, source_lang, target_lang)),
        )
        .await?;

        Ok(translations.concat())
    }
}
