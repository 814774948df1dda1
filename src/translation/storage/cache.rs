//! 翻译缓存模块
//!
//! 以 (源语言, 目标语言, 原文) 为键的内存缓存。没有淘汰和过期策略，
//! 生命周期与页面一致；页面侧是单线程协作模型，因此使用 `RefCell`/`Cell`
//! 而非锁。

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

// ============================================================================
// 核心类型
// ============================================================================

/// 缓存键，原文按原样参与比较，不做归一化
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub source_lang: String,
    pub target_lang: String,
    pub text: String,
}

impl CacheKey {
    pub fn new(source_lang: &str, target_lang: &str, text: &str) -> Self {
        Self {
            source_lang: source_lang.to_string(),
            target_lang: target_lang.to_string(),
            text: text.to_string(),
        }
    }
}

/// 缓存统计信息
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CacheStats {
    pub total_requests: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub total_entries: usize,
}

/// 翻译缓存
#[derive(Debug, Default)]
pub struct TranslationCache {
    entries: RefCell<HashMap<CacheKey, String>>,
    hits: Cell<u64>,
    misses: Cell<u64>,
}

// ============================================================================
// 实现
// ============================================================================

impl TranslationCache {
    /// 创建新的翻译缓存
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取缓存条目
    pub fn get(&self, key: &CacheKey) -> Option<String> {
        let found = self.entries.borrow().get(key).cloned();
        match found {
            Some(_) => self.hits.set(self.hits.get() + 1),
            None => self.misses.set(self.misses.get() + 1),
        }
        found
    }

    /// 写入缓存条目
    ///
    /// 同一键重复写入相同值在外部不可观察。
    pub fn set(&self, key: CacheKey, translated: String) {
        let mut entries = self.entries.borrow_mut();
        if entries.get(&key) != Some(&translated) {
            tracing::trace!("缓存写入: {} -> {}", key.text, translated);
            entries.insert(key, translated);
        }
    }

    /// 检查是否包含指定键（不计入统计）
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries.borrow().contains_key(key)
    }

    /// 获取缓存大小
    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    /// 获取统计信息
    pub fn get_stats(&self) -> CacheStats {
        let hits = self.hits.get();
        let misses = self.misses.get();
        CacheStats {
            total_requests: hits + misses,
            cache_hits: hits,
            cache_misses: misses,
            total_entries: self.len(),
        }
    }
}

impl CacheStats {
    /// 计算缓存命中率
    pub fn hit_rate(&self) -> f64 {
        if self.total_requests == 0 {
            0.0
        } else {
            self.cache_hits as f64 / self.total_requests as f64
        }
    }
}
