//! 职位过滤 - 业务能力层
//!
//! 纯谓词：整词、大小写不敏感。子串匹配是旧版行为（会把
//! "seniority" 误判成 "senior"），已废弃，不再保留。

use std::fmt;

use regex::Regex;
use tracing::debug;

use crate::models::filters::FilterConfig;

/// 跳过原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// 标题未命中任何包含词
    NoIncludeMatch,
    /// 标题命中排除词
    ExcludeMatch(String),
    /// 描述命中坏词
    BadWord(String),
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::NoIncludeMatch => write!(f, "标题未命中包含词"),
            SkipReason::ExcludeMatch(word) => write!(f, "标题命中排除词: {}", word),
            SkipReason::BadWord(word) => write!(f, "描述命中坏词: {}", word),
        }
    }
}

/// 职位过滤器
pub struct JobFilter {
    include: Vec<(String, Regex)>,
    exclude: Vec<(String, Regex)>,
    bad: Vec<(String, Regex)>,
}

impl JobFilter {
    pub fn new(config: &FilterConfig) -> Self {
        Self {
            include: word_patterns(&config.title_filter_words),
            exclude: word_patterns(&config.title_skip_words),
            bad: word_patterns(&config.bad_words),
        }
    }

    /// 标题过滤
    ///
    /// 包含词先判；包含词通过后再判排除词，两者都命中时排除优先。
    pub fn should_skip_by_title(&self, title: &str) -> Option<SkipReason> {
        if !self.include.is_empty() && !self.include.iter().any(|(_, re)| re.is_match(title)) {
            return Some(SkipReason::NoIncludeMatch);
        }
        if let Some((word, _)) = self.exclude.iter().find(|(_, re)| re.is_match(title)) {
            return Some(SkipReason::ExcludeMatch(word.clone()));
        }
        None
    }

    /// 描述过滤：任一坏词整词命中即跳过
    pub fn should_skip_by_description(&self, text: &str) -> Option<SkipReason> {
        self.bad
            .iter()
            .find(|(_, re)| re.is_match(text))
            .map(|(word, _)| SkipReason::BadWord(word.clone()))
    }

    /// 启动日志用的过滤词摘要（每组最多展示 5 个）
    pub fn summary(&self) -> String {
        format!(
            "包含={} 排除={} 坏词={}",
            elide(&self.include),
            elide(&self.exclude),
            elide(&self.bad)
        )
    }
}

fn elide(words: &[(String, Regex)]) -> String {
    let shown: Vec<&str> = words.iter().take(5).map(|(w, _)| w.as_str()).collect();
    if words.len() > 5 {
        format!("{:?}...", shown)
    } else {
        format!("{:?}", shown)
    }
}

/// 把词表编译成整词、大小写不敏感的正则
fn word_patterns(words: &[String]) -> Vec<(String, Regex)> {
    words
        .iter()
        .filter_map(|raw| {
            let word = raw.trim().to_lowercase();
            if word.is_empty() {
                return None;
            }
            match Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&word))) {
                Ok(re) => Some((word, re)),
                Err(e) => {
                    debug!("过滤词编译失败 '{}': {}", word, e);
                    None
                }
            }
        })
        .collect()
}
