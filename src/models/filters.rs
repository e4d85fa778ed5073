//! 过滤配置文档（桌面配置界面维护的 user_filters.json）

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use tracing::warn;

use crate::error::{AppError, AppResult};

/// 过滤配置
///
/// 核心只消费三组过滤词；timeFilter / easyApplyOnly 等界面字段
/// 原样透传，并用于拼搜索 URL 的查询参数。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterConfig {
    /// 包含词：非空时标题必须整词命中其一
    #[serde(rename = "titleFilterWords", default)]
    pub title_filter_words: Vec<String>,
    /// 排除词：整词命中即跳过
    #[serde(rename = "titleSkipWords", default)]
    pub title_skip_words: Vec<String>,
    /// 坏词：详情描述整词命中即跳过
    #[serde(rename = "badWords", default)]
    pub bad_words: Vec<String>,
    /// 透传：时间范围代码（r86400 / r604800 / r2592000 / any）
    #[serde(rename = "timeFilter", default, skip_serializing_if = "Option::is_none")]
    pub time_filter: Option<String>,
    /// 透传：仅限快速申请
    #[serde(rename = "easyApplyOnly", default, skip_serializing_if = "Option::is_none")]
    pub easy_apply_only: Option<bool>,
    /// 其余界面字段原样保留
    #[serde(flatten)]
    pub extra: Map<String, JsonValue>,
}

impl FilterConfig {
    /// 从注入路径加载；文件缺失按空配置处理
    pub fn load(path: &str) -> AppResult<Self> {
        if !std::path::Path::new(path).exists() {
            warn!("⚠️ 过滤配置不存在，按空配置启动: {}", path);
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::file_read_failed(path, e))?;
        serde_json::from_str(&content).map_err(|e| AppError::json_parse_failed(path, e))
    }

    /// 在搜索基础 URL 上追加透传字段对应的查询参数
    pub fn search_url(&self, base: &str) -> String {
        let mut params = Vec::new();
        if let Some(code) = self.time_filter.as_deref() {
            if matches!(code, "r86400" | "r604800" | "r2592000") {
                params.push(format!("f_TPR={}", code));
            }
        }
        if self.easy_apply_only == Some(true) {
            params.push("f_AL=true".to_string());
        }
        if params.is_empty() {
            return base.to_string();
        }
        if base.ends_with('?') || base.ends_with('&') {
            format!("{}{}", base, params.join("&"))
        } else if base.contains('?') {
            format!("{}&{}", base, params.join("&"))
        } else {
            format!("{}?{}", base, params.join("&"))
        }
    }
}
