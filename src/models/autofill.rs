//! 自动填充知识库的数据模型
//!
//! 三段式 JSON 文档（textInput / radioButtons / dropdowns），
//! 与桌面配置界面共享同一 schema，字段名以界面侧为准。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// 下拉框的"未选择"哨兵选项，永远不作为记忆默认值
pub const DROPDOWN_SENTINEL: &str = "Select an option";

/// 选项条目
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChoiceOption {
    pub value: String,
    pub text: String,
    pub selected: bool,
}

/// 单选组 / 下拉框的记忆记录
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChoiceRecord {
    /// 字段标签（去空格、大小写不敏感地唯一）
    #[serde(rename = "placeholderIncludes")]
    pub label: String,
    /// 记忆的默认值；选项非空时必须落在选项集合内
    #[serde(rename = "defaultValue")]
    pub default_value: String,
    /// 使用次数
    pub count: u64,
    /// 创建时间（毫秒时间戳）
    #[serde(rename = "createdAt", default)]
    pub created_at: i64,
    pub options: Vec<ChoiceOption>,
}

impl ChoiceRecord {
    /// 可用的记忆默认值
    ///
    /// 非空、（下拉框时）不是哨兵、且存在于当前选项集合内。
    pub fn valid_default(&self, reject_sentinel: bool) -> Option<&str> {
        if self.default_value.is_empty() {
            return None;
        }
        if reject_sentinel && self.default_value == DROPDOWN_SENTINEL {
            return None;
        }
        if !self.options.is_empty()
            && !self.options.iter().any(|o| o.value == self.default_value)
        {
            return None;
        }
        Some(&self.default_value)
    }
}

/// 完整的自动填充文档
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct AutofillDocument {
    /// 文本字段：标签 → 记忆值
    #[serde(rename = "textInput", default)]
    pub text_input: BTreeMap<String, String>,
    #[serde(rename = "radioButtons", default)]
    pub radio_buttons: Vec<ChoiceRecord>,
    #[serde(default)]
    pub dropdowns: Vec<ChoiceRecord>,
}

/// 标签归一化：trim + 小写，唯一性判定的统一口径
pub fn normalize_label(label: &str) -> String {
    label.trim().to_lowercase()
}
