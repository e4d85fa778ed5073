//! 表单字段描述

use std::fmt;

/// 表单字段类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    TextArea,
    Checkbox,
    RadioGroup,
    Dropdown,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::TextArea => "textarea",
            FieldKind::Checkbox => "checkbox",
            FieldKind::RadioGroup => "radio-group",
            FieldKind::Dropdown => "dropdown",
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 一步表单内的字段描述（知识库存取的键来源）
///
/// 生命周期只有一步表单那么长，不做任何持久化。
#[derive(Debug, Clone)]
pub struct FieldDescriptor {
    pub kind: FieldKind,
    /// 解析出的稳定标签，永不为空
    pub label: String,
    /// 参与解析的候选标识（调试日志用）
    pub identifiers: Vec<String>,
}

impl FieldDescriptor {
    /// 按优先级从候选标识解析标签
    ///
    /// 候选依序为 (来源, 取值)；第一个非空裁剪值当选。全部落空时
    /// 合成 "{kind}-{序号}" 兜底，保证知识库的键永不为空。
    pub fn resolve(
        kind: FieldKind,
        candidates: Vec<(&'static str, Option<String>)>,
        ordinal: usize,
    ) -> Self {
        let mut identifiers = Vec::new();
        let mut label: Option<String> = None;
        for (source, value) in candidates {
            if let Some(value) = value {
                let trimmed = value.trim().to_string();
                if !trimmed.is_empty() {
                    identifiers.push(format!("{}={}", source, trimmed));
                    if label.is_none() {
                        label = Some(trimmed);
                    }
                }
            }
        }
        let label = label.unwrap_or_else(|| format!("{}-{}", kind.as_str(), ordinal + 1));
        Self {
            kind,
            label,
            identifiers,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_resolution_follows_priority_order() {
        let descriptor = FieldDescriptor::resolve(
            FieldKind::Text,
            vec![
                ("name", None),
                ("aria-label", Some("Years of experience".to_string())),
                ("placeholder", Some("e.g. 5".to_string())),
            ],
            0,
        );
        assert_eq!(descriptor.label, "Years of experience");
        assert_eq!(descriptor.identifiers.len(), 2);
    }

    #[test]
    fn empty_candidates_synthesize_a_label() {
        let descriptor = FieldDescriptor::resolve(
            FieldKind::Dropdown,
            vec![("name", None), ("aria-label", Some("   ".to_string()))],
            2,
        );
        assert_eq!(descriptor.label, "dropdown-3");
        assert!(!descriptor.label.is_empty());
    }
}
