//! 自动填充知识库 - 业务能力层
//!
//! 显式的 load / merge / save 存储，路径注入。进程内向导是唯一
//! 写者；桌面配置界面在进程外共享同一份文档和同一套 load/save
//! 契约，从不与写者并发。

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{AppError, AppResult};
use crate::models::autofill::{
    normalize_label, AutofillDocument, ChoiceOption, ChoiceRecord, DROPDOWN_SENTINEL,
};

/// 选择类字段的种类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChoiceKind {
    Radio,
    Dropdown,
}

/// 一次现场观察到的选择类字段状态
#[derive(Debug, Clone)]
pub struct ChoiceObservation {
    pub label: String,
    pub options: Vec<ChoiceOption>,
    /// 当前选中的 value（下拉框可能停在哨兵上）
    pub selected: Option<String>,
}

/// merge 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MergeOutcome {
    /// 需要写回页面的记忆值（与当前选中不同才有）
    pub apply_value: Option<String>,
    /// 存储内容是否发生变化（变化才需要落盘）
    pub changed: bool,
}

/// 自动填充知识库
#[derive(Debug)]
pub struct AutofillKb {
    path: PathBuf,
    doc: AutofillDocument,
}

impl AutofillKb {
    /// 空库（测试与缺省启动用）
    pub fn empty(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            doc: AutofillDocument::default(),
        }
    }

    /// 从注入路径加载；文件缺失按空库处理，解析失败是硬错误
    pub fn load(path: impl Into<PathBuf>) -> AppResult<Self> {
        let path = path.into();
        if !path.exists() {
            warn!("⚠️ 自动填充文档不存在，按空库启动: {}", path.display());
            return Ok(Self {
                path,
                doc: AutofillDocument::default(),
            });
        }
        let content = std::fs::read_to_string(&path)
            .map_err(|e| AppError::file_read_failed(path.display().to_string(), e))?;
        let doc = serde_json::from_str(&content)
            .map_err(|e| AppError::json_parse_failed(path.display().to_string(), e))?;
        Ok(Self { path, doc })
    }

    /// 整个文档落盘
    ///
    /// 先写临时文件再重命名，中途崩溃不会留下半截文档。
    pub fn save(&self) -> AppResult<()> {
        let json = serde_json::to_string_pretty(&self.doc)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| AppError::file_write_failed(parent.display().to_string(), e))?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json)
            .map_err(|e| AppError::file_write_failed(tmp.display().to_string(), e))?;
        std::fs::rename(&tmp, &self.path)
            .map_err(|e| AppError::file_write_failed(self.path.display().to_string(), e))?;
        debug!("知识库已保存: {}", self.path.display());
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &AutofillDocument {
        &self.doc
    }

    /// 文本字段：按归一化标签取记忆值
    pub fn text_value(&self, label: &str) -> Option<&str> {
        let key = normalize_label(label);
        self.doc
            .text_input
            .iter()
            .find(|(stored, _)| normalize_label(stored) == key)
            .map(|(_, value)| value.as_str())
    }

    /// 记录首次见到的文本字段（已存在则不动），返回是否新增
    pub fn record_text(&mut self, label: &str, observed: &str) -> bool {
        let trimmed = label.trim();
        if trimmed.is_empty() {
            return false;
        }
        if self.text_value(trimmed).is_some() {
            return false;
        }
        self.doc
            .text_input
            .insert(trimmed.to_string(), observed.to_string());
        true
    }

    /// 选择类字段的对账合并
    ///
    /// 先用存储的默认值算出需要写回页面的值，再刷新选项列表并
    /// 递增计数。选项与默认值逐字节相同时不算变化（幂等），但
    /// 计数照常递增。已有的有效默认值代表用户偏好，不被观察值
    /// 覆盖；只有空缺（或下拉框停在哨兵）的默认值才采纳观察。
    pub fn merge_choice(&mut self, kind: ChoiceKind, obs: &ChoiceObservation) -> MergeOutcome {
        let reject_sentinel = kind == ChoiceKind::Dropdown;
        let key = normalize_label(&obs.label);

        // 观察到的有效选中值（下拉框的哨兵不算）
        let observed_selected = obs
            .selected
            .as_deref()
            .filter(|v| !v.is_empty())
            .filter(|v| !(reject_sentinel && *v == DROPDOWN_SENTINEL));

        let records = match kind {
            ChoiceKind::Radio => &mut self.doc.radio_buttons,
            ChoiceKind::Dropdown => &mut self.doc.dropdowns,
        };

        if let Some(record) = records
            .iter_mut()
            .find(|r| normalize_label(&r.label) == key)
        {
            // 写回值按 merge 前的存储默认值计算
            let apply_value = record
                .valid_default(reject_sentinel)
                .filter(|remembered| obs.selected.as_deref() != Some(*remembered))
                .map(str::to_string);

            let mut changed = false;
            if record.options != obs.options {
                record.options = obs.options.clone();
                changed = true;
            }
            if record.valid_default(reject_sentinel).is_none() {
                if let Some(selected) = observed_selected {
                    if record.default_value != selected {
                        record.default_value = selected.to_string();
                        changed = true;
                    }
                }
            }
            // 不变量：选项非空时默认值必须落在选项集合内
            if !record.options.is_empty()
                && !record.default_value.is_empty()
                && !record
                    .options
                    .iter()
                    .any(|o| o.value == record.default_value)
            {
                record.default_value = observed_selected
                    .map(str::to_string)
                    .or_else(|| first_usable_value(&record.options, reject_sentinel))
                    .unwrap_or_default();
                changed = true;
            }
            record.count += 1;
            MergeOutcome {
                apply_value,
                changed,
            }
        } else {
            // 首次见到：按观察创建，不做猜测
            let default_value = observed_selected
                .map(str::to_string)
                .or_else(|| first_usable_value(&obs.options, reject_sentinel))
                .unwrap_or_default();
            records.push(ChoiceRecord {
                label: obs.label.trim().to_string(),
                default_value,
                count: 1,
                created_at: chrono::Utc::now().timestamp_millis(),
                options: obs.options.clone(),
            });
            MergeOutcome {
                apply_value: None,
                changed: true,
            }
        }
    }
}

/// 选项列表里第一个可用的 value（跳过空值和下拉框哨兵）
fn first_usable_value(options: &[ChoiceOption], reject_sentinel: bool) -> Option<String> {
    options
        .iter()
        .map(|o| o.value.clone())
        .find(|v| !v.is_empty() && !(reject_sentinel && v == DROPDOWN_SENTINEL))
}
