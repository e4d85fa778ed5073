//! 表单字段对账 - 流程层
//!
//! 把当前步骤表单里的每个字段与知识库对账：
//! 复选框一律勾上（固定策略）；文本字段回填记忆值或记录首见值；
//! 单选组 / 下拉框按记忆默认值纠正选择并刷新存储。
//! 每次知识库变更立即整体落盘。

use tracing::{debug, info, warn};

use crate::dom::{DomElement, Query};
use crate::error::AppResult;
use crate::models::field::{FieldDescriptor, FieldKind};
use crate::models::autofill::ChoiceOption;
use crate::services::autofill_kb::{AutofillKb, ChoiceKind, ChoiceObservation};
use crate::workflow::job_ctx::JobCtx;

const RADIO_FIELDSET: &str =
    "fieldset[data-test-form-builder-radio-button-form-component=\"true\"]";

/// 对账整个表单
pub async fn reconcile_form<E: DomElement>(
    form: &E,
    kb: &mut AutofillKb,
    ctx: &JobCtx,
) -> AppResult<()> {
    reconcile_inputs(form, kb, ctx).await?;
    reconcile_radio_groups(form, kb, ctx).await?;
    reconcile_dropdowns(form, kb, ctx).await?;
    Ok(())
}

/// 文本框 / 多行文本 / 复选框
async fn reconcile_inputs<E: DomElement>(
    form: &E,
    kb: &mut AutofillKb,
    ctx: &JobCtx,
) -> AppResult<()> {
    let fields = form.query(&Query::css("input, textarea")).await?;
    for (ordinal, field) in fields.iter().enumerate() {
        let tag = field.tag().await?;
        let input_type = field.attr("type").await?.unwrap_or_default();

        // 复选框：固定策略，一律勾上
        if tag == "input" && input_type == "checkbox" {
            if !field.is_selected().await? && field.click().await.is_err() {
                debug!("{} 复选框点击失败，忽略", ctx);
            }
            continue;
        }

        let is_text = tag == "input" && matches!(input_type.as_str(), "text" | "email" | "tel" | "");
        let is_textarea = tag == "textarea";
        if !is_text && !is_textarea {
            continue;
        }

        let kind = if is_textarea {
            FieldKind::TextArea
        } else {
            FieldKind::Text
        };
        let descriptor = describe_field(form, field, kind, ordinal).await?;
        let current = field.attr("value").await?.unwrap_or_default();

        match kb.text_value(&descriptor.label).map(str::to_string) {
            Some(remembered) if remembered != current => {
                field.clear().await?;
                field.send_keys(&remembered).await?;
                info!("{} 回填文本字段 '{}' = '{}'", ctx, descriptor.label, remembered);
            }
            Some(_) => {
                debug!("{} 文本字段 '{}' 已是记忆值", ctx, descriptor.label);
            }
            None => {
                // 首见字段只记录观察值，不做猜测
                if kb.record_text(&descriptor.label, &current) {
                    info!("{} 记录新文本字段 '{}' = '{}'", ctx, descriptor.label, current);
                    kb.save()?;
                }
            }
        }
    }
    Ok(())
}

/// 单选组
async fn reconcile_radio_groups<E: DomElement>(
    form: &E,
    kb: &mut AutofillKb,
    ctx: &JobCtx,
) -> AppResult<()> {
    let fieldsets = form.query(&Query::css(RADIO_FIELDSET)).await?;
    for (ordinal, fieldset) in fieldsets.iter().enumerate() {
        let descriptor = FieldDescriptor::resolve(
            FieldKind::RadioGroup,
            vec![("legend", radio_group_label(fieldset).await?)],
            ordinal,
        );

        let radios = fieldset.query(&Query::css("input[type=\"radio\"]")).await?;
        let mut options = Vec::new();
        let mut selected = None;
        for radio in &radios {
            let value = radio.attr("value").await?.unwrap_or_default();
            let text = radio_label(fieldset, radio).await?;
            let is_selected = radio.is_selected().await?;
            if is_selected && selected.is_none() {
                selected = Some(value.clone());
            }
            options.push(ChoiceOption {
                value,
                text,
                selected: is_selected,
            });
        }

        let observation = ChoiceObservation {
            label: descriptor.label.clone(),
            options,
            selected,
        };
        let outcome = kb.merge_choice(ChoiceKind::Radio, &observation);

        if let Some(target) = &outcome.apply_value {
            let mut applied = false;
            for radio in &radios {
                if radio.attr("value").await?.as_deref() == Some(target.as_str()) {
                    if radio.click().await.is_ok() {
                        info!("{} 单选组 '{}' 切回记忆值: {}", ctx, descriptor.label, target);
                        applied = true;
                    }
                    break;
                }
            }
            if !applied {
                warn!(
                    "{} 单选组 '{}' 没有找到记忆值 {} 对应的选项",
                    ctx, descriptor.label, target
                );
            }
        }

        if outcome.changed {
            kb.save()?;
        }
    }
    Ok(())
}

/// 下拉框
async fn reconcile_dropdowns<E: DomElement>(
    form: &E,
    kb: &mut AutofillKb,
    ctx: &JobCtx,
) -> AppResult<()> {
    let selects = form.query(&Query::css("select")).await?;
    for (ordinal, select) in selects.iter().enumerate() {
        let descriptor = describe_field(form, select, FieldKind::Dropdown, ordinal).await?;

        let option_els = select.query(&Query::css("option")).await?;
        let mut options = Vec::new();
        let mut selected = None;
        for option in &option_els {
            let value = option_value(option).await?;
            let text = option.text().await?.trim().to_string();
            let is_selected = option.is_selected().await?;
            if is_selected && selected.is_none() {
                selected = Some(value.clone());
            }
            options.push(ChoiceOption {
                value,
                text,
                selected: is_selected,
            });
        }
        if selected.is_none() {
            selected = options.first().map(|o| o.value.clone());
        }

        let observation = ChoiceObservation {
            label: descriptor.label.clone(),
            options,
            selected,
        };
        let outcome = kb.merge_choice(ChoiceKind::Dropdown, &observation);

        if let Some(target) = &outcome.apply_value {
            let mut applied = false;
            for option in &option_els {
                if option_value(option).await? == *target {
                    if option.click().await.is_ok() {
                        info!("{} 下拉框 '{}' 切回记忆值: {}", ctx, descriptor.label, target);
                        applied = true;
                    }
                    break;
                }
            }
            if !applied {
                warn!(
                    "{} 下拉框 '{}' 没有找到记忆值 {} 对应的选项",
                    ctx, descriptor.label, target
                );
            }
        }

        if outcome.changed {
            kb.save()?;
        }
    }
    Ok(())
}

/// option 的 value：没有 value 属性时退回其文本
async fn option_value<E: DomElement>(option: &E) -> AppResult<String> {
    match option.attr("value").await? {
        Some(value) => Ok(value),
        None => Ok(option.text().await?.trim().to_string()),
    }
}

/// 标签解析：name → aria-label → label[for] 文本 → placeholder → 合成兜底
async fn describe_field<E: DomElement>(
    form: &E,
    field: &E,
    kind: FieldKind,
    ordinal: usize,
) -> AppResult<FieldDescriptor> {
    let name = field.attr("name").await?;
    let aria = field.attr("aria-label").await?;
    let label_for = match field.attr("id").await? {
        Some(id) => associated_label_text(form, &id).await?,
        None => None,
    };
    let placeholder = field.attr("placeholder").await?;
    Ok(FieldDescriptor::resolve(
        kind,
        vec![
            ("name", name),
            ("aria-label", aria),
            ("label", label_for),
            ("placeholder", placeholder),
        ],
        ordinal,
    ))
}

/// label[for=id] 的文本，优先取 span[aria-hidden]（界面把可见文案放那里）
async fn associated_label_text<E: DomElement>(form: &E, id: &str) -> AppResult<Option<String>> {
    let Some(label) = form
        .query(&Query::css(format!("label[for=\"{}\"]", id)))
        .await?
        .into_iter()
        .next()
    else {
        return Ok(None);
    };
    if let Some(span) = label
        .query(&Query::css("span[aria-hidden=\"true\"]"))
        .await?
        .into_iter()
        .next()
    {
        let text = span.text().await?.trim().to_string();
        if !text.is_empty() {
            return Ok(Some(text));
        }
    }
    let text = label.text().await?.trim().to_string();
    Ok(if text.is_empty() { None } else { Some(text) })
}

/// 单选组的组标签（legend，优先 span[aria-hidden]）
async fn radio_group_label<E: DomElement>(fieldset: &E) -> AppResult<Option<String>> {
    let Some(legend) = fieldset
        .query(&Query::css("legend"))
        .await?
        .into_iter()
        .next()
    else {
        return Ok(None);
    };
    if let Some(span) = legend
        .query(&Query::css("span[aria-hidden=\"true\"]"))
        .await?
        .into_iter()
        .next()
    {
        let text = span.text().await?.trim().to_string();
        if !text.is_empty() {
            return Ok(Some(text));
        }
    }
    let text = legend.text().await?.trim().to_string();
    Ok(if text.is_empty() { None } else { Some(text) })
}

/// 单个单选项的文本标签，落空时退回 value
async fn radio_label<E: DomElement>(fieldset: &E, radio: &E) -> AppResult<String> {
    if let Some(id) = radio.attr("id").await? {
        if let Some(label) = fieldset
            .query(&Query::css(format!("label[for=\"{}\"]", id)))
            .await?
            .into_iter()
            .next()
        {
            let text = label.text().await?.trim().to_string();
            if !text.is_empty() {
                return Ok(text);
            }
        }
    }
    Ok(radio.attr("value").await?.unwrap_or_default())
}
