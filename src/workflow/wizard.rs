//! 申请向导 - 流程层（核心状态机）
//!
//! 状态：Idle → 入口搜索 → 步骤循环(n) → 终态。
//! 步骤循环有固定上限，无论文档怎么变都保证终止；每条失败路径
//! 返回前都做尽力而为的弹层清场，不拖累后续职位。
//!
//! 流程顺序：
//! 1. 预检：保存确认层 / 已申请标记
//! 2. 入口搜索：候选控件逐个核对可访问名称
//! 3. 步骤循环：弹层 → 表单对账 → 推进控件 → 执行动作

use std::fmt;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::{Config, Pace};
use crate::dom::{accessible_name, Dom, DomElement, Query};
use crate::error::AppResult;
use crate::services::autofill_kb::AutofillKb;
use crate::services::dialog;
use crate::services::locator::Locator;
use crate::workflow::form;
use crate::workflow::job_ctx::JobCtx;

/// 向导终态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WizardOutcome {
    /// 申请提交成功（或发现已有申请在途）
    Success,
    /// 这个职位早就申请过
    AlreadyApplied,
    /// 放弃这个职位
    Failure(FailureReason),
}

/// 失败原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureReason {
    /// 没有可用的申请入口
    NoEntryPoint,
    /// 找不到任何推进控件
    NoActionControl,
    /// 流程被页面拒绝（出现放弃确认）
    FlowRejected,
    /// 步数达到上限仍未到终态
    StepLimit,
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::NoEntryPoint => write!(f, "没有可用的申请入口"),
            FailureReason::NoActionControl => write!(f, "找不到推进控件"),
            FailureReason::FlowRejected => write!(f, "流程被页面拒绝"),
            FailureReason::StepLimit => write!(f, "步数达到上限"),
        }
    }
}

/// 一步里选定的推进动作，优先级从上到下
enum StepAction<E> {
    ContinueApplying(E),
    Submit(E),
    Review(E),
    Next(E),
}

/// 已申请的提示语
const APPLIED_INDICATORS: &[&str] = &[
    "application sent",
    "applied",
    "you applied",
    "your application was sent",
    "application submitted",
];

/// 步骤容器文本里的完成关键词
const COMPLETION_KEYWORDS: &[&str] = &["sent", "submitted", "complete", "thank you"];

/// 整页成功提示
const SUCCESS_INDICATORS: &[&str] = &[
    "application sent",
    "application submitted",
    "thank you",
    "your application has been sent",
    "successfully submitted",
];

/// 推进控件期望的完整可访问名称（小写比较）
const CONTINUE_NAMES: &[&str] = &["continue applying"];
const SUBMIT_NAMES: &[&str] = &["submit application", "submit"];
const REVIEW_NAMES: &[&str] = &["review your application", "review"];
const NEXT_NAMES: &[&str] = &["continue to next step", "next", "continue"];

/// 推进控件找不到时的滚动扫掠停靠点（顶、中、底）
const SCROLL_SWEEPS: &[f64] = &[0.0, 0.5, 1.0];

fn applied_indicator_matches(text: &str) -> bool {
    let lowered = text.to_lowercase();
    APPLIED_INDICATORS.iter().any(|k| lowered.contains(k))
}

fn completion_keyword_matches(text: &str) -> bool {
    let lowered = text.to_lowercase();
    COMPLETION_KEYWORDS.iter().any(|k| lowered.contains(k))
}

/// 申请向导
pub struct ApplicationWizard {
    locator: Locator,
    pace: Pace,
    step_limit: usize,
}

impl ApplicationWizard {
    pub fn new(config: &Config) -> Self {
        Self {
            locator: Locator::new(Duration::from_millis(config.poll_interval_ms)),
            pace: Pace::from_config(config),
            step_limit: config.step_limit,
        }
    }

    /// 自定义步数上限与节奏（测试用）
    pub fn with_tuning(step_limit: usize, pace: Pace) -> Self {
        Self {
            locator: Locator::new(pace.poll),
            pace,
            step_limit,
        }
    }

    /// 对当前打开的职位跑完整个申请流程
    pub async fn run<D: Dom>(
        &self,
        dom: &D,
        kb: &mut AutofillKb,
        ctx: &JobCtx,
    ) -> AppResult<WizardOutcome> {
        // 上一份申请可能留下保存确认层压在页面上
        if dialog::handle_save_dialog(dom, &self.pace).await? {
            info!("{} 开始前发现保存确认层，视为已有申请在途", ctx);
            return Ok(WizardOutcome::Success);
        }

        if self.already_applied(dom).await? {
            info!("{} 已经申请过，跳过", ctx);
            return Ok(WizardOutcome::AlreadyApplied);
        }

        let Some(entry) = self.find_entry_point(dom, ctx).await? else {
            warn!("{} ❌ 没有找到快速申请入口", ctx);
            return Ok(WizardOutcome::Failure(FailureReason::NoEntryPoint));
        };

        info!("{} 点击快速申请入口", ctx);
        if entry.click().await.is_err() {
            entry.js_click().await?;
        }
        sleep(self.pace.settle).await;

        self.step_loop(dom, kb, ctx).await
    }

    /// 已申请指示（详情页行内反馈条）
    async fn already_applied<D: Dom>(&self, dom: &D) -> AppResult<bool> {
        for el in dom
            .query(&Query::css(".artdeco-inline-feedback__message"))
            .await?
        {
            if applied_indicator_matches(&el.text().await?) {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// 在详情区内按候选顺序搜索入口控件，并核对可访问名称
    ///
    /// 名称里只有 "apply" 而没有 "easy apply" 的是外链申请按钮，
    /// 长得像但不是这里的入口，必须拒绝。
    async fn find_entry_point<D: Dom>(
        &self,
        dom: &D,
        ctx: &JobCtx,
    ) -> AppResult<Option<D::Element>> {
        let detail = dom
            .query(&Query::css(".scaffold-layout__detail"))
            .await?
            .into_iter()
            .next();
        let root = detail.as_ref();
        if root.is_none() {
            debug!("没有详情区，退回整页搜索入口");
        }

        for query in &entry_point_queries() {
            let Some(candidate) = self
                .locator
                .wait_until_clickable(dom, root, query, self.pace.short)
                .await?
            else {
                debug!("入口候选落空: {}", query);
                continue;
            };
            let name = accessible_name(&candidate).await?;
            let lowered = name.to_lowercase();
            if lowered.contains("easy apply") {
                info!("{} ✓ 确认快速申请入口: '{}'", ctx, name);
                return Ok(Some(candidate));
            }
            if lowered.contains("apply") {
                debug!("{} 跳过外链申请按钮: '{}'", ctx, name);
                continue;
            }
            debug!("{} 入口候选名称不符: '{}'", ctx, name);
        }
        Ok(None)
    }

    async fn step_loop<D: Dom>(
        &self,
        dom: &D,
        kb: &mut AutofillKb,
        ctx: &JobCtx,
    ) -> AppResult<WizardOutcome> {
        for step in 0..self.step_limit {
            // 每轮第一件事：主动检查保存确认层
            if dialog::handle_save_dialog(dom, &self.pace).await? {
                info!("{} 步骤 {} 出现保存确认层，视为已有申请在途", ctx, step + 1);
                return Ok(WizardOutcome::Success);
            }

            let Some(modal) = self.find_step_container(dom).await? else {
                debug!("{} 步骤 {}: 没有找到申请弹层", ctx, step + 1);
                if self.page_reports_success(dom).await? {
                    info!("{} ✅ 页面提示申请已提交", ctx);
                    dialog::close_all_dialogs(dom, &self.pace).await?;
                    return Ok(WizardOutcome::Success);
                }
                // 步数上限兜底终止，这里只消耗一轮
                sleep(self.pace.settle).await;
                continue;
            };

            let form_el = modal.query(&Query::css("form")).await?.into_iter().next();
            match &form_el {
                Some(form_node) => {
                    debug!("{} 步骤 {}: 发现表单，开始字段对账", ctx, step + 1);
                    form::reconcile_form(form_node, kb, ctx).await?;
                }
                None => {
                    // 无表单：先看完成文案，再看是不是 100% 的收尾步骤
                    if completion_keyword_matches(&modal.text().await?) {
                        info!("{} ✅ 弹层文本显示申请完成", ctx);
                        dialog::close_all_dialogs(dom, &self.pace).await?;
                        return Ok(WizardOutcome::Success);
                    }
                    if self.is_final_step(dom, &modal).await? {
                        debug!("{} 进度 100%，无表单的收尾步骤", ctx);
                    }
                }
            }

            let Some(action) = self.find_action_with_retry(&modal, ctx).await? else {
                if completion_keyword_matches(&modal.text().await.unwrap_or_default()) {
                    info!("{} ✅ 弹层文本显示申请完成", ctx);
                    dialog::close_all_dialogs(dom, &self.pace).await?;
                    return Ok(WizardOutcome::Success);
                }
                warn!("{} ❌ 找不到任何推进控件", ctx);
                dialog::terminate_wizard_modal(dom, &self.pace).await?;
                return Ok(WizardOutcome::Failure(FailureReason::NoActionControl));
            };

            match action {
                StepAction::Submit(button) => {
                    return self.submit(dom, &modal, &button, ctx).await;
                }
                StepAction::ContinueApplying(button) => {
                    info!("{} 点击继续申请", ctx);
                    button.scroll_into_view().await?;
                    sleep(self.pace.short).await;
                    if button.click().await.is_err() {
                        warn!("{} 继续申请按钮点击失败", ctx);
                        dialog::terminate_wizard_modal(dom, &self.pace).await?;
                        return Ok(WizardOutcome::Failure(FailureReason::FlowRejected));
                    }
                    sleep(self.pace.short).await;
                }
                StepAction::Review(button) | StepAction::Next(button) => {
                    if let Some(outcome) = self.advance(dom, &button, ctx).await? {
                        return Ok(outcome);
                    }
                }
            }
        }

        warn!("{} ❌ 步数达到上限 {} 仍未完成", ctx, self.step_limit);
        dialog::close_all_dialogs(dom, &self.pace).await?;
        Ok(WizardOutcome::Failure(FailureReason::StepLimit))
    }

    /// 当前步骤的弹层容器
    async fn find_step_container<D: Dom>(&self, dom: &D) -> AppResult<Option<D::Element>> {
        self.locator
            .locate(dom, None, &step_container_queries(), self.pace.short)
            .await
    }

    /// 弹层不在时的页面级成功提示
    async fn page_reports_success<D: Dom>(&self, dom: &D) -> AppResult<bool> {
        for el in dom.query(&Query::css("[data-test-modal=\"\"]")).await? {
            let text = el.text().await?.to_lowercase();
            if ["sent", "submitted", "application"]
                .iter()
                .any(|k| text.contains(k))
            {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// 100% 进度指示（内容为空的收尾步骤也要继续找提交按钮）
    async fn is_final_step<D: Dom>(&self, dom: &D, modal: &D::Element) -> AppResult<bool> {
        let progress_queries = [
            Query::css("progress[value=\"100\"]"),
            Query::css("progress[aria-valuenow=\"100\"]"),
            Query::css(".artdeco-completeness-meter-linear__progress-element[value=\"100\"]"),
        ];
        for query in &progress_queries {
            if modal.query(query).await?.into_iter().next().is_some() {
                return Ok(true);
            }
            if dom.query(query).await?.into_iter().next().is_some() {
                return Ok(true);
            }
        }
        for el in dom
            .query(&Query::xpath("//span[contains(text(), \"100%\")]"))
            .await?
        {
            if el.is_visible().await? {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// 找推进控件；第一轮落空就做滚动扫掠（顶、中、底）再试一轮
    async fn find_action_with_retry<E: DomElement>(
        &self,
        modal: &E,
        ctx: &JobCtx,
    ) -> AppResult<Option<StepAction<E>>> {
        if let Some(action) = self.find_action(modal).await? {
            return Ok(Some(action));
        }
        debug!("{} 推进控件未找到，滚动扫掠后重试", ctx);
        for fraction in SCROLL_SWEEPS {
            modal.set_scroll_top(*fraction).await?;
            sleep(self.pace.short).await;
        }
        self.find_action(modal).await
    }

    /// 动作优先级：继续申请 > 提交 > 复核 > 下一步
    async fn find_action<E: DomElement>(&self, modal: &E) -> AppResult<Option<StepAction<E>>> {
        // 推进控件都挂在弹层底部
        let _ = modal.set_scroll_top(1.0).await;

        if let Some(button) = self
            .find_named_control(modal, &continue_queries(), CONTINUE_NAMES)
            .await?
        {
            return Ok(Some(StepAction::ContinueApplying(button)));
        }
        if let Some(button) = self
            .find_named_control(modal, &submit_queries(), SUBMIT_NAMES)
            .await?
        {
            return Ok(Some(StepAction::Submit(button)));
        }
        if let Some(button) = self
            .find_named_control(modal, &review_queries(), REVIEW_NAMES)
            .await?
        {
            return Ok(Some(StepAction::Review(button)));
        }
        if let Some(button) = self
            .find_named_control(modal, &next_queries(), NEXT_NAMES)
            .await?
        {
            return Ok(Some(StepAction::Next(button)));
        }
        Ok(None)
    }

    /// 在候选查询里找第一个完整可访问名称落在期望集合内的控件
    ///
    /// 用完整名称比较（而不是子串）区分 "Submit application" 和
    /// 近似但不同的控件；宽泛的主按钮选择器靠这一步兜住。
    async fn find_named_control<E: DomElement>(
        &self,
        modal: &E,
        queries: &[Query],
        expected: &[&str],
    ) -> AppResult<Option<E>> {
        for query in queries {
            for candidate in modal.query(query).await? {
                if !candidate.is_interactable().await? {
                    continue;
                }
                let name = accessible_name(&candidate).await?;
                let normalized = name.trim().to_lowercase();
                if expected.iter().any(|want| normalized == *want) {
                    return Ok(Some(candidate));
                }
                debug!("控件名称不符 ({}): '{}'", query, name);
            }
        }
        Ok(None)
    }

    /// 提交路径
    async fn submit<D: Dom>(
        &self,
        dom: &D,
        modal: &D::Element,
        button: &D::Element,
        ctx: &JobCtx,
    ) -> AppResult<WizardOutcome> {
        info!("{} 📤 找到提交按钮，准备提交申请", ctx);

        modal.set_scroll_top(1.0).await?;
        sleep(self.pace.short).await;

        // 固定策略：提交前取消勾选"关注公司"
        self.uncheck_follow_company(dom, ctx).await?;

        for attempt in 0..3 {
            button.scroll_into_view().await?;
            sleep(self.pace.short).await;
            if button.is_visible().await? {
                break;
            }
            debug!("{} 提交按钮滚动后仍不可见 (尝试 {}/3)", ctx, attempt + 1);
        }

        if !button.is_enabled().await? {
            debug!("{} 提交按钮未启用，等待后再点", ctx);
            sleep(self.pace.settle).await;
        }

        if let Err(e) = button.click().await {
            warn!("{} 原生点击被拒绝: {}，改用脚本点击", ctx, e);
            if let Err(e) = button.js_click().await {
                error!("{} 提交点击彻底失败: {}", ctx, e);
                dialog::close_all_dialogs(dom, &self.pace).await?;
                return Ok(WizardOutcome::Failure(FailureReason::NoActionControl));
            }
        }
        sleep(self.pace.settle).await;

        // 提交后：保存确认层或整页成功文案都算成功
        if dialog::handle_save_dialog(dom, &self.pace).await? {
            info!("{} ✅ 提交后出现保存确认层，视为成功", ctx);
            return Ok(WizardOutcome::Success);
        }
        let page_text = dom.body_text().await.unwrap_or_default().to_lowercase();
        if SUCCESS_INDICATORS.iter().any(|k| page_text.contains(k)) {
            info!("{} ✅ 页面确认申请已提交", ctx);
        }
        dialog::close_all_dialogs(dom, &self.pace).await?;
        info!("{} ✅ 申请提交完成", ctx);
        Ok(WizardOutcome::Success)
    }

    /// 固定策略：提交前取消"关注公司"
    ///
    /// 复选框经常是视觉隐藏的，点不到就点它的 label，再不行
    /// 直接修补 checked 属性。
    async fn uncheck_follow_company<D: Dom>(&self, dom: &D, ctx: &JobCtx) -> AppResult<()> {
        let footer = dom
            .query(&Query::css(".job-details-easy-apply-footer__section"))
            .await?
            .into_iter()
            .next();

        let mut checkbox = None;
        for query in &follow_checkbox_queries() {
            let found = match footer.as_ref() {
                Some(section) => section.query(query).await?,
                None => dom.query(query).await?,
            };
            if let Some(el) = found.into_iter().next() {
                checkbox = Some(el);
                break;
            }
        }
        let Some(checkbox) = checkbox else {
            debug!("{} 没有关注公司复选框", ctx);
            return Ok(());
        };
        if !checkbox.is_selected().await? {
            debug!("{} 关注公司复选框本来就未勾选", ctx);
            return Ok(());
        }

        info!("{} 取消勾选关注公司", ctx);
        checkbox.scroll_into_view().await?;
        sleep(self.pace.short).await;

        if checkbox.is_visible().await? {
            let _ = checkbox.click().await;
        } else if let Some(id) = checkbox.attr("id").await? {
            let label_query = Query::css(format!("label[for=\"{}\"]", id));
            let label = match footer.as_ref() {
                Some(section) => section.query(&label_query).await?.into_iter().next(),
                None => dom.query(&label_query).await?.into_iter().next(),
            };
            match label {
                Some(label) => {
                    let _ = label.click().await;
                }
                None => checkbox.js_click().await?,
            }
        } else {
            checkbox.js_click().await?;
        }
        sleep(self.pace.short).await;

        // 还勾着就直接修补属性
        if checkbox.is_selected().await.unwrap_or(false) {
            checkbox.set_checked(false).await?;
        }
        Ok(())
    }

    /// 点击下一步 / 复核并检查推进结果
    ///
    /// 返回 Some(终态) 或 None（继续循环）。
    async fn advance<D: Dom>(
        &self,
        dom: &D,
        button: &D::Element,
        ctx: &JobCtx,
    ) -> AppResult<Option<WizardOutcome>> {
        let name = accessible_name(button).await.unwrap_or_default();
        info!("{} 点击推进控件: '{}'", ctx, name);

        button.scroll_into_view().await?;
        sleep(self.pace.short).await;

        if !button.is_enabled().await? {
            debug!("{} 推进控件未启用，等待", ctx);
            sleep(self.pace.settle).await;
        }

        if let Err(e) = button.click().await {
            error!("{} 推进控件点击失败: {}", ctx, e);
            dialog::terminate_wizard_modal(dom, &self.pace).await?;
            return Ok(Some(WizardOutcome::Failure(FailureReason::FlowRejected)));
        }
        sleep(self.pace.settle).await;

        if dialog::handle_save_dialog(dom, &self.pace).await? {
            info!("{} 推进后出现保存确认层，视为已有申请在途", ctx);
            return Ok(Some(WizardOutcome::Success));
        }

        // 出现放弃按钮说明流程被拒绝而不是推进
        for candidate in dom
            .query(&Query::css("button[data-test-dialog-secondary-btn]"))
            .await?
        {
            if candidate.text().await?.to_lowercase().contains("discard") {
                warn!("{} 出现放弃确认，流程被拒绝", ctx);
                dialog::terminate_wizard_modal(dom, &self.pace).await?;
                return Ok(Some(WizardOutcome::Failure(FailureReason::FlowRejected)));
            }
        }
        Ok(None)
    }
}

// ========== 候选查询列表 ==========

fn entry_point_queries() -> Vec<Query> {
    vec![
        Query::css("#jobs-apply-button-id"),
        Query::css("button[aria-label*=\"Easy Apply\"]"),
        Query::css(".jobs-apply-button"),
        Query::css("button[class*=\"jobs-apply-button\"]"),
        Query::css(".jobs-apply-button--top-card"),
        Query::css("button[data-control-name=\"jobdetails_topcard_inapply\"]"),
        Query::xpath("//button[contains(@aria-label, \"Easy Apply\")]"),
        Query::name("Easy Apply"),
    ]
}

fn step_container_queries() -> Vec<Query> {
    vec![
        Query::css(".jobs-easy-apply-modal"),
        Query::css(".artdeco-modal"),
        Query::css("[data-test-modal]"),
        Query::css("[role=\"dialog\"]"),
        Query::css(".artdeco-modal--layer-default"),
    ]
}

fn continue_queries() -> Vec<Query> {
    vec![
        Query::css("button[aria-label=\"Continue applying\"]"),
        Query::name("Continue applying"),
    ]
}

fn submit_queries() -> Vec<Query> {
    vec![
        Query::css("button[aria-label=\"Submit application\"]"),
        Query::css("button[data-live-test-easy-apply-submit-button]"),
        Query::css("button.artdeco-button--primary"),
        Query::name("Submit"),
    ]
}

fn review_queries() -> Vec<Query> {
    vec![
        Query::css("button[aria-label=\"Review your application\"]"),
        Query::css("button[data-easy-apply-review-button]"),
        Query::css("button[data-live-test-easy-apply-review-button]"),
        Query::name("Review"),
    ]
}

fn next_queries() -> Vec<Query> {
    vec![
        Query::css("button[aria-label=\"Continue to next step\"]"),
        Query::css("button[data-easy-apply-next-button]"),
        Query::css("button[data-live-test-easy-apply-next-button]"),
        Query::css("button.artdeco-button--primary"),
        Query::name("Next"),
    ]
}

fn follow_checkbox_queries() -> Vec<Query> {
    vec![
        Query::css("#follow-company-checkbox"),
        Query::css("input[id=\"follow-company-checkbox\"]"),
        Query::css("input[type=\"checkbox\"][id*=\"follow\"]"),
    ]
}
