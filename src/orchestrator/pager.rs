//! 列表翻页器 - 编排层
//!
//! ## 职责
//!
//! 逐页抓取职位摘要、套过滤器、逐个调起申请向导，再翻下一页。
//!
//! ## 核心约定
//!
//! 1. **显式迭代**：页码状态放在循环变量里，不做自递归
//! 2. **序号重查**：列表文档随时会变，幸存职位只记 position_index
//! 3. **协作式取消**：每个边界先问 should_continue()，从不打断进行中的操作
//! 4. **错误隔离**：单个职位失败不影响后续；只有会话级故障才中止整次运行

use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::{Config, Pace};
use crate::dom::{Dom, DomElement};
use crate::error::AppError;
use crate::models::listing::JobListing;
use crate::services::autofill_kb::AutofillKb;
use crate::services::job_filter::JobFilter;
use crate::services::listings;
use crate::workflow::job_ctx::JobCtx;
use crate::workflow::wizard::{ApplicationWizard, WizardOutcome};

/// 一次运行的统计
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RunStats {
    pub pages: usize,
    pub applied: usize,
    pub already_applied: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// 处理所有搜索结果页
pub async fn process_listing_pages<D, F>(
    dom: &D,
    filter: &JobFilter,
    kb: &mut AutofillKb,
    config: &Config,
    should_continue: F,
) -> anyhow::Result<RunStats>
where
    D: Dom,
    F: Fn() -> bool,
{
    let pace = Pace::from_config(config);
    let wizard = ApplicationWizard::new(config);
    let mut stats = RunStats::default();
    let mut page_number = 1usize;

    loop {
        if !should_continue() {
            info!("⏹️ 用户要求停止，翻页前退出");
            break;
        }

        info!("{}", "=".repeat(60));
        info!("📄 开始处理第 {} 页", page_number);
        stats.pages = page_number;

        process_single_page(
            dom,
            filter,
            kb,
            &wizard,
            &pace,
            page_number,
            &mut stats,
            &should_continue,
        )
        .await?;

        if !should_continue() {
            info!("⏹️ 用户要求停止");
            break;
        }

        // 翻页：先把列表滚到底促使分页控件渲染
        listings::scroll_list_to_bottom(dom).await?;
        sleep(pace.short).await;

        let Some(next) = listings::next_page_button(dom).await? else {
            info!("✅ 没有下一页，翻页结束");
            break;
        };
        next.scroll_into_view().await?;
        sleep(pace.short).await;
        if next.click().await.is_err() {
            warn!("下一页按钮点击失败，结束翻页");
            break;
        }
        sleep(pace.settle).await;
        page_number += 1;
    }

    Ok(stats)
}

#[allow(clippy::too_many_arguments)]
async fn process_single_page<D, F>(
    dom: &D,
    filter: &JobFilter,
    kb: &mut AutofillKb,
    wizard: &ApplicationWizard,
    pace: &Pace,
    page_number: usize,
    stats: &mut RunStats,
    should_continue: &F,
) -> anyhow::Result<()>
where
    D: Dom,
    F: Fn() -> bool,
{
    // 第一遍：摘要 + 标题过滤，幸存者只记 position_index
    let cards = listings::fetch_cards(dom).await?;
    info!("本页共 {} 张职位卡片", cards.len());

    let mut survivors: Vec<JobListing> = Vec::new();
    for (idx, card) in cards.iter().enumerate() {
        if !should_continue() {
            info!("⏹️ 过滤阶段被用户停止");
            return Ok(());
        }

        let listing = match listings::summarize_card(card, idx).await {
            Ok(Some(listing)) => listing,
            Ok(None) => {
                debug!("卡片 {} 没有标题链接，跳过", idx + 1);
                stats.skipped += 1;
                continue;
            }
            Err(e) => {
                // 卡片在读取途中失效很常见，跳过即可
                warn!("卡片 {} 读取失败: {}，跳过", idx + 1, e);
                stats.skipped += 1;
                continue;
            }
        };

        if listing.applied {
            debug!("卡片 {} 已申请过: {}", idx + 1, listing.title);
            stats.already_applied += 1;
            continue;
        }
        if let Some(reason) = filter.should_skip_by_title(&listing.title) {
            info!("卡片 {} 跳过 ({}): {}", idx + 1, reason, listing.title);
            stats.skipped += 1;
            continue;
        }
        debug!("卡片 {} 通过标题过滤: {}", idx + 1, listing.title);
        survivors.push(listing);
    }
    info!(
        "过滤完成: {}/{} 张卡片进入申请阶段",
        survivors.len(),
        cards.len()
    );

    // 第二遍：按幸存者顺序处理
    for (nth, listing) in survivors.iter().enumerate() {
        if !should_continue() {
            info!("⏹️ 申请阶段被用户停止");
            return Ok(());
        }

        let ctx = JobCtx::new(page_number, listing.position_index + 1, listing.title.clone());
        info!(
            "{} 处理幸存职位 {}/{}: {}",
            ctx,
            nth + 1,
            survivors.len(),
            listing.title
        );

        match process_survivor(dom, filter, kb, wizard, pace, listing, &ctx).await {
            Ok(Some(WizardOutcome::Success)) => {
                stats.applied += 1;
                info!("{} ✅ 申请成功 (累计 {})", ctx, stats.applied);
            }
            Ok(Some(WizardOutcome::AlreadyApplied)) => {
                stats.already_applied += 1;
            }
            Ok(Some(WizardOutcome::Failure(reason))) => {
                stats.failed += 1;
                warn!("{} ❌ 申请失败: {}", ctx, reason);
            }
            Ok(None) => {
                stats.skipped += 1;
            }
            Err(e) => {
                // 会话级故障中止整次运行，其余错误只影响这一个职位
                if is_session_error(&e) {
                    return Err(e);
                }
                error!("{} 处理过程中发生错误: {}", ctx, e);
                stats.failed += 1;
            }
        }
        sleep(pace.short).await;
    }
    Ok(())
}

/// 处理一个幸存职位；返回 None 表示未进入向导（消失 / 坏词跳过）
async fn process_survivor<D: Dom>(
    dom: &D,
    filter: &JobFilter,
    kb: &mut AutofillKb,
    wizard: &ApplicationWizard,
    pace: &Pace,
    listing: &JobListing,
    ctx: &JobCtx,
) -> anyhow::Result<Option<WizardOutcome>> {
    // 过滤阶段拿到的元素句柄早已失效，按序号在最新列表里重查
    let cards = listings::fetch_cards(dom).await?;
    if listing.position_index >= cards.len() {
        warn!(
            "{} 职位已从列表消失 (序号 {} / 现存 {})",
            ctx,
            listing.position_index + 1,
            cards.len()
        );
        return Ok(None);
    }
    let card = &cards[listing.position_index];

    let Some(title_link) = listings::find_title_link(card).await? else {
        warn!("{} 重查后找不到标题链接", ctx);
        return Ok(None);
    };

    debug!("{} 打开职位详情", ctx);
    if title_link.click().await.is_err() {
        warn!("{} 标题点击失败", ctx);
        return Ok(None);
    }
    sleep(pace.settle).await;

    // 详情描述的坏词过滤；描述节点缺失按通过处理
    match listings::description_text(dom).await? {
        Some(text) => {
            if let Some(reason) = filter.should_skip_by_description(&text) {
                info!("{} 跳过 ({})", ctx, reason);
                return Ok(None);
            }
            debug!("{} 描述通过坏词过滤", ctx);
        }
        None => debug!("{} 没有读到职位描述，按通过处理", ctx),
    }

    let outcome = wizard.run(dom, kb, ctx).await?;
    Ok(Some(outcome))
}

/// 会话级故障：与浏览器的通信已经断了
fn is_session_error(err: &anyhow::Error) -> bool {
    matches!(err.downcast_ref::<AppError>(), Some(AppError::Browser(_)))
}
