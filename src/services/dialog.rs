//! 意外弹窗处理 - 业务能力层
//!
//! "保存这份申请？"确认层可能在任何时刻出现，必须主动检查而不是
//! 等它挡路。每条失败路径都会借道这里做尽力而为的清场，保证
//! 翻页器不被残留弹层卡住。

use tokio::time::sleep;
use tracing::{debug, info, warn};

use crate::config::Pace;
use crate::dom::{Dom, DomElement, Query};
use crate::error::AppResult;

const SAVE_DIALOG: &str = "[data-test-modal=\"\"][role=\"alertdialog\"]";
const SAVE_DIALOG_TITLE: &str = "h2[data-test-dialog-title]";
const SECONDARY_BUTTON: &str = "button[data-test-dialog-secondary-btn]";
const DISMISS_BUTTON: &str = "button[aria-label=\"Dismiss\"]";
const SAVE_DIALOG_ATTEMPTS: usize = 3;

/// 保存确认层是否在场（只探测，不处理）
pub async fn save_dialog_present<D: Dom>(dom: &D) -> AppResult<bool> {
    Ok(find_save_dialog(dom).await?.is_some())
}

async fn find_save_dialog<D: Dom>(dom: &D) -> AppResult<Option<D::Element>> {
    for dialog in dom.query(&Query::css(SAVE_DIALOG)).await? {
        if !dialog.is_visible().await? {
            continue;
        }
        let Some(title) = dialog
            .query(&Query::css(SAVE_DIALOG_TITLE))
            .await?
            .into_iter()
            .next()
        else {
            continue;
        };
        if title.text().await?.contains("Save this application?") {
            return Ok(Some(dialog));
        }
    }
    Ok(None)
}

/// 处理保存确认层：优先点 "Discard"，回退 "Dismiss"，最多尝试 3 次
///
/// 返回是否确实发现过该弹窗（调用方把它解读为"已有申请在途"）。
pub async fn handle_save_dialog<D: Dom>(dom: &D, pace: &Pace) -> AppResult<bool> {
    for attempt in 0..SAVE_DIALOG_ATTEMPTS {
        let Some(dialog) = find_save_dialog(dom).await? else {
            return Ok(attempt > 0);
        };
        info!(
            "检测到保存申请确认层，尝试关闭 ({}/{})",
            attempt + 1,
            SAVE_DIALOG_ATTEMPTS
        );

        let mut clicked = false;
        for button in dialog.query(&Query::css(SECONDARY_BUTTON)).await? {
            if button.text().await?.to_lowercase().contains("discard") {
                button.scroll_into_view().await?;
                sleep(pace.short).await;
                clicked = button.click().await.is_ok();
                break;
            }
        }
        if !clicked {
            if let Some(dismiss) = dialog
                .query(&Query::css(DISMISS_BUTTON))
                .await?
                .into_iter()
                .next()
            {
                dismiss.scroll_into_view().await?;
                sleep(pace.short).await;
                clicked = dismiss.click().await.is_ok();
            }
        }
        if !clicked {
            warn!("保存确认层上没有可用的关闭按钮");
        }

        sleep(pace.settle).await;
        if find_save_dialog(dom).await?.is_none() {
            info!("✓ 保存确认层已关闭");
            return Ok(true);
        }
    }
    warn!("⚠️ 保存确认层处理失败（已尝试 {} 次）", SAVE_DIALOG_ATTEMPTS);
    Ok(true)
}

/// 终止申请弹层：先处理保存确认层，再走 Dismiss → Discard 链
pub async fn terminate_wizard_modal<D: Dom>(dom: &D, pace: &Pace) -> AppResult<()> {
    if handle_save_dialog(dom, pace).await? {
        return Ok(());
    }

    let Some(dismiss) = dom
        .query(&Query::css(DISMISS_BUTTON))
        .await?
        .into_iter()
        .next()
    else {
        debug!("没有找到 Dismiss 按钮");
        return Ok(());
    };

    debug!("点击 Dismiss 关闭申请弹层");
    dismiss.scroll_into_view().await?;
    sleep(pace.short).await;
    if dismiss.click().await.is_err() {
        warn!("Dismiss 点击失败");
    }
    sleep(pace.short).await;

    // 关闭动作本身可能再弹出保存确认层
    if handle_save_dialog(dom, pace).await? {
        return Ok(());
    }
    for button in dom.query(&Query::css(SECONDARY_BUTTON)).await? {
        if button.text().await?.to_lowercase().contains("discard") {
            let _ = button.click().await;
            sleep(pace.short).await;
            break;
        }
    }
    Ok(())
}

/// 尽力关闭页面上残留的弹层（含 "No thanks" 追加弹窗）
pub async fn close_all_dialogs<D: Dom>(dom: &D, pace: &Pace) -> AppResult<()> {
    let _ = handle_save_dialog(dom, pace).await;

    for modal in dom.query(&Query::css("[class*=\"artdeco-modal\"]")).await? {
        if !modal.is_visible().await.unwrap_or(false) {
            continue;
        }
        for button in modal.query(&Query::css("button")).await? {
            let text = button.text().await.unwrap_or_default().to_lowercase();
            if text.contains("no thanks") || text.contains("dismiss") {
                let _ = button.click().await;
                sleep(pace.short).await;
                break;
            }
        }
    }
    Ok(())
}
