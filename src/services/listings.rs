//! 职位列表读取 - 业务能力层
//!
//! 只负责从搜索结果页读卡片、摘要和翻页控件，不关心流程。

use tracing::debug;

use crate::dom::{Dom, DomElement, Query};
use crate::error::AppResult;
use crate::models::listing::JobListing;

const CARD: &str = ".scaffold-layout__list-item";
const APPLIED_FOOTER: &str = ".job-card-container__footer-job-state";
const TITLE_PRIMARY: &str = ".artdeco-entity-lockup__title .job-card-container__link";
const TITLE_FALLBACK: &str = ".job-card-container__link";
const SUBTITLE: &str = ".artdeco-entity-lockup__subtitle";
const DESCRIPTION: &str = "[class*=\"jobs-box__html-content\"]";
const LIST_SCROLL: &str = ".scaffold-layout__list > div";
const NEXT_BUTTON: &str =
    "button.jobs-search-pagination__button--next[aria-label*=\"next\"]:not([disabled])";

/// 抓取当前页全部职位卡片
pub async fn fetch_cards<D: Dom>(dom: &D) -> AppResult<Vec<D::Element>> {
    dom.query(&Query::css(CARD)).await
}

/// 摘要一张卡片：标题、副标题、已申请标记
///
/// 标题链接缺失返回 None（这张卡不可处理）。
pub async fn summarize_card<E: DomElement>(
    card: &E,
    position_index: usize,
) -> AppResult<Option<JobListing>> {
    let Some(title_el) = find_title_link(card).await? else {
        return Ok(None);
    };
    let title = title_el.text().await?.trim().to_string();

    let applied = match card
        .query(&Query::css(APPLIED_FOOTER))
        .await?
        .into_iter()
        .next()
    {
        Some(footer) => footer.text().await?.to_lowercase().contains("applied"),
        None => false,
    };

    let subtitle = match card.query(&Query::css(SUBTITLE)).await?.into_iter().next() {
        Some(el) => {
            let text = el.text().await?.trim().to_string();
            if text.is_empty() {
                None
            } else {
                Some(text)
            }
        }
        None => None,
    };

    Ok(Some(JobListing {
        position_index,
        title,
        subtitle,
        applied,
    }))
}

/// 卡片内的标题链接（两级选择器回退）
pub async fn find_title_link<E: DomElement>(card: &E) -> AppResult<Option<E>> {
    if let Some(el) = card
        .query(&Query::css(TITLE_PRIMARY))
        .await?
        .into_iter()
        .next()
    {
        return Ok(Some(el));
    }
    Ok(card
        .query(&Query::css(TITLE_FALLBACK))
        .await?
        .into_iter()
        .next())
}

/// 详情页描述文本（节点缺失返回 None，调用方按通过处理）
pub async fn description_text<D: Dom>(dom: &D) -> AppResult<Option<String>> {
    match dom
        .query(&Query::css(DESCRIPTION))
        .await?
        .into_iter()
        .next()
    {
        Some(el) => Ok(Some(el.text().await?)),
        None => Ok(None),
    }
}

/// 把列表容器滚到底，促使懒加载的分页控件渲染
pub async fn scroll_list_to_bottom<D: Dom>(dom: &D) -> AppResult<bool> {
    match dom
        .query(&Query::css(LIST_SCROLL))
        .await?
        .into_iter()
        .next()
    {
        Some(container) => {
            container.set_scroll_top(1.0).await?;
            Ok(true)
        }
        None => {
            debug!("没有找到列表滚动容器");
            Ok(false)
        }
    }
}

/// 未禁用的"下一页"控件
pub async fn next_page_button<D: Dom>(dom: &D) -> AppResult<Option<D::Element>> {
    Ok(dom
        .query(&Query::css(NEXT_BUTTON))
        .await?
        .into_iter()
        .next())
}
