//! 弹性元素定位 - 业务能力层
//!
//! 把散落各处的"逐个选择器 try 一遍"收拢成一个按序消费
//! Query 列表的例程：候选必须既存在又可交互（可见 + 可用）才算
//! 命中，第一个命中即停。找不到是普通结果（None），不是错误。

use std::time::Duration;

use tokio::time::sleep;
use tracing::debug;

use crate::dom::{Dom, DomElement, Query};
use crate::error::AppResult;

/// 元素定位服务
#[derive(Debug, Clone)]
pub struct Locator {
    /// 轮询间隔（固定短睡眠）
    poll_interval: Duration,
}

impl Locator {
    pub fn new(poll_interval: Duration) -> Self {
        Self { poll_interval }
    }

    /// 按顺序尝试查询列表，返回第一个既存在又可交互的元素
    ///
    /// 每个查询最多等待 `timeout`（至少探测一次）；全部落空返回 None。
    pub async fn locate<D: Dom>(
        &self,
        dom: &D,
        root: Option<&D::Element>,
        queries: &[Query],
        timeout: Duration,
    ) -> AppResult<Option<D::Element>> {
        for query in queries {
            if let Some(found) = self.wait_for_match(dom, root, query, timeout).await? {
                debug!("定位成功: {}", query);
                return Ok(Some(found));
            }
            debug!("定位落空: {}", query);
        }
        Ok(None)
    }

    /// 等待单个查询变为可点击（存在 + 可交互），超时返回 None
    pub async fn wait_until_clickable<D: Dom>(
        &self,
        dom: &D,
        root: Option<&D::Element>,
        query: &Query,
        timeout: Duration,
    ) -> AppResult<Option<D::Element>> {
        self.wait_for_match(dom, root, query, timeout).await
    }

    /// 返回第一个产生结果的查询的全部可交互匹配
    pub async fn locate_all<D: Dom>(
        &self,
        dom: &D,
        root: Option<&D::Element>,
        queries: &[Query],
        timeout: Duration,
    ) -> AppResult<Vec<D::Element>> {
        for query in queries {
            let deadline = tokio::time::Instant::now() + timeout;
            loop {
                let mut usable = Vec::new();
                for element in query_scope(dom, root, query).await? {
                    if element.is_interactable().await? {
                        usable.push(element);
                    }
                }
                if !usable.is_empty() {
                    return Ok(usable);
                }
                if tokio::time::Instant::now() >= deadline {
                    break;
                }
                sleep(self.poll_interval).await;
            }
        }
        Ok(Vec::new())
    }

    async fn wait_for_match<D: Dom>(
        &self,
        dom: &D,
        root: Option<&D::Element>,
        query: &Query,
        timeout: Duration,
    ) -> AppResult<Option<D::Element>> {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            for element in query_scope(dom, root, query).await? {
                if element.is_interactable().await? {
                    return Ok(Some(element));
                }
            }
            if tokio::time::Instant::now() >= deadline {
                return Ok(None);
            }
            sleep(self.poll_interval).await;
        }
    }
}

/// 在页面或元素作用域上执行一次查询
pub async fn query_scope<D: Dom>(
    dom: &D,
    root: Option<&D::Element>,
    query: &Query,
) -> AppResult<Vec<D::Element>> {
    match root {
        Some(element) => element.query(query).await,
        None => dom.query(query).await,
    }
}
