//! 浏览器会话 - 基础设施层
//!
//! 持有唯一的 Page 资源，实现 `Dom` 能力 trait。
//!
//! 职责：
//! - 持有唯一的 Page 资源
//! - 暴露 query / eval / navigate 能力
//! - 不认识职位、表单、知识库
//! - 不处理业务流程

use chromiumoxide::Page;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::dom::{filter_by_accessible_name, Dom, Query, ACCESSIBLE_NAME_POOL};
use crate::error::{AppError, AppResult};
use crate::infrastructure::element::PageElement;

/// 浏览器会话
pub struct Session {
    page: Page,
}

impl Session {
    /// 创建新的会话
    pub fn new(page: Page) -> Self {
        Self { page }
    }

    /// 获取 page 的引用（浏览器边缘代码用）
    pub fn page(&self) -> &Page {
        &self.page
    }
}

impl Dom for Session {
    type Element = PageElement;

    async fn query(&self, query: &Query) -> AppResult<Vec<PageElement>> {
        let found = match query {
            Query::Css(css) => self.page.find_elements(css.as_str()).await,
            Query::XPath(xpath) => self.page.find_xpaths(xpath.as_str()).await,
            Query::AccessibleName(pattern) => {
                let pool = match self.page.find_elements(ACCESSIBLE_NAME_POOL).await {
                    Ok(elements) => elements,
                    Err(e) => {
                        debug!("可访问名称池查询无结果: {}", e);
                        return Ok(Vec::new());
                    }
                };
                let wrapped = pool.into_iter().map(PageElement::new).collect();
                return filter_by_accessible_name(wrapped, pattern).await;
            }
        };
        match found {
            Ok(elements) => Ok(elements.into_iter().map(PageElement::new).collect()),
            Err(e) => {
                // 查不到按普通结果处理；会话级故障由 eval / navigate 暴露
                debug!("查询无结果 ({}): {}", query, e);
                Ok(Vec::new())
            }
        }
    }

    async fn eval(&self, js: &str) -> AppResult<JsonValue> {
        let result = self.page.evaluate(js.to_string()).await?;
        Ok(result.value().cloned().unwrap_or(JsonValue::Null))
    }

    async fn navigate(&self, url: &str) -> AppResult<()> {
        self.page
            .goto(url)
            .await
            .map_err(|e| AppError::navigation_failed(url, e))?;
        Ok(())
    }

    async fn current_url(&self) -> AppResult<String> {
        Ok(self.page.url().await?.unwrap_or_default())
    }

    async fn body_text(&self) -> AppResult<String> {
        let value = self
            .eval("document.body ? document.body.innerText : \"\"")
            .await?;
        Ok(value.as_str().unwrap_or_default().to_string())
    }
}
