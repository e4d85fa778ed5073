//! 页面元素句柄 - 基础设施层

use std::sync::Arc;

use chromiumoxide::element::Element;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::dom::{filter_by_accessible_name, DomElement, Query, ACCESSIBLE_NAME_POOL};
use crate::error::AppResult;

/// 页面元素句柄
///
/// 句柄随文档变动会失效（stale）；调用方遇到失效不做恢复，
/// 统一靠稳定锚点（序号 / 重新定位）重查。
#[derive(Clone)]
pub struct PageElement {
    inner: Arc<Element>,
}

impl PageElement {
    pub fn new(element: Element) -> Self {
        Self {
            inner: Arc::new(element),
        }
    }

    async fn bool_js(&self, func: &str) -> AppResult<bool> {
        Ok(self.apply_js(func).await?.as_bool().unwrap_or(false))
    }
}

impl DomElement for PageElement {
    async fn query(&self, query: &Query) -> AppResult<Vec<Self>> {
        match query {
            Query::Css(css) => match self.inner.find_elements(css.as_str()).await {
                Ok(elements) => Ok(elements.into_iter().map(PageElement::new).collect()),
                Err(e) => {
                    debug!("元素内查询无结果 ({}): {}", query, e);
                    Ok(Vec::new())
                }
            },
            Query::XPath(_) => {
                // XPath 只在页面作用域可用
                debug!("跳过元素作用域的 XPath 查询: {}", query);
                Ok(Vec::new())
            }
            Query::AccessibleName(pattern) => {
                let pool = match self.inner.find_elements(ACCESSIBLE_NAME_POOL).await {
                    Ok(elements) => elements,
                    Err(_) => Vec::new(),
                };
                let wrapped = pool.into_iter().map(PageElement::new).collect();
                filter_by_accessible_name(wrapped, pattern).await
            }
        }
    }

    async fn tag(&self) -> AppResult<String> {
        Ok(self
            .apply_js("function() { return this.tagName.toLowerCase(); }")
            .await?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    async fn text(&self) -> AppResult<String> {
        Ok(self.inner.inner_text().await?.unwrap_or_default())
    }

    async fn attr(&self, name: &str) -> AppResult<Option<String>> {
        Ok(self.inner.attribute(name).await?)
    }

    async fn is_visible(&self) -> AppResult<bool> {
        self.bool_js(
            "function() { \
                const rect = this.getBoundingClientRect(); \
                const style = window.getComputedStyle(this); \
                return rect.width > 0 && rect.height > 0 \
                    && style.display !== 'none' && style.visibility !== 'hidden'; \
            }",
        )
        .await
    }

    async fn is_enabled(&self) -> AppResult<bool> {
        self.bool_js("function() { return !this.disabled; }").await
    }

    async fn is_selected(&self) -> AppResult<bool> {
        self.bool_js("function() { return !!(this.checked || this.selected); }")
            .await
    }

    async fn click(&self) -> AppResult<()> {
        self.inner.click().await?;
        Ok(())
    }

    async fn send_keys(&self, text: &str) -> AppResult<()> {
        self.inner.focus().await?;
        self.inner.type_str(text).await?;
        Ok(())
    }

    async fn scroll_into_view(&self) -> AppResult<()> {
        self.inner.scroll_into_view().await?;
        Ok(())
    }

    async fn apply_js(&self, func: &str) -> AppResult<JsonValue> {
        let returns = self.inner.call_js_fn(func, false).await?;
        Ok(returns.result.value.unwrap_or(JsonValue::Null))
    }
}
