//! DOM 能力边界
//!
//! 核心层只通过这里的 trait 访问页面，不认识任何 chromiumoxide 类型。
//! 查询不到是普通结果（空列表 / None），不是错误；脚本执行只用于
//! 滚动和 DOM 属性修补两类操作。

use serde_json::Value as JsonValue;

use crate::error::AppResult;

/// 元素查询策略（按顺序消费的带标签变体）
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// CSS 选择器
    Css(String),
    /// XPath 表达式（仅页面作用域支持）
    XPath(String),
    /// 可访问名称包含匹配：aria-label 或按钮文本，大小写不敏感
    AccessibleName(String),
}

impl Query {
    pub fn css(pattern: impl Into<String>) -> Self {
        Query::Css(pattern.into())
    }

    pub fn xpath(pattern: impl Into<String>) -> Self {
        Query::XPath(pattern.into())
    }

    pub fn name(pattern: impl Into<String>) -> Self {
        Query::AccessibleName(pattern.into())
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Query::Css(p) => write!(f, "css:{}", p),
            Query::XPath(p) => write!(f, "xpath:{}", p),
            Query::AccessibleName(p) => write!(f, "name:{}", p),
        }
    }
}

/// 可访问名称匹配时扫描的元素池
pub const ACCESSIBLE_NAME_POOL: &str = "button, [role=\"button\"]";

/// 页面作用域能力
#[allow(async_fn_in_trait)]
pub trait Dom {
    type Element: DomElement;

    /// 查询页面上的所有匹配元素；无匹配返回空列表，不是错误
    async fn query(&self, query: &Query) -> AppResult<Vec<Self::Element>>;

    /// 执行 JS 并返回 JSON 结果
    async fn eval(&self, js: &str) -> AppResult<JsonValue>;

    async fn navigate(&self, url: &str) -> AppResult<()>;

    async fn current_url(&self) -> AppResult<String>;

    /// 页面可见文本（整页成功提示检查用）
    async fn body_text(&self) -> AppResult<String>;
}

/// 元素作用域能力
#[allow(async_fn_in_trait)]
pub trait DomElement: Clone {
    /// 在元素子树内查询；XPath 在元素作用域不可用，返回空列表
    async fn query(&self, query: &Query) -> AppResult<Vec<Self>>;

    async fn tag(&self) -> AppResult<String>;

    async fn text(&self) -> AppResult<String>;

    async fn attr(&self, name: &str) -> AppResult<Option<String>>;

    async fn is_visible(&self) -> AppResult<bool>;

    async fn is_enabled(&self) -> AppResult<bool>;

    async fn is_selected(&self) -> AppResult<bool>;

    /// 原生输入事件点击
    async fn click(&self) -> AppResult<()>;

    async fn send_keys(&self, text: &str) -> AppResult<()>;

    async fn scroll_into_view(&self) -> AppResult<()>;

    /// 在元素上执行 JS 函数（this 绑定到元素）
    ///
    /// 只用于滚动和 DOM 属性修补，不承载业务逻辑。
    async fn apply_js(&self, func: &str) -> AppResult<JsonValue>;

    /// 可交互 = 可见 + 可用
    async fn is_interactable(&self) -> AppResult<bool> {
        Ok(self.is_visible().await? && self.is_enabled().await?)
    }

    /// 脚本点击（原生点击被拒绝时的回退）
    async fn js_click(&self) -> AppResult<()> {
        self.apply_js("function() { this.click(); }").await?;
        Ok(())
    }

    /// 清空输入框并派发 input 事件
    async fn clear(&self) -> AppResult<()> {
        self.apply_js(
            "function() { this.value = ''; this.dispatchEvent(new Event('input', { bubbles: true })); }",
        )
        .await?;
        Ok(())
    }

    /// 把滚动条拉到自身高度的指定比例（0.0 顶部 / 1.0 底部）
    async fn set_scroll_top(&self, fraction: f64) -> AppResult<()> {
        self.apply_js(&format!(
            "function() {{ this.scrollTop = this.scrollHeight * {}; }}",
            fraction
        ))
        .await?;
        Ok(())
    }

    /// 修补 checked 属性（视觉隐藏复选框的最后手段）
    async fn set_checked(&self, checked: bool) -> AppResult<()> {
        self.apply_js(&format!(
            "function() {{ this.checked = {}; this.dispatchEvent(new Event('change', {{ bubbles: true }})); }}",
            checked
        ))
        .await?;
        Ok(())
    }
}

/// 元素的完整可访问名称：aria-label 优先，其次裁剪后的文本
pub async fn accessible_name<E: DomElement>(element: &E) -> AppResult<String> {
    let label = element.attr("aria-label").await?.unwrap_or_default();
    if !label.trim().is_empty() {
        return Ok(label.trim().to_string());
    }
    Ok(element.text().await?.trim().to_string())
}

/// 按可访问名称过滤候选池（各 Dom 实现共用，保证口径一致）
pub async fn filter_by_accessible_name<E: DomElement>(
    candidates: Vec<E>,
    pattern: &str,
) -> AppResult<Vec<E>> {
    let needle = pattern.to_lowercase();
    let mut matched = Vec::new();
    for candidate in candidates {
        if accessible_name(&candidate)
            .await?
            .to_lowercase()
            .contains(&needle)
        {
            matched.push(candidate);
        }
    }
    Ok(matched)
}
