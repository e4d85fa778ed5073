//! 脚本化的内存 DOM 替身
//!
//! 路由表按选择器字符串精确匹配；点击可以挂副作用回调，用来
//! 模拟"点了之后文档变了"的页面行为。

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use serde_json::Value as JsonValue;

use easy_apply_bot::dom::{filter_by_accessible_name, Dom, DomElement, Query, ACCESSIBLE_NAME_POOL};
use easy_apply_bot::error::AppResult;

type ClickHook = Box<dyn Fn() + Send + Sync>;

#[derive(Default)]
pub struct NodeState {
    pub tag: Mutex<String>,
    pub text: Mutex<String>,
    pub attrs: Mutex<HashMap<String, String>>,
    pub visible: Mutex<bool>,
    pub enabled: Mutex<bool>,
    pub selected: Mutex<bool>,
    pub routes: Mutex<HashMap<String, Vec<FakeNode>>>,
    pub clicks: Mutex<usize>,
    pub keys: Mutex<Vec<String>>,
    pub scripts: Mutex<Vec<String>>,
    pub on_click: Mutex<Option<ClickHook>>,
}

/// 假元素（Arc 共享，克隆即别名）
#[derive(Clone, Default)]
pub struct FakeNode(pub Arc<NodeState>);

impl FakeNode {
    pub fn new(tag: &str) -> Self {
        let node = FakeNode::default();
        *node.0.tag.lock().unwrap() = tag.to_string();
        *node.0.visible.lock().unwrap() = true;
        *node.0.enabled.lock().unwrap() = true;
        node
    }

    pub fn with_text(self, text: &str) -> Self {
        *self.0.text.lock().unwrap() = text.to_string();
        self
    }

    pub fn with_attr(self, name: &str, value: &str) -> Self {
        self.0
            .attrs
            .lock()
            .unwrap()
            .insert(name.to_string(), value.to_string());
        self
    }

    pub fn with_selected(self, selected: bool) -> Self {
        *self.0.selected.lock().unwrap() = selected;
        self
    }

    pub fn hidden(self) -> Self {
        *self.0.visible.lock().unwrap() = false;
        self
    }

    pub fn disabled(self) -> Self {
        *self.0.enabled.lock().unwrap() = false;
        self
    }

    pub fn with_route(self, selector: &str, nodes: Vec<FakeNode>) -> Self {
        self.0
            .routes
            .lock()
            .unwrap()
            .insert(selector.to_string(), nodes);
        self
    }

    pub fn with_on_click(self, hook: impl Fn() + Send + Sync + 'static) -> Self {
        self.set_on_click(hook);
        self
    }

    /// 构造完成后再挂点击副作用（回调里通常要捕获 FakeDom 的克隆）
    pub fn set_on_click(&self, hook: impl Fn() + Send + Sync + 'static) {
        *self.0.on_click.lock().unwrap() = Some(Box::new(hook));
    }

    // ---- 断言辅助 ----

    pub fn clicks(&self) -> usize {
        *self.0.clicks.lock().unwrap()
    }

    pub fn keys(&self) -> Vec<String> {
        self.0.keys.lock().unwrap().clone()
    }

    pub fn value_now(&self) -> String {
        self.0.attrs.lock().unwrap().get("value").cloned().unwrap_or_default()
    }

    pub fn text_now(&self) -> String {
        self.0.text.lock().unwrap().clone()
    }

    pub fn checked_now(&self) -> bool {
        *self.0.selected.lock().unwrap()
    }
}

impl DomElement for FakeNode {
    async fn query(&self, query: &Query) -> AppResult<Vec<FakeNode>> {
        match query {
            Query::Css(pattern) => Ok(self
                .0
                .routes
                .lock()
                .unwrap()
                .get(pattern)
                .cloned()
                .unwrap_or_default()),
            Query::XPath(_) => Ok(Vec::new()),
            Query::AccessibleName(pattern) => {
                let pool = {
                    self.0
                        .routes
                        .lock()
                        .unwrap()
                        .get(ACCESSIBLE_NAME_POOL)
                        .cloned()
                        .unwrap_or_default()
                };
                filter_by_accessible_name(pool, pattern).await
            }
        }
    }

    async fn tag(&self) -> AppResult<String> {
        Ok(self.0.tag.lock().unwrap().clone())
    }

    async fn text(&self) -> AppResult<String> {
        Ok(self.0.text.lock().unwrap().clone())
    }

    async fn attr(&self, name: &str) -> AppResult<Option<String>> {
        Ok(self.0.attrs.lock().unwrap().get(name).cloned())
    }

    async fn is_visible(&self) -> AppResult<bool> {
        Ok(*self.0.visible.lock().unwrap())
    }

    async fn is_enabled(&self) -> AppResult<bool> {
        Ok(*self.0.enabled.lock().unwrap())
    }

    async fn is_selected(&self) -> AppResult<bool> {
        Ok(*self.0.selected.lock().unwrap())
    }

    async fn click(&self) -> AppResult<()> {
        *self.0.clicks.lock().unwrap() += 1;

        let input_type = self
            .0
            .attrs
            .lock()
            .unwrap()
            .get("type")
            .cloned()
            .unwrap_or_default();
        let tag = self.0.tag.lock().unwrap().clone();
        if input_type == "checkbox" {
            let mut selected = self.0.selected.lock().unwrap();
            *selected = !*selected;
        } else if input_type == "radio" || tag == "option" {
            *self.0.selected.lock().unwrap() = true;
        }

        let hook = self.0.on_click.lock().unwrap();
        if let Some(hook) = hook.as_ref() {
            hook();
        }
        Ok(())
    }

    async fn send_keys(&self, text: &str) -> AppResult<()> {
        self.0.keys.lock().unwrap().push(text.to_string());
        let mut attrs = self.0.attrs.lock().unwrap();
        attrs
            .entry("value".to_string())
            .or_default()
            .push_str(text);
        Ok(())
    }

    async fn scroll_into_view(&self) -> AppResult<()> {
        Ok(())
    }

    async fn apply_js(&self, func: &str) -> AppResult<JsonValue> {
        self.0.scripts.lock().unwrap().push(func.to_string());
        Ok(JsonValue::Null)
    }

    // 覆盖默认实现，让脚本类操作在假 DOM 上有真实效果

    async fn js_click(&self) -> AppResult<()> {
        self.click().await
    }

    async fn clear(&self) -> AppResult<()> {
        self.0
            .attrs
            .lock()
            .unwrap()
            .insert("value".to_string(), String::new());
        Ok(())
    }

    async fn set_checked(&self, checked: bool) -> AppResult<()> {
        *self.0.selected.lock().unwrap() = checked;
        Ok(())
    }
}

#[derive(Default)]
pub struct DomState {
    pub routes: Mutex<HashMap<String, Vec<FakeNode>>>,
    pub body: Mutex<String>,
    pub evals: Mutex<Vec<String>>,
    pub url: Mutex<String>,
}

/// 假页面（Arc 共享，点击回调里可以改它的路由表）
#[derive(Clone, Default)]
pub struct FakeDom(pub Arc<DomState>);

impl FakeDom {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_route(self, selector: &str, nodes: Vec<FakeNode>) -> Self {
        self.set_route(selector, nodes);
        self
    }

    pub fn set_route(&self, selector: &str, nodes: Vec<FakeNode>) {
        self.0
            .routes
            .lock()
            .unwrap()
            .insert(selector.to_string(), nodes);
    }

    pub fn remove_route(&self, selector: &str) {
        self.0.routes.lock().unwrap().remove(selector);
    }

    pub fn set_body_text(&self, text: &str) {
        *self.0.body.lock().unwrap() = text.to_string();
    }
}

impl Dom for FakeDom {
    type Element = FakeNode;

    async fn query(&self, query: &Query) -> AppResult<Vec<FakeNode>> {
        match query {
            Query::Css(pattern) | Query::XPath(pattern) => Ok(self
                .0
                .routes
                .lock()
                .unwrap()
                .get(pattern)
                .cloned()
                .unwrap_or_default()),
            Query::AccessibleName(pattern) => {
                let pool = {
                    self.0
                        .routes
                        .lock()
                        .unwrap()
                        .get(ACCESSIBLE_NAME_POOL)
                        .cloned()
                        .unwrap_or_default()
                };
                filter_by_accessible_name(pool, pattern).await
            }
        }
    }

    async fn eval(&self, js: &str) -> AppResult<JsonValue> {
        self.0.evals.lock().unwrap().push(js.to_string());
        Ok(JsonValue::Null)
    }

    async fn navigate(&self, url: &str) -> AppResult<()> {
        *self.0.url.lock().unwrap() = url.to_string();
        Ok(())
    }

    async fn current_url(&self) -> AppResult<String> {
        Ok(self.0.url.lock().unwrap().clone())
    }

    async fn body_text(&self) -> AppResult<String> {
        Ok(self.0.body.lock().unwrap().clone())
    }
}
