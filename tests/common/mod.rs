#![allow(dead_code)]

pub mod fake_dom;

pub use fake_dom::{FakeDom, FakeNode};

// 测试共用的页面选择器（与被测代码使用的字符串保持一致）
pub const CARDS: &str = ".scaffold-layout__list-item";
pub const APPLIED_FOOTER: &str = ".job-card-container__footer-job-state";
pub const TITLE_PRIMARY: &str = ".artdeco-entity-lockup__title .job-card-container__link";
pub const SUBTITLE: &str = ".artdeco-entity-lockup__subtitle";
pub const DESCRIPTION: &str = "[class*=\"jobs-box__html-content\"]";
pub const NEXT_BUTTON: &str =
    "button.jobs-search-pagination__button--next[aria-label*=\"next\"]:not([disabled])";
pub const SAVE_DIALOG: &str = "[data-test-modal=\"\"][role=\"alertdialog\"]";
pub const SAVE_DIALOG_TITLE: &str = "h2[data-test-dialog-title]";
pub const SECONDARY_BUTTON: &str = "button[data-test-dialog-secondary-btn]";
pub const NAME_POOL: &str = "button, [role=\"button\"]";
pub const APPLY_MODAL: &str = ".jobs-easy-apply-modal";
pub const INLINE_FEEDBACK: &str = ".artdeco-inline-feedback__message";
pub const RADIO_FIELDSET: &str =
    "fieldset[data-test-form-builder-radio-button-form-component=\"true\"]";
pub const FOLLOW_FOOTER: &str = ".job-details-easy-apply-footer__section";
pub const FOLLOW_CHECKBOX: &str = "#follow-company-checkbox";

/// 一张最小可用的职位卡片：标题链接 + 可选副标题
pub fn job_card(title: &str, subtitle: Option<&str>) -> (FakeNode, FakeNode) {
    let link = FakeNode::new("a").with_text(title);
    let mut card = FakeNode::new("li").with_route(TITLE_PRIMARY, vec![link.clone()]);
    if let Some(subtitle) = subtitle {
        card = card.with_route(SUBTITLE, vec![FakeNode::new("div").with_text(subtitle)]);
    }
    (card, link)
}

/// 带"已申请"脚标的卡片
pub fn applied_card(title: &str) -> FakeNode {
    let (card, _) = job_card(title, None);
    card.with_route(
        APPLIED_FOOTER,
        vec![FakeNode::new("div").with_text("Applied 2 days ago")],
    )
}

/// 快速申请入口按钮，注册在入口候选选择器和名称池两处
pub fn with_easy_apply_entry(dom: FakeDom) -> (FakeDom, FakeNode) {
    let entry = FakeNode::new("button").with_attr("aria-label", "Easy Apply to Acme Corp");
    let dom = dom
        .with_route("button[aria-label*=\"Easy Apply\"]", vec![entry.clone()])
        .with_route(NAME_POOL, vec![entry.clone()]);
    (dom, entry)
}
