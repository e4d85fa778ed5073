//! 申请向导状态机：终态、步数上限、字段对账

mod common;

use common::*;
use easy_apply_bot::models::autofill::ChoiceOption;
use easy_apply_bot::services::autofill_kb::{ChoiceKind, ChoiceObservation};
use easy_apply_bot::{ApplicationWizard, AutofillKb, FailureReason, JobCtx, Pace, WizardOutcome};

fn wizard() -> ApplicationWizard {
    ApplicationWizard::with_tuning(10, Pace::instant())
}

fn ctx() -> JobCtx {
    JobCtx::new(1, 1, "Test Job".to_string())
}

fn empty_kb() -> AutofillKb {
    AutofillKb::empty("unused-kb.json")
}

/// 可关闭的保存确认层
fn save_dialog(dom: &FakeDom) -> FakeNode {
    let discard = FakeNode::new("button").with_text("Discard");
    let dialog = FakeNode::new("div")
        .with_route(
            SAVE_DIALOG_TITLE,
            vec![FakeNode::new("h2").with_text("Save this application?")],
        )
        .with_route(SECONDARY_BUTTON, vec![discard.clone()]);
    let dom = dom.clone();
    discard.set_on_click(move || dom.remove_route(SAVE_DIALOG));
    dialog
}

#[tokio::test]
async fn save_dialog_before_start_means_application_in_flight() {
    let dom = FakeDom::new();
    let dialog = save_dialog(&dom);
    dom.set_route(SAVE_DIALOG, vec![dialog]);

    let outcome = wizard().run(&dom, &mut empty_kb(), &ctx()).await.unwrap();
    assert_eq!(outcome, WizardOutcome::Success);
    // 弹窗被丢弃而不是留在原地
    assert!(dom.0.routes.lock().unwrap().get(SAVE_DIALOG).is_none());
}

#[tokio::test]
async fn already_applied_indicator_short_circuits() {
    let dom = FakeDom::new().with_route(
        INLINE_FEEDBACK,
        vec![FakeNode::new("div").with_text("You applied 3 days ago")],
    );

    let outcome = wizard().run(&dom, &mut empty_kb(), &ctx()).await.unwrap();
    assert_eq!(outcome, WizardOutcome::AlreadyApplied);
}

#[tokio::test]
async fn external_apply_button_is_rejected() {
    // 名字里只有 "Apply" 的是外链申请，不是快速申请入口
    let external = FakeNode::new("button").with_attr("aria-label", "Apply");
    let dom = FakeDom::new()
        .with_route(".jobs-apply-button", vec![external.clone()])
        .with_route(NAME_POOL, vec![external.clone()]);

    let outcome = wizard().run(&dom, &mut empty_kb(), &ctx()).await.unwrap();
    assert_eq!(
        outcome,
        WizardOutcome::Failure(FailureReason::NoEntryPoint)
    );
    assert_eq!(external.clicks(), 0);
}

#[tokio::test]
async fn step_loop_terminates_at_bound_when_nothing_ever_appears() {
    // 点了入口之后页面什么都不给：既无弹层也无成功提示
    let (dom, entry) = with_easy_apply_entry(FakeDom::new());

    let wizard = ApplicationWizard::with_tuning(3, Pace::instant());
    let outcome = wizard.run(&dom, &mut empty_kb(), &ctx()).await.unwrap();
    assert_eq!(outcome, WizardOutcome::Failure(FailureReason::StepLimit));
    assert_eq!(entry.clicks(), 1);
}

#[tokio::test]
async fn completion_text_without_form_is_success() {
    let (dom, _entry) = with_easy_apply_entry(FakeDom::new());
    let modal = FakeNode::new("div").with_text("Your application was submitted!");
    dom.set_route(APPLY_MODAL, vec![modal]);

    let outcome = wizard().run(&dom, &mut empty_kb(), &ctx()).await.unwrap();
    assert_eq!(outcome, WizardOutcome::Success);
}

#[tokio::test]
async fn no_action_control_fails_after_scroll_sweeps() {
    let (dom, _entry) = with_easy_apply_entry(FakeDom::new());
    let modal = FakeNode::new("div").with_text("Add your contact info");
    dom.set_route(APPLY_MODAL, vec![modal.clone()]);

    let outcome = wizard().run(&dom, &mut empty_kb(), &ctx()).await.unwrap();
    assert_eq!(
        outcome,
        WizardOutcome::Failure(FailureReason::NoActionControl)
    );
    // 至少做过滚动扫掠（顶、中、底）
    let scripts = modal.0.scripts.lock().unwrap().clone();
    assert!(scripts.iter().filter(|s| s.contains("scrollTop")).count() >= 3);
}

#[tokio::test]
async fn discard_after_advance_means_flow_rejected() {
    let (dom, _entry) = with_easy_apply_entry(FakeDom::new());
    let next = FakeNode::new("button").with_attr("aria-label", "Continue to next step");
    let modal = FakeNode::new("div")
        .with_route(
            "button[aria-label=\"Continue to next step\"]",
            vec![next.clone()],
        )
        .with_route(NAME_POOL, vec![next.clone()]);
    dom.set_route(APPLY_MODAL, vec![modal]);
    dom.set_route(
        SECONDARY_BUTTON,
        vec![FakeNode::new("button").with_text("Discard")],
    );

    let outcome = wizard().run(&dom, &mut empty_kb(), &ctx()).await.unwrap();
    assert_eq!(outcome, WizardOutcome::Failure(FailureReason::FlowRejected));
    assert_eq!(next.clicks(), 1);
}

#[tokio::test]
async fn form_fields_are_reconciled_and_submitted() {
    let dir = tempfile::tempdir().unwrap();
    let kb_path = dir.path().join("form_autofill.json");
    let mut kb = AutofillKb::empty(&kb_path);

    // 知识库预置：文本记忆值 + 单选组偏好 yes
    kb.record_text("Years of experience", "5");
    kb.merge_choice(
        ChoiceKind::Radio,
        &ChoiceObservation {
            label: "Visa sponsorship?".to_string(),
            options: vec![
                ChoiceOption { value: "yes".into(), text: "Yes".into(), selected: true },
                ChoiceOption { value: "no".into(), text: "No".into(), selected: false },
            ],
            selected: Some("yes".to_string()),
        },
    );

    // 表单：文本（值不符）、复选框（未勾）、首见文本、单选组（当前 no）、下拉框（停在哨兵）
    let years = FakeNode::new("input")
        .with_attr("type", "text")
        .with_attr("name", "Years of experience")
        .with_attr("value", "3");
    let optin = FakeNode::new("input").with_attr("type", "checkbox");
    let phone = FakeNode::new("input")
        .with_attr("type", "text")
        .with_attr("aria-label", "Phone")
        .with_attr("value", "555");

    let radio_yes = FakeNode::new("input")
        .with_attr("type", "radio")
        .with_attr("value", "yes")
        .with_attr("id", "visa-yes");
    let radio_no = FakeNode::new("input")
        .with_attr("type", "radio")
        .with_attr("value", "no")
        .with_attr("id", "visa-no")
        .with_selected(true);
    let legend = FakeNode::new("legend").with_route(
        "span[aria-hidden=\"true\"]",
        vec![FakeNode::new("span").with_text("Visa sponsorship?")],
    );
    let fieldset = FakeNode::new("fieldset")
        .with_route("legend", vec![legend])
        .with_route(
            "input[type=\"radio\"]",
            vec![radio_yes.clone(), radio_no.clone()],
        )
        .with_route("label[for=\"visa-yes\"]", vec![FakeNode::new("label").with_text("Yes")])
        .with_route("label[for=\"visa-no\"]", vec![FakeNode::new("label").with_text("No")]);

    let select = FakeNode::new("select").with_attr("id", "experience").with_route(
        "option",
        vec![
            FakeNode::new("option")
                .with_attr("value", "Select an option")
                .with_text("Select an option")
                .with_selected(true),
            FakeNode::new("option").with_attr("value", "1-2").with_text("1-2"),
            FakeNode::new("option").with_attr("value", "3-5").with_text("3-5"),
        ],
    );

    let form = FakeNode::new("form")
        .with_route("input, textarea", vec![years.clone(), optin.clone(), phone.clone()])
        .with_route(RADIO_FIELDSET, vec![fieldset])
        .with_route("select", vec![select])
        .with_route(
            "label[for=\"experience\"]",
            vec![FakeNode::new("label").with_text("Experience level")],
        );

    let submit = FakeNode::new("button").with_attr("aria-label", "Submit application");
    let modal = FakeNode::new("div")
        .with_route("form", vec![form])
        .with_route(
            "button[aria-label=\"Submit application\"]",
            vec![submit.clone()],
        )
        .with_route(NAME_POOL, vec![submit.clone()]);

    let follow = FakeNode::new("input")
        .with_attr("type", "checkbox")
        .with_attr("id", "follow-company-checkbox")
        .with_selected(true);
    let footer = FakeNode::new("div").with_route(FOLLOW_CHECKBOX, vec![follow.clone()]);

    let (dom, entry) = with_easy_apply_entry(FakeDom::new());
    dom.set_route(APPLY_MODAL, vec![modal]);
    dom.set_route(FOLLOW_FOOTER, vec![footer]);

    let outcome = wizard().run(&dom, &mut kb, &ctx()).await.unwrap();
    assert_eq!(outcome, WizardOutcome::Success);
    assert_eq!(entry.clicks(), 1);
    assert_eq!(submit.clicks(), 1);

    // 文本字段被回填成记忆值
    assert_eq!(years.value_now(), "5");
    assert_eq!(years.keys(), vec!["5".to_string()]);
    // 首见字段只记录、不改写
    assert_eq!(kb.text_value("Phone"), Some("555"));
    assert_eq!(phone.value_now(), "555");
    // 从未见过的复选框必须被勾上
    assert!(optin.checked_now());
    // 单选组切回记忆值
    assert_eq!(radio_yes.clicks(), 1);
    assert!(radio_yes.checked_now());
    // 下拉框首见：建档且哨兵不当默认值
    let dropdown = &kb.document().dropdowns[0];
    assert_eq!(dropdown.label, "Experience level");
    assert_eq!(dropdown.default_value, "1-2");
    // 单选组记录刷新：计数 +1，默认值保持用户偏好
    let radio_record = &kb.document().radio_buttons[0];
    assert_eq!(radio_record.count, 2);
    assert_eq!(radio_record.default_value, "yes");
    // 提交前取消了"关注公司"
    assert!(!follow.checked_now());
    // 知识库变更已经落盘
    assert!(kb_path.exists());
}

#[tokio::test]
async fn known_text_value_is_left_untouched() {
    let dir = tempfile::tempdir().unwrap();
    let mut kb = AutofillKb::empty(dir.path().join("form_autofill.json"));
    kb.record_text("Years of experience", "5");

    let years = FakeNode::new("input")
        .with_attr("type", "text")
        .with_attr("name", "Years of experience")
        .with_attr("value", "5");
    let form = FakeNode::new("form").with_route("input, textarea", vec![years.clone()]);
    let submit = FakeNode::new("button").with_attr("aria-label", "Submit application");
    let modal = FakeNode::new("div")
        .with_route("form", vec![form])
        .with_route(
            "button[aria-label=\"Submit application\"]",
            vec![submit.clone()],
        )
        .with_route(NAME_POOL, vec![submit.clone()]);

    let (dom, _entry) = with_easy_apply_entry(FakeDom::new());
    dom.set_route(APPLY_MODAL, vec![modal]);

    let outcome = wizard().run(&dom, &mut kb, &ctx()).await.unwrap();
    assert_eq!(outcome, WizardOutcome::Success);
    // 值已一致：不重打键、不改库
    assert!(years.keys().is_empty());
    assert_eq!(years.value_now(), "5");
    assert_eq!(kb.text_value("Years of experience"), Some("5"));
}
