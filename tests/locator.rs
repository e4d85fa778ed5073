//! 弹性定位的回退顺序与可交互性判定

mod common;

use std::time::Duration;

use common::{FakeDom, FakeNode, NAME_POOL};
use easy_apply_bot::dom::DomElement;
use easy_apply_bot::{Locator, Query};

const IMMEDIATE: Duration = Duration::ZERO;

fn locator() -> Locator {
    Locator::new(Duration::ZERO)
}

#[tokio::test]
async fn first_query_wins_when_present_and_interactable() {
    let a = FakeNode::new("button").with_text("A");
    let b = FakeNode::new("button").with_text("B");
    let dom = FakeDom::new()
        .with_route(".primary", vec![a.clone()])
        .with_route(".secondary", vec![b.clone()])
        // 无关内容不应影响结果
        .with_route(".noise", vec![FakeNode::new("div").with_text("noise")]);

    let queries = [Query::css(".primary"), Query::css(".secondary")];
    let found = locator()
        .locate(&dom, None, &queries, IMMEDIATE)
        .await
        .unwrap()
        .expect("应命中第一个查询");
    assert_eq!(found.text_now(), "A");
}

#[tokio::test]
async fn falls_through_to_later_queries_when_earlier_are_unusable() {
    let hidden = FakeNode::new("button").with_text("A").hidden();
    let disabled = FakeNode::new("button").with_text("B").disabled();
    let usable = FakeNode::new("button").with_text("C");
    let dom = FakeDom::new()
        .with_route(".a", vec![hidden])
        .with_route(".b", vec![disabled])
        .with_route(".c", vec![usable]);

    let queries = [Query::css(".a"), Query::css(".b"), Query::css(".c")];
    let found = locator()
        .locate(&dom, None, &queries, IMMEDIATE)
        .await
        .unwrap()
        .expect("应回退到第三个查询");
    assert_eq!(found.text_now(), "C");
}

#[tokio::test]
async fn absence_is_none_not_an_error() {
    let dom = FakeDom::new();
    let queries = [Query::css(".a"), Query::css(".b")];
    let found = locator().locate(&dom, None, &queries, IMMEDIATE).await.unwrap();
    assert!(found.is_none());
}

#[tokio::test]
async fn skips_non_interactable_match_within_same_query() {
    // 同一查询返回多个匹配时，取第一个可交互的
    let hidden = FakeNode::new("button").with_text("hidden").hidden();
    let usable = FakeNode::new("button").with_text("usable");
    let dom = FakeDom::new().with_route(".x", vec![hidden, usable]);

    let found = locator()
        .locate(&dom, None, &[Query::css(".x")], IMMEDIATE)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.text_now(), "usable");
}

#[tokio::test]
async fn element_scope_is_respected() {
    let inner = FakeNode::new("button").with_text("inner");
    let root = FakeNode::new("div").with_route(".target", vec![inner]);
    // 页面级同名路由放一个不同的元素，确保走的是元素作用域
    let dom = FakeDom::new().with_route(".target", vec![FakeNode::new("button").with_text("outer")]);

    let found = locator()
        .locate(&dom, Some(&root), &[Query::css(".target")], IMMEDIATE)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found.text_now(), "inner");
}

#[tokio::test]
async fn accessible_name_matches_aria_label_and_text() {
    let by_label = FakeNode::new("button").with_attr("aria-label", "Easy Apply to Acme");
    let by_text = FakeNode::new("button").with_text("Easy Apply");
    let unrelated = FakeNode::new("button").with_text("Save");
    let dom = FakeDom::new().with_route(NAME_POOL, vec![unrelated, by_label.clone(), by_text]);

    let found = locator()
        .locate(&dom, None, &[Query::name("Easy Apply")], IMMEDIATE)
        .await
        .unwrap()
        .unwrap();
    // 池中第一个名称命中的是 aria-label 那个
    assert_eq!(found.attr("aria-label").await.unwrap().as_deref(), Some("Easy Apply to Acme"));
}

#[tokio::test]
async fn locate_all_returns_every_interactable_match_of_first_hit() {
    let usable_a = FakeNode::new("button").with_text("A");
    let usable_b = FakeNode::new("button").with_text("B");
    let hidden = FakeNode::new("button").with_text("C").hidden();
    let dom = FakeDom::new()
        .with_route(".group", vec![usable_a, hidden, usable_b])
        .with_route(".fallback", vec![FakeNode::new("button").with_text("D")]);

    let queries = [Query::css(".group"), Query::css(".fallback")];
    let found = locator()
        .locate_all(&dom, None, &queries, IMMEDIATE)
        .await
        .unwrap();
    // 第一个产生结果的查询胜出，隐藏的匹配被剔除
    assert_eq!(found.len(), 2);
    assert_eq!(found[0].text_now(), "A");
    assert_eq!(found[1].text_now(), "B");
}

#[tokio::test]
async fn wait_until_clickable_times_out_cleanly() {
    let dom = FakeDom::new();
    let locator = Locator::new(Duration::from_millis(5));
    let started = std::time::Instant::now();
    let found = locator
        .wait_until_clickable(&dom, None, &Query::css(".never"), Duration::from_millis(40))
        .await
        .unwrap();
    assert!(found.is_none());
    assert!(started.elapsed() >= Duration::from_millis(40));
}

#[tokio::test]
async fn wait_until_clickable_picks_up_late_elements() {
    let dom = FakeDom::new();
    let background = dom.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(30)).await;
        background.set_route(".late", vec![FakeNode::new("button").with_text("late")]);
    });

    let locator = Locator::new(Duration::from_millis(5));
    let found = locator
        .wait_until_clickable(&dom, None, &Query::css(".late"), Duration::from_secs(2))
        .await
        .unwrap();
    assert!(found.is_some());
}
