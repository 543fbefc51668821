use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::time::{self, Instant};

use super::{
    config, controller, controller_with, count, entries, item_ids, record_events,
    scroll_bottom_to, three_pages,
};
use crate::bus::{EventContext, Signal};
use crate::controller::LifecycleState;
use crate::event::EventPayload;

#[tokio::test(start_paused = true)]
async fn rapid_scrolls_start_a_single_cycle() {
    let fetcher = three_pages(Duration::from_millis(100));
    let mut controller = controller(&config(600, 150), &fetcher);
    let events = record_events(&mut controller);
    controller.initialize();

    scroll_bottom_to(&mut controller, 300.0);
    let handle = controller.handle();
    controller.scroll();
    for _ in 0..5 {
        assert!(handle.scroll());
    }
    assert!(controller.next());
    assert!(controller.next());
    controller.run_until_idle().await;

    assert_eq!(fetcher.calls(), vec!["/page2"]);
    assert_eq!(count(&events, "next"), 1);
    assert_eq!(count(&events, "render"), 1);
    assert_eq!(item_ids(&controller).len(), 6);
}

#[tokio::test(start_paused = true)]
async fn scroll_signal_is_ignored_while_unbound() {
    let fetcher = three_pages(Duration::ZERO);
    let mut controller = controller(&config(0, 150), &fetcher);
    let events = record_events(&mut controller);
    controller.initialize();
    controller.unbind();
    controller.unbind();

    scroll_bottom_to(&mut controller, 300.0);
    controller.scroll();
    assert!(entries(&events).is_empty());

    controller.bind();
    controller.scroll();
    assert_eq!(entries(&events)[..2], ["scroll", "next /page2"]);
}

#[tokio::test(start_paused = true)]
async fn trailing_scroll_runs_once_after_the_window() {
    let fetcher = three_pages(Duration::ZERO);
    let mut controller = controller(&config(0, 150), &fetcher);
    let started = Instant::now();
    let fired_at = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&fired_at);
    controller
        .on("scroll", move |_: &EventContext<'_>| {
            seen.lock()
                .expect("scroll times lock")
                .push(started.elapsed());
            Signal::Proceed
        })
        .expect("scroll is a known event");
    controller.initialize();

    controller.scroll();
    time::advance(Duration::from_millis(50)).await;
    controller.scroll();
    time::advance(Duration::from_millis(50)).await;
    controller.scroll();
    controller.run_until_idle().await;

    let fired_at = fired_at.lock().expect("scroll times lock").clone();
    assert_eq!(fired_at.len(), 2);
    assert_eq!(fired_at[0], Duration::ZERO);
    assert!(fired_at[1] >= Duration::from_millis(150));
    assert!(fired_at[1] < Duration::from_millis(160));
}

#[tokio::test(start_paused = true)]
async fn scroll_event_reports_offset_and_threshold() {
    let fetcher = three_pages(Duration::ZERO);
    let mut controller = controller(&config(0, 150), &fetcher);
    let readings = Arc::new(Mutex::new(Vec::new()));
    let seen = Arc::clone(&readings);
    controller
        .on("scroll", move |ctx: &EventContext<'_>| {
            if let EventPayload::Scroll { offset, threshold } = ctx.payload {
                seen.lock().expect("readings lock").push((offset, threshold));
            }
            Signal::Proceed
        })
        .expect("scroll is a known event");
    controller.initialize();

    controller.scroll();
    assert_eq!(*readings.lock().expect("readings lock"), vec![(250.0, 300.0)]);
    assert_eq!(controller.state(), LifecycleState::Idle);
    assert!(fetcher.calls().is_empty());
}

#[tokio::test(start_paused = true)]
async fn no_items_means_no_scroll_event_and_no_advance() {
    let fetcher = three_pages(Duration::ZERO);
    let markup = r#"[
      { "tag": "div", "class": "listing" },
      { "tag": "a", "class": "next", "attrs": { "href": "/page2" } }
    ]"#;
    let mut controller = controller_with(&config(0, 150), markup, &fetcher);
    let events = record_events(&mut controller);
    controller.initialize();

    for _ in 0..3 {
        controller.scroll();
        time::advance(Duration::from_millis(200)).await;
        controller.run_until_idle().await;
    }

    assert!(entries(&events).is_empty());
    assert!(fetcher.calls().is_empty());
    assert_eq!(controller.monitor().threshold(controller.dom()), None);
}

#[tokio::test(start_paused = true)]
async fn unbinding_cancels_a_scheduled_trailing_scroll() {
    let fetcher = three_pages(Duration::ZERO);
    let mut controller = controller(&config(0, 150), &fetcher);
    let events = record_events(&mut controller);
    controller.initialize();

    controller.scroll();
    time::advance(Duration::from_millis(50)).await;
    controller.scroll();
    controller.unbind();
    assert!(controller.is_settled());

    time::advance(Duration::from_millis(200)).await;
    controller.pump();
    assert_eq!(count(&events, "scroll"), 1);
}

#[test]
fn throttled_scroll_outside_a_runtime_drops_the_trailing_run() {
    let fetcher = three_pages(Duration::ZERO);
    let mut controller = controller(&config(0, 150), &fetcher);
    let events = record_events(&mut controller);
    controller.initialize();

    controller.scroll();
    controller.scroll();
    assert_eq!(count(&events, "scroll"), 1);
    assert!(controller.is_settled());
    assert_eq!(controller.state(), LifecycleState::Idle);
}
