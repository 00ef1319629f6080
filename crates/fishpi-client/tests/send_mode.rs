#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

mod common;

use std::sync::Arc;

use fishpi_client::bus::{handler_fn, EventBus, EventTag};
use fishpi_client::chat::SendMode;
use fishpi_client::liveness::LivenessTracker;
use fishpi_core::error::FishPiError;
use fishpi_core::model::RewardOutcome;
use tokio::sync::mpsc;

use common::{Call, Lines, MockApi};

fn mode(api: MockApi) -> (SendMode, Arc<Lines>, Arc<EventBus>) {
    let lines = Lines::new();
    let bus = Arc::new(EventBus::new("send"));
    let sm = SendMode::new(Arc::new(api), bus.clone(), lines.clone());
    (sm, lines, bus)
}

#[tokio::test]
async fn topic_and_barrage_are_wrapped() {
    let (api, mut calls) = MockApi::new();
    let (sm, _lines, _bus) = mode(api);

    sm.handle_input("topic-摸鱼").await;
    sm.handle_input("barrage-冲").await;
    sm.handle_input("  plain text  ").await;
    sm.handle_input("   ").await;

    assert_eq!(calls.recv().await.unwrap(), Call::SendChat("[setdiscuss]摸鱼[/setdiscuss]".into()));
    assert_eq!(
        calls.recv().await.unwrap(),
        Call::SendChat(r##"[barrager]{"color":"#66CCFF","content":"冲"}[/barrager]"##.into())
    );
    assert_eq!(calls.recv().await.unwrap(), Call::SendChat("plain text".into()));
    assert!(calls.try_recv().is_err());
}

#[tokio::test]
async fn liveness_is_shown_with_two_decimals() {
    let (api, _calls) = MockApi::new();
    *api.liveness.lock().unwrap() = Ok(33.4);
    let (sm, lines, _bus) = mode(api);
    sm.handle_input("liveness").await;
    assert_eq!(lines.last().as_deref(), Some("当前活跃度：33.40"));
}

#[tokio::test]
async fn liveness_failure_is_shown() {
    let (api, _calls) = MockApi::new();
    *api.liveness.lock().unwrap() = Err(FishPiError::Transport("down".into()));
    let (sm, lines, _bus) = mode(api);
    sm.handle_input("liveness").await;
    assert!(lines.last().unwrap().starts_with("获取活跃度失败："));
}

#[tokio::test]
async fn reward_is_claimed_once() {
    let (api, mut calls) = MockApi::new();
    let (sm, lines, _bus) = mode(api);
    sm.handle_input("reward").await;
    assert_eq!(calls.recv().await.unwrap(), Call::RewardCollected);
    assert_eq!(calls.recv().await.unwrap(), Call::ClaimReward);
    assert_eq!(lines.last().as_deref(), Some("领取到30积分"));

    let (mut api, mut calls) = MockApi::new();
    api.reward_collected = true;
    api.reward = RewardOutcome::AlreadyClaimed;
    let (sm, lines, _bus) = mode(api);
    sm.handle_input("reward").await;
    assert_eq!(calls.recv().await.unwrap(), Call::RewardCollected);
    assert!(calls.try_recv().is_err());
    assert_eq!(lines.last().as_deref(), Some("已经领取了昨日活跃奖励"));
}

#[tokio::test]
async fn breezemoon_commands() {
    let (api, mut calls) = MockApi::new();
    let (sm, lines, _bus) = mode(api);

    sm.handle_input("bb-user-").await;
    assert_eq!(lines.last().as_deref(), Some("用户名不能为空"));

    sm.handle_input("bb-user-bob-5-2").await;
    assert_eq!(calls.recv().await.unwrap(), Call::UserBreezeMoons("bob".into(), 2, 5));

    sm.handle_input("bb-晚安").await;
    assert_eq!(calls.recv().await.unwrap(), Call::SendBreezeMoon("晚安".into()));
}

#[tokio::test]
async fn unknown_user_error_is_shown() {
    let (api, _calls) = MockApi::new();
    let (sm, lines, _bus) = mode(api);
    sm.handle_input("info-nobody").await;
    assert!(lines.last().unwrap().contains("nobody"));
}

#[tokio::test]
async fn stick_publishes_elves_event() {
    let (api, _calls) = MockApi::new();
    let (sm, _lines, bus) = mode(api);
    let (tx, mut rx) = mpsc::unbounded_channel();
    bus.subscribe(
        EventTag::ElvesStick,
        handler_fn(move |ev| {
            let tx = tx.clone();
            async move {
                let _ = tx.send(ev);
            }
        }),
    );
    sm.handle_input("stick").await;
    assert_eq!(rx.recv().await.unwrap().tag(), EventTag::ElvesStick);
}

#[tokio::test]
async fn sent_chat_credits_liveness_and_failed_does_not() {
    let (api, _calls) = MockApi::new();
    let lines = Lines::new();
    let tracker = Arc::new(LivenessTracker::new(0.0, None, lines.clone()));
    let sm = SendMode::new(Arc::new(api), Arc::new(EventBus::new("send")), lines.clone())
        .with_tracker(tracker.clone());
    sm.handle_input("hi").await;
    assert!(tracker.score() > 0.0);

    let (mut api, _calls) = MockApi::new();
    api.fail_sends = true;
    let tracker = Arc::new(LivenessTracker::new(0.0, None, lines.clone()));
    let sm = SendMode::new(Arc::new(api), Arc::new(EventBus::new("send")), lines.clone())
        .with_tracker(tracker.clone());
    sm.handle_input("hi").await;
    assert_eq!(tracker.score(), 0.0);
    assert!(lines.last().unwrap().contains("too fast"));
}
