//! Integration tests for the playback scheduler.
//!
//! The player is driven with a scripted synthesis service, an output that
//! completes on command (or after a short delay) and a sink that records
//! every notification. No audio hardware or network access is needed.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{
    MockOutput, MockSynth, RecordingSink, SinkEvent, call_id, eventually, segments, segments_in,
};
use readaloud_core::{Backend, PlaybackConfig, PlayerStatus, Segmentation, SynthesisPort};
use readaloud_voice::{
    DecodeCache, PlayerConfig, PlayerError, PlayerHandle, PlayerPorts, SegmentError,
    SynthesisGate, spawn_player,
};

// ── Helpers ────────────────────────────────────────────────────────

fn spawn(
    segs: Segmentation,
    synth: &Arc<MockSynth>,
    output: &Arc<MockOutput>,
    settings: PlayerConfig,
) -> (PlayerHandle, Arc<RecordingSink>) {
    let sink = RecordingSink::new();
    let handle = spawn_player(
        segs,
        PlaybackConfig::default(),
        PlayerPorts {
            synthesis: Arc::clone(synth) as Arc<dyn SynthesisPort>,
            output: Arc::clone(output) as _,
            sink: Arc::clone(&sink) as _,
        },
        settings,
    );
    (handle, sink)
}

const WINDOW: PlayerConfig = PlayerConfig {
    keep_behind: 1,
    prefetch_ahead: 2,
};

fn five() -> Segmentation {
    segments(&["One.", "Two.", "Three.", "Four.", "Five."])
}

// ── Scenarios ──────────────────────────────────────────────────────

#[tokio::test]
async fn hello_world_plays_through_and_finishes() {
    let synth = MockSynth::open();
    let output = MockOutput::auto(Duration::from_millis(10));
    let (player, sink) = spawn(segments(&["Hello.", "World."]), &synth, &output, WINDOW);

    let snap = player.play(Some(0)).await.unwrap();
    assert!(snap.playing);
    assert_eq!(snap.index, 0);
    // Position is reported before any audio exists.
    assert_eq!(
        sink.events()[..2],
        [
            SinkEvent::Position(0),
            SinkEvent::Status(PlayerStatus::Loading { index: 0 })
        ]
    );

    eventually("finish", || sink.finished() == 1).await;

    assert_eq!(sink.started(), vec![0, 1]);
    assert_eq!(synth.texts(), vec!["Hello.", "World."]);
    assert_eq!(sink.positions(), vec![0, 1, 0]);

    let snap = player.snapshot().await.unwrap();
    assert!(!snap.playing);
    assert_eq!(snap.index, 0);
    assert_eq!(snap.status, PlayerStatus::Finished);
}

#[tokio::test]
async fn segment_start_order_is_strictly_increasing() {
    let synth = MockSynth::open();
    let output = MockOutput::auto(Duration::from_millis(5));
    let texts = ["a.", "b.", "c.", "d.", "e.", "f.", "g."];
    let (player, sink) = spawn(segments(&texts), &synth, &output, PlayerConfig::default());

    player.play(None).await.unwrap();
    eventually("finish", || sink.finished() == 1).await;

    assert_eq!(sink.started(), (0..texts.len()).collect::<Vec<_>>());
    assert_eq!(synth.calls().len(), texts.len());
}

#[tokio::test]
async fn synthesis_is_single_flight() {
    let synth = MockSynth::held();
    let output = MockOutput::auto(Duration::from_millis(2));
    let (player, sink) = spawn(five(), &synth, &output, PlayerConfig::default());

    player.play(Some(0)).await.unwrap();
    for _ in 0..5 {
        tokio::time::sleep(Duration::from_millis(10)).await;
        synth.release(1);
    }
    eventually("finish", || sink.finished() == 1).await;

    assert_eq!(synth.peak(), 1);
    assert_eq!(synth.texts(), vec!["One.", "Two.", "Three.", "Four.", "Five."]);
}

#[tokio::test]
async fn seek_discards_the_pending_segment() {
    let synth = MockSynth::held();
    let output = MockOutput::manual();
    let (player, sink) = spawn(five(), &synth, &output, WINDOW);

    player.play(Some(0)).await.unwrap();
    eventually("first request", || !synth.calls().is_empty()).await;

    let snap = player.seek(3).await.unwrap();
    assert_eq!(snap.index, 3);
    assert!(snap.playing);

    synth.release(10);
    eventually("segment 3 to start", || sink.started() == vec![3]).await;
    tokio::time::sleep(Duration::from_millis(30)).await;

    assert_eq!(sink.started(), vec![3]);
    assert_eq!(output.plays(), 1);
    assert!(sink.failures().is_empty());
    assert_eq!(player.snapshot().await.unwrap().index, 3);
}

#[tokio::test]
async fn playback_window_evicts_old_entries() {
    let synth = MockSynth::open();
    let output = MockOutput::manual();
    let texts = ["0.", "1.", "2.", "3.", "4.", "5.", "6.", "7."];
    let (player, sink) = spawn(segments(&texts), &synth, &output, WINDOW);

    player.play(Some(0)).await.unwrap();
    for m in 0..texts.len() {
        eventually("next segment", || sink.started().len() == m + 1).await;
        let snap = player.snapshot().await.unwrap();
        let floor = m.saturating_sub(WINDOW.keep_behind);
        assert!(
            snap.cached.iter().all(|&i| i >= floor),
            "entry below {floor} survived at {m}: {:?}",
            snap.cached
        );
        assert!(output.finish());
    }
    eventually("finish", || sink.finished() == 1).await;
}

#[tokio::test]
async fn failed_segment_is_reported_once_and_skipped() {
    let synth = MockSynth::open();
    synth.fail_on("Two.");
    let output = MockOutput::auto(Duration::from_millis(5));
    let (player, sink) = spawn(segments(&["One.", "Two.", "Three."]), &synth, &output, WINDOW);

    player.play(Some(0)).await.unwrap();
    eventually("finish", || sink.finished() == 1).await;

    assert_eq!(sink.started(), vec![0, 2]);
    assert_eq!(sink.failures(), vec![1]);
}

#[tokio::test]
async fn consecutive_failures_stop_at_the_first_failed_segment() {
    let texts: Vec<String> = (1..=40).map(|n| format!("Sentence {n}.")).collect();
    let refs: Vec<&str> = texts.iter().map(String::as_str).collect();
    let synth = MockSynth::open();
    for text in &refs {
        synth.fail_on(text);
    }
    let output = MockOutput::manual();
    let (player, sink) = spawn(segments(&refs), &synth, &output, WINDOW);

    player.play(Some(30)).await.unwrap();
    eventually("give up", || {
        matches!(
            sink.statuses().last(),
            Some(PlayerStatus::NoVoiceAvailable { .. })
        )
    })
    .await;

    let snap = player.snapshot().await.unwrap();
    assert_eq!(sink.failures(), vec![30, 31, 32]);
    assert_eq!(sink.finished(), 0);
    assert_eq!(sink.positions().last(), Some(&30));
    assert_eq!(snap.index, 30);
    assert!(!snap.playing);
    assert_eq!(
        snap.status,
        PlayerStatus::NoVoiceAvailable {
            backend: snap.config.backend
        }
    );
    assert_eq!(output.plays(), 0);
}

#[tokio::test]
async fn scattered_failures_keep_skipping() {
    let synth = MockSynth::open();
    synth.fail_on("Two.");
    synth.fail_on("Four.");
    let output = MockOutput::auto(Duration::from_millis(5));
    let (player, sink) = spawn(five(), &synth, &output, WINDOW);

    player.play(Some(0)).await.unwrap();
    eventually("finish", || sink.finished() == 1).await;

    assert_eq!(sink.started(), vec![0, 2, 4]);
    assert_eq!(sink.failures(), vec![1, 3]);
}

#[tokio::test]
async fn panicking_synthesis_is_reported_and_skipped() {
    let synth = MockSynth::open();
    synth.panic_on("Boom.");
    let output = MockOutput::auto(Duration::from_millis(5));
    let (player, sink) = spawn(segments(&["Boom.", "Fine."]), &synth, &output, WINDOW);

    player.play(Some(0)).await.unwrap();
    eventually("finish", || sink.finished() == 1).await;

    assert_eq!(sink.failures(), vec![0]);
    assert_eq!(sink.started(), vec![1]);
    assert_eq!(player.snapshot().await.unwrap().in_flight, 0);

    // Nothing stale is coalesced: replaying asks the service again.
    player.play(Some(0)).await.unwrap();
    eventually("second finish", || sink.finished() == 2).await;
    let boom_calls = synth.texts().iter().filter(|t| *t == "Boom.").count();
    assert_eq!(boom_calls, 2);
    assert_eq!(sink.failures(), vec![0, 0]);
}

#[tokio::test]
async fn cancelled_fetch_is_retried_once() {
    let synth = MockSynth::open();
    synth.cancel_next("One.", 1);
    let output = MockOutput::auto(Duration::from_millis(5));
    let (player, sink) = spawn(segments(&["One.", "Two."]), &synth, &output, WINDOW);

    player.play(Some(0)).await.unwrap();
    eventually("finish", || sink.finished() == 1).await;

    assert_eq!(sink.started(), vec![0, 1]);
    assert!(sink.failures().is_empty());
    let one_calls = synth.texts().iter().filter(|t| *t == "One.").count();
    assert_eq!(one_calls, 2);
}

#[tokio::test]
async fn repeatedly_cancelled_fetch_is_reported_as_failed() {
    let synth = MockSynth::open();
    synth.cancel_next("One.", 10);
    let output = MockOutput::auto(Duration::from_millis(5));
    let (player, sink) = spawn(segments(&["One.", "Two."]), &synth, &output, WINDOW);

    player.play(Some(0)).await.unwrap();
    eventually("finish", || sink.finished() == 1).await;

    assert_eq!(sink.failures(), vec![0]);
    assert_eq!(sink.started(), vec![1]);
    let one_calls = synth.texts().iter().filter(|t| *t == "One.").count();
    assert_eq!(one_calls, 2);
}

#[tokio::test]
async fn voice_change_restarts_current_segment() {
    let synth = MockSynth::open();
    let output = MockOutput::manual();
    let (player, sink) = spawn(five(), &synth, &output, WINDOW);

    player.play(Some(0)).await.unwrap();
    for n in 1..=2 {
        eventually("segment start", || sink.started().len() == n).await;
        assert!(output.finish());
    }
    eventually("segment 2", || sink.started() == vec![0, 1, 2]).await;
    let before = player.snapshot().await.unwrap();

    let after = player.set_voice("x").await.unwrap();
    assert_eq!(after.index, 2);
    assert!(after.playing);
    assert!(after.token > before.token);
    assert_eq!(after.config.voice, "x");
    assert!(after.cached.is_empty());

    eventually("restart at 2", || sink.started() == vec![0, 1, 2, 2]).await;
    let restarted = synth
        .calls()
        .into_iter()
        .rfind(|c| c.text == "Three.")
        .unwrap();
    assert_eq!(restarted.config.voice, "x");
    assert!(sink.positions().ends_with(&[2, 2]));
}

#[tokio::test]
async fn same_config_is_a_no_op() {
    let synth = MockSynth::open();
    let output = MockOutput::manual();
    let (player, _sink) = spawn(five(), &synth, &output, WINDOW);

    let before = player.snapshot().await.unwrap();
    let after = player.change_config(PlaybackConfig::default()).await.unwrap();
    assert_eq!(before.token, after.token);
}

#[tokio::test]
async fn config_change_while_idle_does_not_start_audio() {
    let synth = MockSynth::open();
    let output = MockOutput::manual();
    let (player, _sink) = spawn(five(), &synth, &output, WINDOW);

    let snap = player.set_speed(1.5).await.unwrap();
    assert!(!snap.playing);
    assert!((snap.config.speed - 1.5).abs() < f32::EPSILON);
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(synth.calls().is_empty());

    player.play(None).await.unwrap();
    eventually("request", || !synth.calls().is_empty()).await;
    assert!((synth.calls()[0].config.speed - 1.5).abs() < f32::EPSILON);
}

// ── Commands ───────────────────────────────────────────────────────

#[tokio::test]
async fn pause_detaches_completion_and_resume_restarts_segment() {
    let synth = MockSynth::open();
    let output = MockOutput::manual();
    let (player, sink) = spawn(five(), &synth, &output, WINDOW);

    player.play(Some(1)).await.unwrap();
    eventually("segment 1", || sink.started() == vec![1]).await;

    let snap = player.pause().await.unwrap();
    assert!(!snap.playing);
    assert_eq!(snap.status, PlayerStatus::Paused { index: 1 });
    // A late completion from the stopped source must not advance.
    assert!(!output.finish());

    player.play(None).await.unwrap();
    eventually("segment 1 again", || sink.started() == vec![1, 1]).await;
}

#[tokio::test]
async fn stop_cancels_in_flight_requests() {
    let synth = MockSynth::held();
    let output = MockOutput::manual();
    let (player, sink) = spawn(five(), &synth, &output, WINDOW);

    player.play(Some(0)).await.unwrap();
    eventually("request", || !synth.calls().is_empty()).await;

    let snap = player.stop().await.unwrap();
    assert_eq!(snap.status, PlayerStatus::Stopped { index: 0 });
    assert_eq!(snap.in_flight, 0);

    synth.release(10);
    eventually("cancel hint", || synth.cancels() == 1).await;
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(sink.started().is_empty());
    assert!(sink.failures().is_empty());
}

#[tokio::test]
async fn seek_while_idle_only_repositions() {
    let synth = MockSynth::open();
    let output = MockOutput::manual();
    let (player, sink) = spawn(five(), &synth, &output, WINDOW);

    let snap = player.seek(3).await.unwrap();
    assert_eq!(snap.index, 3);
    assert!(!snap.playing);
    assert_eq!(snap.status, PlayerStatus::Idle);
    assert_eq!(sink.positions(), vec![3]);

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(synth.calls().is_empty());
    assert_eq!(output.plays(), 0);
}

#[tokio::test]
async fn segment_navigation_clamps_at_bounds() {
    let synth = MockSynth::open();
    let output = MockOutput::manual();
    let (player, _sink) = spawn(segments(&["A.", "B.", "C."]), &synth, &output, WINDOW);

    assert_eq!(player.prev_segment().await.unwrap().index, 0);
    assert_eq!(player.next_segment().await.unwrap().index, 1);
    assert_eq!(player.next_segment().await.unwrap().index, 2);
    assert_eq!(player.next_segment().await.unwrap().index, 2);
    assert_eq!(player.prev_segment().await.unwrap().index, 1);
}

#[tokio::test]
async fn paragraph_navigation_uses_containers() {
    let synth = MockSynth::open();
    let output = MockOutput::manual();
    let segs = segments_in(&["a1.", "a2.", "b1.", "b2.", "b3.", "c1."], &[0, 0, 1, 1, 1, 2]);
    let (player, _sink) = spawn(segs, &synth, &output, WINDOW);

    assert_eq!(player.next_paragraph().await.unwrap().index, 2);
    assert_eq!(player.next_paragraph().await.unwrap().index, 5);
    // Last paragraph: nowhere to go.
    assert_eq!(player.next_paragraph().await.unwrap().index, 5);

    player.seek(4).await.unwrap();
    // Mid-paragraph: back to its start, then to the previous paragraph.
    assert_eq!(player.prev_paragraph().await.unwrap().index, 2);
    assert_eq!(player.prev_paragraph().await.unwrap().index, 0);
    assert_eq!(player.prev_paragraph().await.unwrap().index, 0);
}

#[tokio::test]
async fn empty_document_reports_nothing_to_speak() {
    let synth = MockSynth::open();
    let output = MockOutput::manual();
    let (player, sink) = spawn(Segmentation::new(), &synth, &output, WINDOW);

    let err = player.play(None).await.unwrap_err();
    assert!(matches!(err, PlayerError::NothingToSpeak));
    assert_eq!(sink.statuses(), vec![PlayerStatus::NothingToSpeak]);
}

#[tokio::test]
async fn out_of_range_index_is_rejected() {
    let synth = MockSynth::open();
    let output = MockOutput::manual();
    let (player, _sink) = spawn(five(), &synth, &output, WINDOW);

    assert!(matches!(
        player.seek(5).await,
        Err(PlayerError::IndexOutOfRange { index: 5, total: 5 })
    ));
    assert!(matches!(
        player.play(Some(9)).await,
        Err(PlayerError::IndexOutOfRange { index: 9, .. })
    ));
}

#[tokio::test]
async fn output_failure_halts_playback() {
    let synth = MockSynth::open();
    let output = MockOutput::manual();
    output.fail_next();
    let (player, sink) = spawn(five(), &synth, &output, WINDOW);

    player.play(Some(0)).await.unwrap();
    eventually("failure", || sink.failures() == vec![0]).await;

    let snap = player.snapshot().await.unwrap();
    assert!(!snap.playing);
    assert_eq!(snap.index, 0);
    assert!(sink.started().is_empty());
}

#[tokio::test]
async fn dropped_handle_shuts_the_player_down() {
    let synth = MockSynth::open();
    let output = MockOutput::manual();
    let (player, _sink) = spawn(five(), &synth, &output, WINDOW);
    let other = player.clone();

    player.shutdown();
    eventually("shutdown", || output.stops() > 0).await;
    assert!(matches!(
        other.snapshot().await,
        Err(PlayerError::SchedulerGone)
    ));
}

// ── Cache coherence ────────────────────────────────────────────────

#[tokio::test]
async fn cache_never_serves_another_signature() {
    let synth = MockSynth::open();
    let cache = DecodeCache::new(
        Arc::clone(&synth) as Arc<dyn SynthesisPort>,
        SynthesisGate::new(),
    );
    let configs = [
        PlaybackConfig::default(),
        PlaybackConfig::default().with_speed(1.25),
        PlaybackConfig::default().with_voice("af_bella"),
        PlaybackConfig::new(Backend::Piper, "en_US-amy-medium", 1.0),
        PlaybackConfig::default(),
    ];

    let mut pending = Vec::new();
    for (round, config) in configs.iter().enumerate() {
        for index in 0..4 {
            let fetch = cache.get_or_fetch(config, index, "Same text.");
            pending.push((config.clone(), fetch));
        }
        if round % 2 == 1 {
            // Let some of this round resolve before switching.
            let (_, fetch) = pending.last().unwrap();
            let _ = fetch.clone().await;
        }
    }

    let mut results = Vec::new();
    for (config, fetch) in pending {
        results.push((config, fetch.await));
    }

    let calls = synth.calls();
    let mut served = 0;
    for (config, result) in results {
        match result {
            Ok(audio) => {
                assert_eq!(calls[call_id(&audio)].config, config);
                served += 1;
            }
            Err(SegmentError::Cancelled) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert!(served >= 4);
    assert_eq!(cache.signature(), Some(PlaybackConfig::default().signature()));
}
