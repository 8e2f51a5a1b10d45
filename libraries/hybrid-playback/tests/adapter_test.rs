//! Playback adapter behavior against a scripted host

mod common;

use common::*;
use hybrid_core::{Track, TrackType};
use hybrid_playback::{
    BackendEvent, BackendKind, PlaybackAdapter, PlaybackError, PlayerConfig, PlayerStore,
};
use std::sync::Arc;
use std::time::Duration;

fn setup(playlist: Vec<Track>) -> (PlaybackAdapter, PlayerStore, FakeHost) {
    let store = PlayerStore::new();
    store.set_playlist(playlist);
    let host = FakeHost::new();
    let adapter = PlaybackAdapter::new(store.clone(), Arc::new(host.clone()), PlayerConfig::default());
    (adapter, store, host)
}

// ===== Loading =====

#[tokio::test(start_paused = true)]
async fn test_unparseable_youtube_fails_and_clears_loading() {
    let bad = Track::new("Bad", "X", TrackType::Youtube, "https://example.com/watch").with_id("bad");
    let (adapter, store, host) = setup(vec![bad.clone()]);

    let err = adapter.load_track(&bad).await.unwrap_err();

    assert!(matches!(err, PlaybackError::SourceResolution(_)));
    assert!(!store.snapshot().is_loading);
    assert!(host.log().is_empty(), "no backend should be created");
    assert_eq!(adapter.active_kind().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_load_selects_backend_and_records_duration() {
    let (adapter, store, host) = setup(vec![mp3("a")]);

    adapter.load_track(&mp3("a")).await.unwrap();

    let s = store.snapshot();
    assert!(!s.is_loading);
    assert_eq!(s.duration, FAKE_DURATION);
    assert_eq!(adapter.active_kind().await, Some(BackendKind::NativeAudio));
    assert_eq!(host.count(&format!("native:load:{}", mp3_url("a"))), 1);
    assert_eq!(adapter.duration().await, FAKE_DURATION);
}

#[tokio::test(start_paused = true)]
async fn test_backend_load_error_is_returned() {
    let (adapter, store, host) = setup(vec![mp3("a")]);
    host.fail(&mp3_url("a"));

    let err = adapter.load_track(&mp3("a")).await.unwrap_err();

    assert!(matches!(err, PlaybackError::BackendLoad(_)));
    assert!(!store.snapshot().is_loading);
    assert_eq!(adapter.active_kind().await, None);
    assert_eq!(host.count(&format!("native:release:{}", mp3_url("a"))), 1);
}

#[tokio::test(start_paused = true)]
async fn test_drive_retries_without_cors() {
    let track = Track::new(
        "Drive",
        "X",
        TrackType::Drive,
        "https://drive.google.com/file/d/FILE123/view?usp=sharing",
    )
    .with_id("d");
    let url = "https://drive.google.com/uc?export=download&id=FILE123&confirm=t";
    let (adapter, _store, host) = setup(vec![track.clone()]);
    host.fail_anonymous(url);

    adapter.load_track(&track).await.unwrap();

    assert_eq!(host.count(&format!("native:load:{url}")), 2);
    assert_eq!(adapter.active_kind().await, Some(BackendKind::NativeAudio));
}

#[tokio::test(start_paused = true)]
async fn test_embedded_api_loaded_once() {
    let (adapter, _store, host) = setup(vec![]);

    adapter.load_track(&youtube("y1", "dQw4w9WgXcQ")).await.unwrap();
    adapter.load_track(&youtube("y2", "9bZkp7q19f0")).await.unwrap();

    assert_eq!(host.api_loads(), 1);
    assert_eq!(host.count("embedded:create"), 2);
    assert_eq!(host.count("embedded:release:dQw4w9WgXcQ"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_newer_load_supersedes_older() {
    let (adapter, store, host) = setup(vec![mp3("slow"), mp3("fast")]);
    host.slow(&mp3_url("slow"), Duration::from_secs(5));

    let first = {
        let adapter = adapter.clone();
        tokio::spawn(async move { adapter.load_track(&mp3("slow")).await })
    };
    settle().await;
    assert!(store.snapshot().is_loading);

    adapter.load_track(&mp3("fast")).await.unwrap();
    let result = first.await.unwrap();

    assert!(matches!(result, Err(PlaybackError::Superseded)));
    assert_eq!(host.count(&format!("native:release:{}", mp3_url("slow"))), 1);
    assert_eq!(host.count(&format!("native:release:{}", mp3_url("fast"))), 0);
    assert!(!store.snapshot().is_loading);

    adapter.play().await.unwrap();
    assert_eq!(host.count(&format!("native:play:{}", mp3_url("fast"))), 1);
}

// ===== Transport =====

#[tokio::test(start_paused = true)]
async fn test_controls_without_backend_are_noops() {
    let (adapter, store, host) = setup(vec![]);

    adapter.play().await.unwrap();
    adapter.pause().await.unwrap();
    adapter.stop().await.unwrap();

    assert!(host.log().is_empty());
    assert!(!store.snapshot().is_playing);
    assert_eq!(adapter.current_time().await, 0.0);
    assert_eq!(adapter.duration().await, 0.0);
}

#[tokio::test(start_paused = true)]
async fn test_play_and_pause_follow_backend_events() {
    let (adapter, store, _host) = setup(vec![mp3("a")]);
    adapter.load_track(&mp3("a")).await.unwrap();

    adapter.play().await.unwrap();
    wait_for_state(&store, |s| s.is_playing).await;

    adapter.pause().await.unwrap();
    wait_for_state(&store, |s| !s.is_playing).await;
}

#[tokio::test(start_paused = true)]
async fn test_seek_updates_store_optimistically() {
    let (adapter, store, host) = setup(vec![mp3("a")]);
    adapter.load_track(&mp3("a")).await.unwrap();

    adapter.seek(42.5).await.unwrap();

    assert_eq!(store.snapshot().current_time, 42.5);
    assert_eq!(adapter.current_time().await, 42.5);
    assert_eq!(host.count("native:seek:42.5"), 1);
}

#[tokio::test(start_paused = true)]
async fn test_stop_pauses_and_rewinds() {
    let (adapter, store, host) = setup(vec![mp3("a")]);
    adapter.load_track(&mp3("a")).await.unwrap();
    adapter.play().await.unwrap();
    adapter.seek(30.0).await.unwrap();

    adapter.stop().await.unwrap();

    wait_for_state(&store, |s| !s.is_playing).await;
    assert_eq!(store.snapshot().current_time, 0.0);
    let pause = host.position("native:pause").unwrap();
    let rewind = host.position("native:seek:0").unwrap();
    assert!(pause < rewind);
}

#[tokio::test(start_paused = true)]
async fn test_time_updates_reach_store() {
    let (adapter, store, host) = setup(vec![mp3("a")]);
    adapter.load_track(&mp3("a")).await.unwrap();

    host.emit(BackendEvent::TimeUpdate { position: 12.0 });
    wait_for_state(&store, |s| s.current_time == 12.0).await;
    assert!((store.progress() - 12.0 / FAKE_DURATION * 100.0).abs() < 1e-9);
}

// ===== Volume =====

#[tokio::test(start_paused = true)]
async fn test_volume_is_clamped_and_scaled() {
    let (adapter, store, host) = setup(vec![mp3("a")]);
    adapter.load_track(&mp3("a")).await.unwrap();
    assert_eq!(host.last_volume(), Some(0.7));

    for (requested, expected) in [(-0.5, 0.0), (1.7, 1.0), (0.3, 0.3)] {
        adapter.set_volume(requested).await.unwrap();
        assert_eq!(store.snapshot().volume, expected);
        assert_eq!(host.last_volume(), Some(expected));
    }

    adapter.load_track(&youtube("y", "dQw4w9WgXcQ")).await.unwrap();
    assert!((host.last_volume().unwrap() - 30.0).abs() < 1e-9);

    adapter.set_volume(0.5).await.unwrap();
    assert_eq!(host.last_volume(), Some(50.0));
}

// ===== Track end =====

#[tokio::test(start_paused = true)]
async fn test_end_of_last_track_without_loop_stops() {
    let (adapter, store, host) = setup(vec![mp3("a"), mp3("b")]);
    let last = store.play_track_at_index(1).unwrap();
    adapter.load_track(&last).await.unwrap();
    adapter.play().await.unwrap();
    wait_for_state(&store, |s| s.is_playing).await;
    host.emit(BackendEvent::TimeUpdate { position: 170.0 });

    host.emit(BackendEvent::Ended);

    wait_for_state(&store, |s| !s.is_playing && s.current_time == 0.0).await;
    assert_eq!(store.snapshot().current_index, Some(1));
    assert_eq!(host.count(&format!("native:load:{}", mp3_url("a"))), 0);
}

#[tokio::test(start_paused = true)]
async fn test_end_of_last_track_with_loop_wraps() {
    let (adapter, store, host) = setup(vec![mp3("a"), mp3("b")]);
    store.set_loop_mode(true);
    let last = store.play_track_at_index(1).unwrap();
    adapter.load_track(&last).await.unwrap();
    adapter.play().await.unwrap();

    host.emit(BackendEvent::Ended);

    wait_for_state(&store, |s| s.current_index == Some(0)).await;
    settle().await;
    assert_eq!(host.count(&format!("native:play:{}", mp3_url("a"))), 1);
}

#[tokio::test(start_paused = true)]
async fn test_end_skips_tracks_that_fail_to_load() {
    let (adapter, store, host) = setup(vec![mp3("a"), mp3("b"), mp3("c")]);
    host.fail(&mp3_url("b"));
    let first = store.play_track_at_index(0).unwrap();
    adapter.load_track(&first).await.unwrap();
    adapter.play().await.unwrap();

    host.emit(BackendEvent::Ended);

    wait_for_state(&store, |s| s.current_index == Some(2)).await;
    settle().await;
    assert!(store.snapshot().is_playing);
    assert_eq!(host.count(&format!("native:load:{}", mp3_url("b"))), 1);
    assert_eq!(host.count(&format!("native:play:{}", mp3_url("c"))), 1);
}

#[tokio::test(start_paused = true)]
async fn test_end_with_every_track_failing_gives_up() {
    let (adapter, store, host) = setup(vec![mp3("a"), mp3("b")]);
    store.set_loop_mode(true);
    let first = store.play_track_at_index(0).unwrap();
    adapter.load_track(&first).await.unwrap();
    adapter.play().await.unwrap();
    wait_for_state(&store, |s| s.is_playing).await;
    host.fail(&mp3_url("a"));
    host.fail(&mp3_url("b"));

    host.emit(BackendEvent::Ended);

    wait_for_state(&store, |s| !s.is_playing && !s.is_loading).await;
    settle().await;
    assert_eq!(host.count(&format!("native:load:{}", mp3_url("b"))), 1);
    assert_eq!(host.count(&format!("native:load:{}", mp3_url("a"))), 2);
}

// ===== Embedded position poll =====

#[tokio::test(start_paused = true)]
async fn test_switch_from_embedded_releases_before_native_and_stops_poll() {
    let (adapter, store, host) = setup(vec![]);
    adapter.load_track(&youtube("y", "dQw4w9WgXcQ")).await.unwrap();
    adapter.play().await.unwrap();
    wait_for_state(&store, |s| s.is_playing).await;

    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(host.poll_reads() >= 3, "poll should run while playing");

    adapter.load_track(&mp3("a")).await.unwrap();
    let reads_after_switch = host.poll_reads();

    let released = host.position("embedded:release:dQw4w9WgXcQ").unwrap();
    let created = host.position("native:create").unwrap();
    assert!(released < created, "log: {:?}", host.log());

    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(host.poll_reads(), reads_after_switch);
}

#[tokio::test(start_paused = true)]
async fn test_pause_stops_embedded_poll() {
    let (adapter, store, host) = setup(vec![]);
    adapter.load_track(&youtube("y", "dQw4w9WgXcQ")).await.unwrap();
    adapter.play().await.unwrap();
    wait_for_state(&store, |s| s.is_playing).await;
    tokio::time::sleep(Duration::from_millis(250)).await;

    adapter.pause().await.unwrap();
    wait_for_state(&store, |s| !s.is_playing).await;
    let reads = host.poll_reads();

    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(host.poll_reads(), reads);
}

// ===== Autoplay =====

#[tokio::test(start_paused = true)]
async fn test_autoplay_rejection_retries_on_interaction() {
    let (adapter, store, host) = setup(vec![mp3("a")]);
    adapter.load_track(&mp3("a")).await.unwrap();
    host.reject_autoplay(true);

    adapter.play().await.unwrap();
    settle().await;
    assert!(!store.snapshot().is_playing);
    assert_eq!(host.count("native:rejected"), 1);

    host.reject_autoplay(false);
    host.interact();

    wait_for_state(&store, |s| s.is_playing).await;
    host.interact();
    settle().await;
    assert_eq!(host.count(&format!("native:play:{}", mp3_url("a"))), 1);
}

#[tokio::test(start_paused = true)]
async fn test_repeated_autoplay_rejection_keeps_waiting() {
    let (adapter, store, host) = setup(vec![mp3("a")]);
    adapter.load_track(&mp3("a")).await.unwrap();
    host.reject_autoplay(true);
    adapter.play().await.unwrap();

    host.interact();
    settle().await;
    assert_eq!(host.count("native:rejected"), 2);
    assert!(!store.snapshot().is_playing);

    host.reject_autoplay(false);
    host.interact();
    wait_for_state(&store, |s| s.is_playing).await;
    assert_eq!(host.count(&format!("native:play:{}", mp3_url("a"))), 1);
}

#[tokio::test(start_paused = true)]
async fn test_pause_cancels_pending_autoplay_retry() {
    let (adapter, store, host) = setup(vec![mp3("a")]);
    adapter.load_track(&mp3("a")).await.unwrap();
    host.reject_autoplay(true);
    adapter.play().await.unwrap();

    adapter.pause().await.unwrap();
    host.reject_autoplay(false);
    host.interact();
    settle().await;

    assert!(!store.snapshot().is_playing);
    assert_eq!(host.count(&format!("native:play:{}", mp3_url("a"))), 0);
}

// ===== Cleanup =====

#[tokio::test(start_paused = true)]
async fn test_cleanup_is_idempotent() {
    let (adapter, _store, host) = setup(vec![]);
    adapter.load_track(&youtube("y", "dQw4w9WgXcQ")).await.unwrap();
    adapter.play().await.unwrap();

    adapter.cleanup().await;
    adapter.cleanup().await;

    assert_eq!(host.count("embedded:release:dQw4w9WgXcQ"), 1);
    assert_eq!(adapter.active_kind().await, None);
    let reads = host.poll_reads();
    tokio::time::sleep(Duration::from_secs(1)).await;
    assert_eq!(host.poll_reads(), reads);
}

#[tokio::test(start_paused = true)]
async fn test_events_after_cleanup_are_ignored() {
    let (adapter, store, host) = setup(vec![mp3("a")]);
    adapter.load_track(&mp3("a")).await.unwrap();
    adapter.cleanup().await;

    host.emit(BackendEvent::Playing);
    host.emit(BackendEvent::TimeUpdate { position: 99.0 });
    settle().await;

    let s = store.snapshot();
    assert!(!s.is_playing);
    assert_eq!(s.current_time, 0.0);
}

// ===== Store follower =====

#[tokio::test(start_paused = true)]
async fn test_follower_loads_requested_track() {
    let (adapter, store, host) = setup(vec![mp3("a"), mp3("b")]);
    adapter.spawn_store_follower().await;

    store.play_track_at_index(1);
    let request = store.request_load();

    wait_for_state(&store, |s| s.load_settled >= request).await;
    assert_eq!(host.count(&format!("native:load:{}", mp3_url("b"))), 1);
    assert_eq!(adapter.active_kind().await, Some(BackendKind::NativeAudio));
}

#[tokio::test(start_paused = true)]
async fn test_follower_settles_failed_loads() {
    let (adapter, store, host) = setup(vec![mp3("a")]);
    host.fail(&mp3_url("a"));
    adapter.spawn_store_follower().await;

    store.play_track_at_index(0);
    let request = store.request_load();

    wait_for_state(&store, |s| s.load_settled >= request && !s.is_loading).await;
    assert_eq!(adapter.active_kind().await, None);
}

#[tokio::test(start_paused = true)]
async fn test_follower_pushes_store_volume() {
    let (adapter, store, host) = setup(vec![mp3("a")]);
    adapter.load_track(&mp3("a")).await.unwrap();
    adapter.spawn_store_follower().await;
    settle().await;

    store.set_volume(0.25);
    settle().await;

    assert_eq!(host.last_volume(), Some(0.25));
}
