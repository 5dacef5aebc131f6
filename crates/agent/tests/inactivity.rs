//! Inactivity timer behavior: arming, suppression, one-shot firing.

mod common;

use std::time::Duration;

use common::{Collector, Harness};
use vox_events::{AudioPlaybackCompleted, UserInactivityTimeout};
use vox_realtime::{
    InputAudioBufferSpeechStarted, InputAudioBufferSpeechStopped, ResponseCreated, ResponseMeta,
};

const TIMEOUT: Duration = Duration::from_millis(250);

fn speech_stopped(audio_end_ms: u64) -> InputAudioBufferSpeechStopped {
    InputAudioBufferSpeechStopped {
        audio_end_ms,
        item_id: None,
    }
}

fn speech_started(audio_start_ms: u64) -> InputAudioBufferSpeechStarted {
    InputAudioBufferSpeechStarted {
        audio_start_ms,
        item_id: None,
    }
}

#[tokio::test]
async fn fires_exactly_once_after_composite_silence() {
    let harness = Harness::with_inactivity_timeout(TIMEOUT);
    let timeouts = Collector::<UserInactivityTimeout>::subscribe(&harness.bus);

    harness.bus.dispatch(speech_stopped(1_000)).await;
    harness.bus.dispatch(AudioPlaybackCompleted).await;

    tokio::time::sleep(TIMEOUT + Duration::from_millis(250)).await;
    assert_eq!(timeouts.len(), 1);
    assert!((timeouts.events()[0].timeout_seconds - 0.25).abs() < 0.01);

    // One-shot: no further firing without another speech stop.
    tokio::time::sleep(TIMEOUT + Duration::from_millis(150)).await;
    assert_eq!(timeouts.len(), 1);
}

#[tokio::test]
async fn user_speech_before_the_deadline_suppresses_the_timeout() {
    let harness = Harness::with_inactivity_timeout(TIMEOUT);
    let timeouts = Collector::<UserInactivityTimeout>::subscribe(&harness.bus);

    harness.bus.dispatch(speech_stopped(500)).await;
    tokio::time::sleep(Duration::from_millis(100)).await;
    harness.bus.dispatch(speech_started(600)).await;

    tokio::time::sleep(TIMEOUT + Duration::from_millis(200)).await;
    assert_eq!(timeouts.len(), 0);
}

#[tokio::test]
async fn a_new_response_disarms_until_playback_finishes() {
    let harness = Harness::with_inactivity_timeout(TIMEOUT);
    let timeouts = Collector::<UserInactivityTimeout>::subscribe(&harness.bus);

    harness.bus.dispatch(speech_stopped(500)).await;
    // The assistant starts answering: the timer must stand down.
    harness
        .bus
        .dispatch(ResponseCreated {
            response: ResponseMeta::new("r1"),
        })
        .await;

    tokio::time::sleep(TIMEOUT + Duration::from_millis(200)).await;
    assert_eq!(timeouts.len(), 0);

    // Playback finished and the user is still quiet: now it may fire.
    harness.bus.dispatch(AudioPlaybackCompleted).await;
    tokio::time::sleep(TIMEOUT + Duration::from_millis(250)).await;
    assert_eq!(timeouts.len(), 1);
}

#[tokio::test]
async fn rearms_after_the_next_turn() {
    let harness = Harness::with_inactivity_timeout(TIMEOUT);
    let timeouts = Collector::<UserInactivityTimeout>::subscribe(&harness.bus);

    harness.bus.dispatch(speech_stopped(500)).await;
    tokio::time::sleep(TIMEOUT + Duration::from_millis(250)).await;
    assert_eq!(timeouts.len(), 1);

    // Another turn of silence arms and fires again.
    harness.bus.dispatch(speech_started(900)).await;
    harness.bus.dispatch(speech_stopped(1_400)).await;
    tokio::time::sleep(TIMEOUT + Duration::from_millis(250)).await;
    assert_eq!(timeouts.len(), 2);
}
