//! Fires a timeout once both sides have been quiet long enough.
//!
//! The timer arms only when the user has stopped speaking AND the assistant
//! is not speaking; any speech or new response disarms it. It fires once,
//! then waits for the next speech-stop before it can arm again.

use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use vox_events::{AgentStopped, AudioPlaybackCompleted, EventBus, UserInactivityTimeout};
use vox_realtime::server_events::{
    InputAudioBufferSpeechStarted, InputAudioBufferSpeechStopped, ResponseCreated,
};

use super::subscribe_handler;

pub const DEFAULT_INACTIVITY_TIMEOUT: Duration = Duration::from_secs(10);

pub struct UserInactivityTimeoutWatchdog {
    #[allow(dead_code)]
    inner: Arc<Inner>,
}

#[derive(Default)]
struct State {
    user_has_stopped_speaking: bool,
    assistant_speaking: bool,
    timer: Option<CancellationToken>,
}

struct Inner {
    bus: Weak<EventBus>,
    timeout: Duration,
    state: Mutex<State>,
}

impl UserInactivityTimeoutWatchdog {
    pub fn new(bus: &Arc<EventBus>, timeout: Duration) -> Self {
        let inner = Arc::new(Inner {
            bus: Arc::downgrade(bus),
            timeout,
            state: Mutex::new(State::default()),
        });

        subscribe_handler!(bus, inner, InputAudioBufferSpeechStopped, on_user_speech_stopped);
        subscribe_handler!(bus, inner, InputAudioBufferSpeechStarted, on_user_speech_started);
        subscribe_handler!(bus, inner, ResponseCreated, on_response_created);
        subscribe_handler!(bus, inner, AudioPlaybackCompleted, on_playback_completed);
        subscribe_handler!(bus, inner, AgentStopped, on_agent_stopped);

        Self { inner }
    }
}

impl Inner {
    async fn on_user_speech_stopped(self: Arc<Self>, event: InputAudioBufferSpeechStopped) {
        tracing::debug!(audio_end_ms = event.audio_end_ms, "user stopped speaking");
        self.state.lock().user_has_stopped_speaking = true;
        Self::try_arm(&self);
    }

    async fn on_user_speech_started(self: Arc<Self>, event: InputAudioBufferSpeechStarted) {
        tracing::debug!(
            audio_start_ms = event.audio_start_ms,
            "user started speaking, disarming inactivity timer"
        );
        let mut state = self.state.lock();
        state.user_has_stopped_speaking = false;
        disarm(&mut state);
    }

    async fn on_response_created(self: Arc<Self>, _event: ResponseCreated) {
        let mut state = self.state.lock();
        state.assistant_speaking = true;
        disarm(&mut state);
    }

    async fn on_playback_completed(self: Arc<Self>, _event: AudioPlaybackCompleted) {
        self.state.lock().assistant_speaking = false;
        Self::try_arm(&self);
    }

    async fn on_agent_stopped(self: Arc<Self>, _event: AgentStopped) {
        disarm(&mut self.state.lock());
    }

    /// Arm (or re-arm) the timer if the composite-silence condition holds.
    fn try_arm(inner: &Arc<Inner>) {
        let token = {
            let mut state = inner.state.lock();
            if !state.user_has_stopped_speaking || state.assistant_speaking {
                return;
            }
            disarm(&mut state);
            let token = CancellationToken::new();
            state.timer = Some(token.clone());
            token
        };

        tracing::debug!(
            timeout = ?inner.timeout,
            "both sides quiet, arming inactivity timer"
        );

        let timeout = inner.timeout;
        let inner = Arc::downgrade(inner);
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => {}
                _ = tokio::time::sleep(timeout) => {
                    tracing::warn!(?timeout, "user inactivity timeout");
                    let Some(inner) = inner.upgrade() else { return };
                    {
                        // One-shot: stay disarmed until the next speech stop.
                        let mut state = inner.state.lock();
                        state.user_has_stopped_speaking = false;
                        state.timer = None;
                    }
                    if let Some(bus) = inner.bus.upgrade() {
                        bus.dispatch(UserInactivityTimeout {
                            timeout_seconds: timeout.as_secs_f32(),
                        })
                        .await;
                    }
                }
            }
        });
    }
}

fn disarm(state: &mut State) {
    if let Some(timer) = state.timer.take() {
        timer.cancel();
    }
}
