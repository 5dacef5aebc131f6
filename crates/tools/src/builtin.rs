//! Tools every session gets for free.

use serde::Serialize;
use serde_json::json;

use vox_events::{StopAgent, VolumeUpdateRequested};

use crate::registry::{Tool, ToolError, ToolOutput};

/// Standard success/message payload returned by the built-in tools.
#[derive(Debug, Clone, Serialize)]
pub struct ActionResult {
    pub success: bool,
    pub message: String,
}

impl ActionResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn into_output(self) -> ToolOutput {
        match serde_json::to_value(&self) {
            Ok(value) => ToolOutput::Json(value),
            Err(_) => ToolOutput::Text(self.message),
        }
    }
}

/// The default tool set: current time, session stop, volume control.
pub fn default_tools() -> Vec<Tool> {
    vec![get_current_time(), stop_session(), adjust_volume()]
}

fn get_current_time() -> Tool {
    Tool::builder("get_current_time", "Get the current local time").handler(
        |_args, _ctx| async move {
            Ok(ToolOutput::Text(
                chrono::Local::now().format("%H:%M:%S").to_string(),
            ))
        },
    )
}

fn stop_session() -> Tool {
    Tool::builder("stop_session", "Stop the current realtime session.")
        .suppress_response()
        .handler(|_args, ctx| async move {
            let Some(bus) = ctx.bus() else {
                return Err(ToolError::Failed("agent is already gone".into()));
            };
            tracing::info!("stop command received, dispatching stop event");
            bus.dispatch(StopAgent).await;
            Ok(ActionResult::ok("Stopping agent session").into_output())
        })
}

fn adjust_volume() -> Tool {
    Tool::builder("adjust_volume", "Adjust volume level.")
        .param::<f64>("level", "Volume level from 0.0 (0%) to 1.0 (100%)")
        .handler(|args, ctx| async move {
            let level = args
                .get("level")
                .and_then(serde_json::Value::as_f64)
                .ok_or_else(|| ToolError::Failed("level must be a number".into()))?
                as f32;

            let clamped = level.clamp(0.0, 1.0);
            if clamped != level {
                tracing::warn!(level, clamped, "volume level out of range, clamping");
            }

            let Some(bus) = ctx.bus() else {
                return Err(ToolError::Failed("agent is already gone".into()));
            };
            bus.dispatch(VolumeUpdateRequested { volume: clamped }).await;

            let percentage = (clamped * 100.0).round() as u32;
            Ok(ActionResult::ok(format!("Volume adjusted to {percentage}%")).into_output())
        })
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Tests
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
