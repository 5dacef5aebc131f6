//! Executes function calls requested by the model.

use std::sync::{Arc, Weak};

use vox_events::{EventBus, ToolCallResultReady};
use vox_realtime::client_events::ConversationItemCreate;
use vox_realtime::server_events::FunctionCallArgumentsDone;
use vox_realtime::transport::RealtimeConnection;
use vox_tools::{ToolContext, ToolRegistry};

use super::subscribe_handler;

pub struct ToolCallingWatchdog {
    #[allow(dead_code)]
    inner: Arc<Inner>,
}

struct Inner {
    bus: Weak<EventBus>,
    registry: Arc<ToolRegistry>,
    transport: Arc<dyn RealtimeConnection>,
    context: ToolContext,
}

impl ToolCallingWatchdog {
    pub fn new(
        bus: &Arc<EventBus>,
        registry: Arc<ToolRegistry>,
        transport: Arc<dyn RealtimeConnection>,
        context: ToolContext,
    ) -> Self {
        let inner = Arc::new(Inner {
            bus: Arc::downgrade(bus),
            registry,
            transport,
            context,
        });

        subscribe_handler!(bus, inner, FunctionCallArgumentsDone, on_function_call);

        Self { inner }
    }
}

impl Inner {
    async fn on_function_call(&self, event: FunctionCallArgumentsDone) {
        // An unknown tool is log-only: the model retries on its own timeout.
        let Some(tool) = self.registry.get(&event.name) else {
            tracing::error!(tool = %event.name, "tool not found");
            return;
        };

        tracing::info!(
            tool = %event.name,
            call_id = %event.call_id,
            arguments = %event.arguments,
            "tool call started"
        );

        // Slow tools can announce themselves before doing the work.
        if let Some(pending) = &tool.pending_message {
            if let Err(error) = self
                .transport
                .send(ConversationItemCreate::assistant_message(pending.clone()).into())
                .await
            {
                tracing::warn!(%error, "failed to send pending message");
            }
        }

        let arguments = event.parsed_arguments();
        let output = match self
            .registry
            .execute(&event.name, arguments, self.context.clone())
            .await
        {
            Ok(output) => output.serialize(),
            Err(error) => {
                // The model must never be left waiting on a call_id; errors
                // become the tool output.
                tracing::error!(tool = %event.name, %error, "tool execution failed");
                format!("Tool execution failed: {error}")
            }
        };

        tracing::info!(tool = %event.name, output = %output, "tool call finished");

        if let Some(bus) = self.bus.upgrade() {
            bus.dispatch(ToolCallResultReady {
                call_id: event.call_id,
                tool_name: event.name,
                output,
                response_instruction: tool.result_instruction.clone(),
                suppress_response: tool.suppress_response,
            })
            .await;
        }
    }
}
