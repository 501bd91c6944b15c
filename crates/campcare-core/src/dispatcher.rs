// ── Command dispatch ──
//
// Two entry points over one execution path:
//   call  → request/response; always yields exactly one `Reply`
//   fire  → fire-and-forget; broadcasts a `LookupEvent` on success only
//
// Every local check (operation name, instance, parameters) happens before
// the client is invoked.

use std::sync::Arc;

use serde::Serialize;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::command::requests::CommandRequest;
use crate::command::{Command, CommandResult, Operation};
use crate::config::InstanceId;
use crate::error::CoreError;
use crate::event::LookupEvent;
use crate::registry::{InstanceRegistry, RegisteredInstance};

const EVENT_CHANNEL_SIZE: usize = 256;

// ── Reply envelope ───────────────────────────────────────────────────

/// `{ code, message }` carried by a failed reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReplyError {
    pub code: String,
    pub message: String,
}

impl From<&CoreError> for ReplyError {
    fn from(err: &CoreError) -> Self {
        Self {
            code: err.code().to_owned(),
            message: err.to_string(),
        }
    }
}

/// Direct reply to a `call`. Exactly one of `result` / `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Reply {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<CommandResult>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ReplyError>,
}

impl Reply {
    fn success(id: Option<u64>, result: CommandResult) -> Self {
        Self {
            id,
            success: true,
            result: Some(result),
            error: None,
        }
    }

    fn failure(id: Option<u64>, err: &CoreError) -> Self {
        Self {
            id,
            success: false,
            result: None,
            error: Some(err.into()),
        }
    }
}

/// Outcome of the shared execution path.
struct Executed {
    instance_id: InstanceId,
    operation: Operation,
    result: CommandResult,
}

// ── Dispatcher ───────────────────────────────────────────────────────

/// Routes lookup requests to the right instance's client.
#[derive(Clone)]
pub struct Dispatcher {
    registry: Arc<InstanceRegistry>,
    event_tx: broadcast::Sender<Arc<LookupEvent>>,
}

impl Dispatcher {
    pub fn new(registry: Arc<InstanceRegistry>) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_SIZE);
        Self { registry, event_tx }
    }

    /// Subscribe to events produced by [`fire`](Self::fire).
    pub fn subscribe(&self) -> broadcast::Receiver<Arc<LookupEvent>> {
        self.event_tx.subscribe()
    }

    /// Request/response entry point.
    pub async fn call(&self, request: &CommandRequest) -> Reply {
        match self.execute(request).await {
            Ok(executed) => Reply::success(request.id, executed.result),
            Err(err) => {
                debug!(operation = %request.operation, code = err.code(), "command failed: {err}");
                Reply::failure(request.id, &err)
            }
        }
    }

    /// Fire-and-forget entry point. Returns whether an event was emitted.
    ///
    /// Failures are logged and produce no event.
    pub async fn fire(&self, request: &CommandRequest) -> bool {
        match self.execute(request).await {
            Ok(executed) => {
                let event = LookupEvent::new(
                    executed.instance_id,
                    executed.operation,
                    request.params.clone(),
                    executed.result,
                );
                debug!(topic = %event.topic, "broadcasting lookup event");
                // No subscribers is not an error.
                let _ = self.event_tx.send(Arc::new(event));
                true
            }
            Err(err) => {
                warn!(
                    operation = %request.operation,
                    code = err.code(),
                    "lookup failed, no event emitted: {err}"
                );
                false
            }
        }
    }

    // ── Shared execution path ────────────────────────────────────────

    async fn execute(&self, request: &CommandRequest) -> Result<Executed, CoreError> {
        let operation: Operation =
            request
                .operation
                .parse()
                .map_err(|_| CoreError::UnknownCommand {
                    name: request.operation.clone(),
                })?;

        let instance = self.registry.resolve_target(request.instance_id.as_ref())?;
        let command = Command::from_params(operation, &request.params)?;
        let result = run(&instance, &command).await?;

        Ok(Executed {
            instance_id: instance.id().clone(),
            operation,
            result,
        })
    }
}

/// Invoke the client operation matching `command`.
async fn run(instance: &RegisteredInstance, command: &Command) -> Result<CommandResult, CoreError> {
    let client = instance.client();
    let result = match command {
        Command::CheckPlate { plate } => client
            .check_plate(plate)
            .await
            .map(CommandResult::PlateCheck),
        Command::QueryPlate(query) => client
            .query_plate(query)
            .await
            .map(CommandResult::Reservations),
        Command::GetReservation { reservation_id } => client
            .get_reservation(reservation_id)
            .await
            .map(CommandResult::Reservation),
        Command::ListPlaces => client.list_places().await.map(CommandResult::Places),
    };
    result.into_result().map_err(CoreError::from)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn unknown_operation_is_rejected() {
        let dispatcher = Dispatcher::new(Arc::new(InstanceRegistry::default()));
        let reply = dispatcher
            .call(&CommandRequest::new("delete_everything").with_id(3))
            .await;

        assert_eq!(reply.id, Some(3));
        assert!(!reply.success);
        assert_eq!(reply.error.unwrap().code, "unknown_command");
    }

    #[tokio::test]
    async fn empty_registry_is_unknown_instance() {
        let dispatcher = Dispatcher::new(Arc::new(InstanceRegistry::default()));
        let mut events = dispatcher.subscribe();

        let request = CommandRequest::new("check_plate").with_param("plate", "AB-12");
        assert!(!dispatcher.fire(&request).await);
        assert!(events.try_recv().is_err());

        let reply = dispatcher.call(&request).await;
        assert_eq!(reply.error.as_ref().unwrap().code, "unknown_instance");
    }

    #[test]
    fn failed_reply_serializes_without_result() {
        let reply = Reply::failure(Some(9), &CoreError::NoInstance);
        assert_eq!(
            serde_json::to_value(&reply).unwrap(),
            json!({
                "id": 9,
                "success": false,
                "error": { "code": "unknown_instance", "message": "No instance is registered" }
            })
        );
    }
}
