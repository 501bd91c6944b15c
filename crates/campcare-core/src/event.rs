// ── Lookup events ──
//
// Broadcast after a successful fire-and-forget command. Failures never
// produce an event.

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

use crate::command::{CommandResult, Operation};
use crate::config::InstanceId;

/// Result of one fire-and-forget lookup, delivered to subscribers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LookupEvent {
    /// `<domain>_<operation>`, e.g. `campingcareha_query_license_plate`.
    pub topic: String,
    pub instance_id: InstanceId,
    pub operation: Operation,
    /// Parameters exactly as the caller submitted them.
    pub request_params: Map<String, Value>,
    pub result: CommandResult,
    pub timestamp: DateTime<Utc>,
}

impl LookupEvent {
    pub(crate) fn new(
        instance_id: InstanceId,
        operation: Operation,
        request_params: Map<String, Value>,
        result: CommandResult,
    ) -> Self {
        Self {
            topic: operation.event_topic(),
            instance_id,
            operation,
            request_params,
            result,
            timestamp: Utc::now(),
        }
    }
}
