// ── Inbound request envelope ──
//
// The loosely-typed shape a consumer submits: an operation name, free-form
// parameters and an optional instance selector. Parsed into a `Command`
// by the dispatcher.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::InstanceId;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CommandRequest {
    /// Caller-chosen correlation id, echoed in the reply.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<InstanceId>,
    /// Operation name, e.g. `query_plate`.
    #[serde(rename = "type")]
    pub operation: String,
    #[serde(flatten)]
    pub params: Map<String, Value>,
}

impl CommandRequest {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: u64) -> Self {
        self.id = Some(id);
        self
    }

    pub fn with_instance(mut self, instance_id: InstanceId) -> Self {
        self.instance_id = Some(instance_id);
        self
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }
}
