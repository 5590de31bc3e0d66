//! Handles onto in-flight process executions.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Identity of a single [`ExecutionHandle`] allocation.
///
/// Clones of a handle share its token. Handles created separately for the
/// same execution id carry different tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HandleToken(Uuid);

impl HandleToken {
    fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Returns the raw token value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for HandleToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Descriptive data of an execution as reported by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionInfo {
    /// The execution ID.
    pub id: Uuid,

    /// The ID of the process instance (root execution) this execution belongs to.
    pub process_instance_id: Uuid,

    /// The activity the execution currently waits in or executes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activity_id: Option<String>,

    /// The business key of the process instance.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub business_key: Option<String>,
}

impl ExecutionInfo {
    /// Creates info for a root execution with a generated ID.
    #[must_use]
    pub fn root() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    /// Creates info for a root execution with a specific ID.
    #[must_use]
    pub fn with_id(id: Uuid) -> Self {
        Self {
            id,
            process_instance_id: id,
            activity_id: None,
            business_key: None,
        }
    }

    /// Creates info for a child execution of the given process instance.
    #[must_use]
    pub fn child_of(process_instance_id: Uuid) -> Self {
        Self {
            id: Uuid::new_v4(),
            process_instance_id,
            activity_id: None,
            business_key: None,
        }
    }

    /// Sets the activity ID.
    #[must_use]
    pub fn with_activity_id(mut self, activity_id: impl Into<String>) -> Self {
        self.activity_id = Some(activity_id.into());
        self
    }

    /// Sets the business key.
    #[must_use]
    pub fn with_business_key(mut self, business_key: impl Into<String>) -> Self {
        self.business_key = Some(business_key.into());
        self
    }

    /// Returns true if this is the root execution of its process instance.
    #[must_use]
    pub fn is_process_instance(&self) -> bool {
        self.id == self.process_instance_id
    }
}

/// Opaque handle onto an in-flight execution owned by the process engine.
///
/// Handles compare equal when they describe the same execution. Whether two
/// handles are the *same* handle is answered by [`ExecutionHandle::is_same_handle`];
/// execution-scoped instances are keyed by that identity.
#[derive(Debug, Clone)]
pub struct ExecutionHandle {
    token: HandleToken,
    info: Arc<ExecutionInfo>,
    variables: Arc<RwLock<HashMap<String, serde_json::Value>>>,
    created_at: DateTime<Utc>,
}

impl ExecutionHandle {
    /// Creates a handle for the described execution with no variables.
    #[must_use]
    pub fn new(info: ExecutionInfo) -> Self {
        Self::with_variables(info, HashMap::new())
    }

    /// Creates a handle for the described execution with initial variables.
    #[must_use]
    pub fn with_variables(
        info: ExecutionInfo,
        variables: HashMap<String, serde_json::Value>,
    ) -> Self {
        Self {
            token: HandleToken::generate(),
            info: Arc::new(info),
            variables: Arc::new(RwLock::new(variables)),
            created_at: Utc::now(),
        }
    }

    /// Creates a fresh handle for the same execution, as the engine does when
    /// it loads an execution again. The result is equal but not identical.
    #[must_use]
    pub fn reload(&self) -> Self {
        Self {
            token: HandleToken::generate(),
            info: Arc::clone(&self.info),
            variables: Arc::clone(&self.variables),
            created_at: Utc::now(),
        }
    }

    /// Creates a fresh handle for the same execution after it moved to another activity.
    #[must_use]
    pub fn at_activity(&self, activity_id: impl Into<String>) -> Self {
        let info = ExecutionInfo {
            activity_id: Some(activity_id.into()),
            ..(*self.info).clone()
        };

        Self {
            token: HandleToken::generate(),
            info: Arc::new(info),
            variables: Arc::clone(&self.variables),
            created_at: Utc::now(),
        }
    }

    /// Returns the identity token of this handle.
    #[must_use]
    pub fn token(&self) -> HandleToken {
        self.token
    }

    /// Returns true if both values are clones of one handle.
    #[must_use]
    pub fn is_same_handle(&self, other: &Self) -> bool {
        self.token == other.token
    }

    /// Returns the execution info.
    #[must_use]
    pub fn info(&self) -> &ExecutionInfo {
        &self.info
    }

    /// Returns the execution ID.
    #[must_use]
    pub fn id(&self) -> Uuid {
        self.info.id
    }

    /// Returns the process instance ID.
    #[must_use]
    pub fn process_instance_id(&self) -> Uuid {
        self.info.process_instance_id
    }

    /// Returns the current activity ID.
    #[must_use]
    pub fn activity_id(&self) -> Option<&str> {
        self.info.activity_id.as_deref()
    }

    /// Returns the business key.
    #[must_use]
    pub fn business_key(&self) -> Option<&str> {
        self.info.business_key.as_deref()
    }

    /// Returns when this handle was created.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Gets a variable value.
    #[must_use]
    pub fn variable(&self, name: &str) -> Option<serde_json::Value> {
        self.variables.read().get(name).cloned()
    }

    /// Checks if a variable is set.
    #[must_use]
    pub fn has_variable(&self, name: &str) -> bool {
        self.variables.read().contains_key(name)
    }

    /// Sets a variable, replacing any previous value.
    pub fn set_variable(&self, name: impl Into<String>, value: serde_json::Value) {
        self.variables.write().insert(name.into(), value);
    }

    /// Sets several variables at once.
    pub fn set_variables(&self, variables: HashMap<String, serde_json::Value>) {
        self.variables.write().extend(variables);
    }

    /// Removes a variable, returning its previous value.
    pub fn remove_variable(&self, name: &str) -> Option<serde_json::Value> {
        self.variables.write().remove(name)
    }

    /// Returns a copy of all variables.
    #[must_use]
    pub fn variables(&self) -> HashMap<String, serde_json::Value> {
        self.variables.read().clone()
    }
}

impl PartialEq for ExecutionHandle {
    fn eq(&self, other: &Self) -> bool {
        self.info == other.info
    }
}

impl Eq for ExecutionHandle {}

impl fmt::Display for ExecutionHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.info.activity_id {
            Some(ref activity) => write!(f, "Execution({} @ {activity})", self.info.id),
            None => write!(f, "Execution({})", self.info.id),
        }
    }
}
