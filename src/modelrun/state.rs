//! Run State - life cycle of a model run

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::ScheduleEvent;
use crate::{Error, Result};

/// Tag of the idle state.
pub const STATE_IDLE: &str = "IDLE";
/// Tag of the running state.
pub const STATE_RUNNING: &str = "RUNNING";
/// Tag of the failed state.
pub const STATE_FAILED: &str = "FAILED";
/// Tag of the success state.
pub const STATE_SUCCESS: &str = "SUCCESS";

/// State of a model run.
///
/// Serialized as `{"type": "<TAG>"}`, with `errors` added for failed runs
/// and `modelOutput` for successful ones. A document missing the payload
/// field of its tag is rejected.
///
/// ## Life Cycle
///
/// ```text
/// IDLE ──> RUNNING ──> SUCCESS
///   │         │
///   └─────────┴──────> FAILED
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum RunState {
    /// Run is created but not yet started.
    Idle,
    /// Run is currently executing.
    Running,
    /// Run failed. Carries the error messages it produced.
    Failed {
        /// Error messages, in the order they were reported.
        errors: Vec<String>,
    },
    /// Run completed successfully.
    Success {
        /// Reference to the object holding the run's output.
        #[serde(rename = "modelOutput")]
        model_output: String,
    },
}

impl RunState {
    /// Create a failed state with the given error messages.
    #[must_use]
    pub fn failed<I, S>(errors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Failed {
            errors: errors.into_iter().map(Into::into).collect(),
        }
    }

    /// Create a success state referencing the model output.
    #[must_use]
    pub fn success(model_output: impl Into<String>) -> Self {
        Self::Success {
            model_output: model_output.into(),
        }
    }

    /// Whether the run is waiting to start.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Whether the run is executing.
    #[must_use]
    pub const fn is_running(&self) -> bool {
        matches!(self, Self::Running)
    }

    /// Whether the run exited in a failed state.
    #[must_use]
    pub const fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }

    /// Whether the run finished with success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Error messages of a failed run.
    #[must_use]
    pub fn errors(&self) -> Option<&[String]> {
        match self {
            Self::Failed { errors } => Some(errors),
            _ => None,
        }
    }

    /// Model output reference of a successful run.
    #[must_use]
    pub fn model_output(&self) -> Option<&str> {
        match self {
            Self::Success { model_output } => Some(model_output),
            _ => None,
        }
    }

    /// Stable tag, used for display and as the serialized discriminant.
    #[must_use]
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::Idle => STATE_IDLE,
            Self::Running => STATE_RUNNING,
            Self::Failed { .. } => STATE_FAILED,
            Self::Success { .. } => STATE_SUCCESS,
        }
    }

    /// Check whether a run in this state may move to `requested`.
    ///
    /// Returns the schedule event to stamp for the transition.
    ///
    /// # Errors
    ///
    /// Returns `IllegalTransition` if the life cycle forbids the change.
    pub fn transition_to(&self, requested: &Self) -> Result<ScheduleEvent> {
        let event = match (requested, self) {
            (Self::Idle, _) => None,
            (Self::Running, Self::Idle) => Some(ScheduleEvent::Started),
            (Self::Running, Self::Running | Self::Failed { .. } | Self::Success { .. }) => None,
            (Self::Failed { .. }, Self::Idle | Self::Running) => Some(ScheduleEvent::Finished),
            (Self::Failed { .. }, Self::Failed { .. } | Self::Success { .. }) => None,
            (Self::Success { .. }, Self::Running) => Some(ScheduleEvent::Finished),
            (Self::Success { .. }, Self::Idle | Self::Failed { .. } | Self::Success { .. }) => {
                None
            }
        };
        event.ok_or(Error::IllegalTransition {
            from: self.tag(),
            to: requested.tag(),
        })
    }

    /// Serialize into the state document stored with a run.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Idle | Self::Running => serde_json::json!({ "type": self.tag() }),
            Self::Failed { errors } => serde_json::json!({ "type": self.tag(), "errors": errors }),
            Self::Success { model_output } => {
                serde_json::json!({ "type": self.tag(), "modelOutput": model_output })
            }
        }
    }

    /// Parse a stored state document.
    ///
    /// # Errors
    ///
    /// Returns `MalformedRecord` for an unknown tag or a missing payload.
    pub fn from_json(value: &Value) -> Result<Self> {
        Self::deserialize(value).map_err(|e| Error::MalformedRecord(format!("run state: {e}")))
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_predicates_exclusive() {
        let states = [
            RunState::Idle,
            RunState::Running,
            RunState::failed(["boom"]),
            RunState::success("out"),
        ];
        for state in &states {
            let flags = [
                state.is_idle(),
                state.is_running(),
                state.is_failed(),
                state.is_success(),
            ];
            assert_eq!(flags.iter().filter(|f| **f).count(), 1, "{state}");
        }
    }

    #[test]
    fn test_serialized_layout() {
        assert_eq!(RunState::Idle.to_json(), json!({"type": "IDLE"}));
        assert_eq!(RunState::Running.to_json(), json!({"type": "RUNNING"}));
        assert_eq!(
            RunState::failed(["Some error"]).to_json(),
            json!({"type": "FAILED", "errors": ["Some error"]})
        );
        assert_eq!(
            RunState::success("prediction-id").to_json(),
            json!({"type": "SUCCESS", "modelOutput": "prediction-id"})
        );
        // derived serde agrees with the explicit layout
        let state = RunState::success("prediction-id");
        assert_eq!(serde_json::to_value(&state).unwrap(), state.to_json());
    }

    #[test]
    fn test_from_json_requires_payload() {
        assert!(matches!(
            RunState::from_json(&json!({"type": "SUCCESS"})),
            Err(Error::MalformedRecord(_))
        ));
        assert!(matches!(
            RunState::from_json(&json!({"type": "FAILED"})),
            Err(Error::MalformedRecord(_))
        ));
        assert!(matches!(
            RunState::from_json(&json!({"type": "PAUSED"})),
            Err(Error::MalformedRecord(_))
        ));
        assert_eq!(
            RunState::from_json(&json!({"type": "FAILED", "errors": []})).unwrap(),
            RunState::Failed { errors: vec![] }
        );
    }

    #[test]
    fn test_failed_states_do_not_share_errors() {
        let mut first = RunState::failed(Vec::<String>::new());
        let second = RunState::failed(Vec::<String>::new());
        if let RunState::Failed { errors } = &mut first {
            errors.push("only here".into());
        }
        assert_eq!(second.errors(), Some(&[][..]));
    }

    #[test]
    fn test_transition_table() {
        assert!(RunState::Idle.transition_to(&RunState::Idle).is_err());
        assert_eq!(
            RunState::Idle.transition_to(&RunState::Running).unwrap(),
            ScheduleEvent::Started
        );
        assert_eq!(
            RunState::Idle.transition_to(&RunState::failed(["x"])).unwrap(),
            ScheduleEvent::Finished
        );
        assert!(RunState::Idle.transition_to(&RunState::success("x")).is_err());
        assert_eq!(
            RunState::Running.transition_to(&RunState::success("x")).unwrap(),
            ScheduleEvent::Finished
        );
        assert!(RunState::success("x")
            .transition_to(&RunState::failed(["x"]))
            .is_err());
        assert!(RunState::failed(["x"])
            .transition_to(&RunState::Running)
            .is_err());
    }
}
