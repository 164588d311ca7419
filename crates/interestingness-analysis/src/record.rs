//! Interaction records captured from an agent's rollout
//!
//! A rollout is a flat sequence of [`InteractionRecord`]s, one per simulation
//! timestep. The position of a record in the sequence is its timestep; episode
//! structure is only encoded through the [`InteractionRecord::new_episode`]
//! marker (see [`episode`](crate::episode)).
//!
//! # Serialization
//!
//! Records are produced by an external rollout collector and read as JSON:
//!
//! ```json
//! [
//!   {
//!     "observation": "frames/000000.png",
//!     "action": [1.0, 0.0],
//!     "action_factors": [
//!       { "name": "move", "action": 1, "distributions": [[0.2, 0.8], [0.3, 0.7]] }
//!     ],
//!     "values": [0.41, 0.39],
//!     "new_episode": true
//!   }
//! ]
//! ```

use std::sync::Arc;

use serde::{Deserialize, Serialize};

/// The shared, read-only interaction trace handed to every analysis.
pub type Records = Arc<[InteractionRecord]>;

/// One timestep's snapshot of the agent's interaction with its environment.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InteractionRecord {
    /// Opaque reference to the observation (e.g. a frame path); never interpreted
    #[serde(default)]
    pub observation: Option<String>,
    /// Joint action taken at this timestep
    #[serde(default)]
    pub action: Vec<f64>,
    /// Per-factor breakdown of the action, when the action space is factored
    #[serde(default)]
    pub action_factors: Vec<ActionFactor>,
    /// Value estimates, one per ensemble member (length 1 for a single critic)
    #[serde(default)]
    pub values: Vec<f64>,
    /// Whether this record starts a new episode
    #[serde(default)]
    pub new_episode: bool,
}

/// A named sub-action of a factored action space.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionFactor {
    /// Name of the factor (e.g. `"move"`, `"camera"`)
    pub name: String,
    /// Index of the sub-action that was executed
    pub action: usize,
    /// One distribution over the factor's sub-actions per ensemble member
    #[serde(default)]
    pub distributions: Vec<Vec<f64>>,
}

impl InteractionRecord {
    /// Mean over the record's value estimates, or `None` without any.
    #[expect(clippy::cast_precision_loss)]
    #[must_use]
    pub fn mean_value(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    /// Names of the action factors, in order.
    pub fn factor_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.action_factors.iter().map(|f| f.name.as_str())
    }
}
