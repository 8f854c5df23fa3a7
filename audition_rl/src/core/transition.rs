//! Transition types recorded from agent/room interaction.
//!
//! - `Transition<S>`: `(prev_state, action, reward, new_state)` generic over
//!   how audio states are referenced (`AudioSignal` in memory, `PathBuf` on disk)
//! - `StatePair<S>`: the two state references produced by a storage backend
//! - `Observations`: the regrouped `{prev_state, new_state}` pair handed to
//!   the dataset pipeline

use std::path::PathBuf;

use super::audio_state::AudioSignal;

/// One recorded step of agent/environment interaction.
///
/// The state type is fixed per buffer instance, so a buffer can never mix
/// in-memory signals and file paths.
#[derive(Debug, Clone, PartialEq)]
pub struct Transition<S> {
    /// State before the action
    pub prev_state: S,
    /// Discrete action index
    pub action: i64,
    /// Reward received for the action
    pub reward: f64,
    /// State after the action
    pub new_state: S,
}

impl<S> Transition<S> {
    /// Create a new transition.
    pub fn new(prev_state: S, action: i64, reward: f64, new_state: S) -> Self {
        Self {
            prev_state,
            action,
            reward,
            new_state,
        }
    }

    /// Build a transition from a persisted state pair.
    pub fn from_pair(states: StatePair<S>, action: i64, reward: f64) -> Self {
        Self::new(states.prev, action, reward, states.new)
    }

    /// Convert the state representation, keeping action and reward.
    pub fn map_states<T, E>(self, mut f: impl FnMut(S) -> Result<T, E>) -> Result<Transition<T>, E> {
        Ok(Transition {
            prev_state: f(self.prev_state)?,
            action: self.action,
            reward: self.reward,
            new_state: f(self.new_state)?,
        })
    }
}

/// Transition whose states live on disk.
pub type PathTransition = Transition<PathBuf>;

/// Transition whose states are held in memory.
pub type AudioTransition = Transition<AudioSignal>;

/// Previous/new state references returned by `StorageBackend::persist`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatePair<S> {
    /// Previous state reference
    pub prev: S,
    /// New state reference
    pub new: S,
}

/// Audio observations of one transition, grouped the way the dataset
/// pipeline expects them.
#[derive(Debug, Clone, PartialEq)]
pub struct Observations {
    /// Mixture before the action
    pub prev_state: AudioSignal,
    /// Mixture after the action
    pub new_state: AudioSignal,
}

impl Observations {
    /// Look up an observation by its record key (`prev_state` / `new_state`).
    pub fn get(&self, key: &str) -> Option<&AudioSignal> {
        match key {
            "prev_state" => Some(&self.prev_state),
            "new_state" => Some(&self.new_state),
            _ => None,
        }
    }
}

impl AudioTransition {
    /// Regroup both states under [`Observations`], returning `(observations, action, reward)`.
    pub fn into_observations(self) -> (Observations, i64, f64) {
        (
            Observations {
                prev_state: self.prev_state,
                new_state: self.new_state,
            },
            self.action,
            self.reward,
        )
    }
}
