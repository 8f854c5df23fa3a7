//! Core types: audio states, transitions and the circular buffer.

pub mod audio_state;
pub mod ring_buffer;
pub mod transition;

pub use audio_state::AudioSignal;
pub use ring_buffer::CircularBuffer;
pub use transition::{AudioTransition, Observations, PathTransition, StatePair, Transition};
