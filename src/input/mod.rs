// Button input for the control loop
//
// Provides:
// - Keyboard sampler (arrow keys / WASD as the four buttons)
// - Scripted sampler replaying JSON-lines frames

mod keyboard;
mod scripted;

pub use keyboard::{KeyTracker, KeyboardSampler};
pub use scripted::ScriptedSampler;

use std::path::PathBuf;

use crate::messages::ButtonState;

/// Error types for button input
#[derive(Debug, thiserror::Error)]
pub enum InputError {
    #[error("Terminal IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to read script {}: {source}", .path.display())]
    ReadScript {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid script frame on line {line}: {source}")]
    Script {
        line: usize,
        source: serde_json::Error,
    },
}

/// Source of one `ButtonState` per control cycle
pub trait ButtonSampler {
    /// Buttons held right now; `None` once the input has ended
    fn sample(&mut self) -> Result<Option<ButtonState>, InputError>;
}

impl<T: ButtonSampler + ?Sized> ButtonSampler for Box<T> {
    fn sample(&mut self) -> Result<Option<ButtonState>, InputError> {
        (**self).sample()
    }
}
