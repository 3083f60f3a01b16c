// Replays button frames from a JSON-lines script, one frame per cycle
//
// {"forward": true, "right": true}
// {}                                 <- all released
// # comment lines and blank lines are skipped

use std::collections::VecDeque;
use std::path::Path;
use tracing::info;

use super::{ButtonSampler, InputError};
use crate::messages::ButtonState;

pub struct ScriptedSampler {
    frames: VecDeque<ButtonState>,
}

impl ScriptedSampler {
    pub fn from_frames(frames: impl IntoIterator<Item = ButtonState>) -> Self {
        Self {
            frames: frames.into_iter().collect(),
        }
    }

    /// Load a script file
    pub fn load(path: &Path) -> Result<Self, InputError> {
        let raw = std::fs::read_to_string(path).map_err(|source| InputError::ReadScript {
            path: path.to_path_buf(),
            source,
        })?;
        let sampler = Self::parse(&raw)?;
        info!("Loaded {} frames from {}", sampler.remaining(), path.display());
        Ok(sampler)
    }

    pub fn parse(raw: &str) -> Result<Self, InputError> {
        let mut frames = VecDeque::new();
        for (idx, line) in raw.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let frame = serde_json::from_str(line)
                .map_err(|source| InputError::Script { line: idx + 1, source })?;
            frames.push_back(frame);
        }
        Ok(Self { frames })
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl ButtonSampler for ScriptedSampler {
    fn sample(&mut self) -> Result<Option<ButtonState>, InputError> {
        Ok(self.frames.pop_front())
    }
}
