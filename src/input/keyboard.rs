// Keyboard buttons: Up/W forward, Right/D right, Down/S reverse, Left/A left, Q/Esc/Ctrl+C quit

use crossterm::{
    event::{
        self, DisableFocusChange, EnableFocusChange, Event, KeyCode, KeyEvent, KeyEventKind,
        KeyModifiers, KeyboardEnhancementFlags, PopKeyboardEnhancementFlags,
        PushKeyboardEnhancementFlags,
    },
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, supports_keyboard_enhancement},
};
use std::io::stdout;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use super::{ButtonSampler, InputError};
use crate::messages::ButtonState;

const FORWARD: usize = 0;
const RIGHT: usize = 1;
const REVERSE: usize = 2;
const LEFT: usize = 3;

fn button_index(code: KeyCode) -> Option<usize> {
    match code {
        KeyCode::Up | KeyCode::Char('w') => Some(FORWARD),
        KeyCode::Right | KeyCode::Char('d') => Some(RIGHT),
        KeyCode::Down | KeyCode::Char('s') => Some(REVERSE),
        KeyCode::Left | KeyCode::Char('a') => Some(LEFT),
        _ => None,
    }
}

/// Turns key events into held buttons
///
/// Terminals without release reporting only send press and auto-repeat
/// events, so a key is treated as held for `hold` after the last one.
#[derive(Debug)]
pub struct KeyTracker {
    hold: Duration,
    release_events: bool,
    last_press: [Option<Instant>; 4],
    quit: bool,
}

impl KeyTracker {
    pub fn new(hold: Duration, release_events: bool) -> Self {
        Self {
            hold,
            release_events,
            last_press: [None; 4],
            quit: false,
        }
    }

    pub fn handle(&mut self, key: KeyEvent, now: Instant) {
        let pressed = key.kind == KeyEventKind::Press || key.kind == KeyEventKind::Repeat;

        match key.code {
            KeyCode::Char('c') if pressed && key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.quit = true;
            }
            KeyCode::Char('q') | KeyCode::Esc if pressed => self.quit = true,
            code => {
                if let Some(idx) = button_index(code) {
                    self.last_press[idx] = if pressed { Some(now) } else { None };
                }
            }
        }
    }

    /// Forget every held key; used when the terminal loses focus and
    /// release events can no longer arrive
    pub fn release_all(&mut self) {
        self.last_press = [None; 4];
    }

    pub fn quit_requested(&self) -> bool {
        self.quit
    }

    pub fn state(&self, now: Instant) -> ButtonState {
        let held = self.last_press.map(|last| match last {
            Some(_) if self.release_events => true,
            Some(at) => now.saturating_duration_since(at) < self.hold,
            None => false,
        });
        ButtonState::new(held[FORWARD], held[RIGHT], held[REVERSE], held[LEFT])
    }
}

/// Samples the four buttons from the terminal keyboard (raw mode)
pub struct KeyboardSampler {
    tracker: KeyTracker,
    enhanced: bool,
}

impl KeyboardSampler {
    /// Switch the terminal to raw mode; restored on drop
    pub fn new(hold: Duration) -> Result<Self, InputError> {
        enable_raw_mode()?;
        execute!(stdout(), EnableFocusChange)?;

        let enhanced = matches!(supports_keyboard_enhancement(), Ok(true));
        if enhanced {
            execute!(
                stdout(),
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
            info!("Keyboard reports key releases");
        } else {
            info!(
                "Keyboard without release events, holding keys for {}ms",
                hold.as_millis()
            );
        }

        info!("Controls: arrows/WASD = drive, Q/Esc = quit");
        Ok(Self {
            tracker: KeyTracker::new(hold, enhanced),
            enhanced,
        })
    }
}

impl ButtonSampler for KeyboardSampler {
    fn sample(&mut self) -> Result<Option<ButtonState>, InputError> {
        // Drain all pending events (non-blocking)
        while event::poll(Duration::ZERO)? {
            match event::read()? {
                Event::Key(key) => self.tracker.handle(key, Instant::now()),
                Event::FocusLost => {
                    debug!("Terminal lost focus, releasing all buttons");
                    self.tracker.release_all();
                }
                _ => {}
            }
        }

        if self.tracker.quit_requested() {
            debug!("Quit key pressed");
            return Ok(None);
        }
        Ok(Some(self.tracker.state(Instant::now())))
    }
}

impl Drop for KeyboardSampler {
    fn drop(&mut self) {
        if self.enhanced {
            if let Err(e) = execute!(stdout(), PopKeyboardEnhancementFlags) {
                warn!("Failed to restore keyboard flags: {}", e);
            }
        }
        if let Err(e) = execute!(stdout(), DisableFocusChange) {
            warn!("Failed to disable focus reporting: {}", e);
        }
        if let Err(e) = disable_raw_mode() {
            warn!("Failed to leave raw mode: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(code: KeyCode, kind: KeyEventKind) -> KeyEvent {
        KeyEvent::new_with_kind(code, KeyModifiers::NONE, kind)
    }

    #[test]
    fn test_hold_window_without_release_events() {
        let start = Instant::now();
        let mut tracker = KeyTracker::new(Duration::from_millis(100), false);

        tracker.handle(key(KeyCode::Up, KeyEventKind::Press), start);
        tracker.handle(key(KeyCode::Char('d'), KeyEventKind::Press), start);
        assert_eq!(
            tracker.state(start + Duration::from_millis(50)),
            ButtonState::new(true, true, false, false)
        );

        // Repeat keeps forward alive, right expires
        tracker.handle(
            key(KeyCode::Up, KeyEventKind::Repeat),
            start + Duration::from_millis(90),
        );
        assert_eq!(
            tracker.state(start + Duration::from_millis(150)),
            ButtonState::new(true, false, false, false)
        );
        assert!(!tracker.state(start + Duration::from_millis(300)).any_pressed());
    }

    #[test]
    fn test_release_events() {
        let start = Instant::now();
        let mut tracker = KeyTracker::new(Duration::from_millis(100), true);

        tracker.handle(key(KeyCode::Down, KeyEventKind::Press), start);
        tracker.handle(key(KeyCode::Char('a'), KeyEventKind::Press), start);
        // Held well past the hold window
        let later = start + Duration::from_secs(5);
        assert_eq!(tracker.state(later), ButtonState::new(false, false, true, true));

        tracker.handle(key(KeyCode::Char('a'), KeyEventKind::Release), later);
        assert_eq!(tracker.state(later), ButtonState::new(false, false, true, false));
    }

    #[test]
    fn test_release_all_clears_stuck_keys() {
        let start = Instant::now();
        let mut tracker = KeyTracker::new(Duration::from_millis(100), true);

        tracker.handle(key(KeyCode::Up, KeyEventKind::Press), start);
        tracker.handle(key(KeyCode::Right, KeyEventKind::Press), start);
        assert!(tracker.state(start + Duration::from_secs(1)).any_pressed());

        // Focus moved away before the releases were reported
        tracker.release_all();
        assert!(!tracker.state(start + Duration::from_secs(1)).any_pressed());

        tracker.handle(key(KeyCode::Up, KeyEventKind::Press), start);
        assert_eq!(tracker.state(start), ButtonState::new(true, false, false, false));
    }

    #[test]
    fn test_quit_keys() {
        let now = Instant::now();
        let mut tracker = KeyTracker::new(Duration::from_millis(100), false);
        tracker.handle(key(KeyCode::Char('x'), KeyEventKind::Press), now);
        assert!(!tracker.quit_requested());
        assert!(!tracker.state(now).any_pressed());

        tracker.handle(
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
            now,
        );
        assert!(tracker.quit_requested());

        let mut tracker = KeyTracker::new(Duration::from_millis(100), false);
        tracker.handle(key(KeyCode::Esc, KeyEventKind::Press), now);
        assert!(tracker.quit_requested());
    }
}
