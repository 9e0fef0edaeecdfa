/// Keyboard and mouse state tracker.
///
/// Keys: which are held (continuous walking) and which were freshly pressed
/// this frame (menu navigation, hotkeys). Release events are honored when
/// the terminal's keyboard enhancement is active; otherwise a key counts as
/// released after `HOLD_TIMEOUT` without Press/Repeat.
///
/// Mouse: raw button/drag samples in terminal cells, for the puzzle board.
/// Translation to board units is the renderer's job, since it owns layout.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{
    self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton, MouseEventKind,
};

/// After this duration without a Press/Repeat event, consider the key released.
/// Only used when the terminal doesn't report Release events.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PointerKind {
    Down,
    Drag,
    Up,
}

/// One left-button mouse event in terminal cells.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct PointerSample {
    pub kind: PointerKind,
    pub col: u16,
    pub row: u16,
}

pub struct InputState {
    /// Timestamp of last Press/Repeat event for each key.
    last_active: HashMap<KeyCode, Instant>,

    /// Keys that went from "not held" to "held" during the last drain.
    fresh_presses: Vec<KeyCode>,

    /// Raw key events collected during drain.
    pub raw_events: Vec<KeyEvent>,

    /// Left-button mouse samples collected during drain, oldest first.
    pub pointer: Vec<PointerSample>,

    /// Whether to honor Release events.
    pub honor_release: bool,
}

impl InputState {
    pub fn new() -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            raw_events: Vec::with_capacity(8),
            pointer: Vec::with_capacity(8),
            honor_release: false,
        }
    }

    /// Drain all pending terminal events. Call once per frame.
    pub fn drain_events(&mut self) {
        self.fresh_presses.clear();
        self.raw_events.clear();
        self.pointer.clear();

        while poll(Duration::ZERO).unwrap_or(false) {
            match event::read() {
                Ok(Event::Key(key)) => self.on_key(key),
                Ok(Event::Mouse(m)) => {
                    let kind = match m.kind {
                        MouseEventKind::Down(MouseButton::Left) => PointerKind::Down,
                        MouseEventKind::Drag(MouseButton::Left) => PointerKind::Drag,
                        MouseEventKind::Up(MouseButton::Left) => PointerKind::Up,
                        _ => continue,
                    };
                    self.pointer.push(PointerSample { kind, col: m.column, row: m.row });
                }
                _ => {}
            }
        }

        let now = Instant::now();
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn on_key(&mut self, key: KeyEvent) {
        self.raw_events.push(key);
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            KeyEventKind::Release => {}
            _ => {
                let was_held = self.is_held(key.code);
                self.last_active.insert(key.code, Instant::now());
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    pub fn is_held(&self, code: KeyCode) -> bool {
        self.last_active
            .get(&code)
            .map_or(false, |t| t.elapsed() < HOLD_TIMEOUT)
    }

    pub fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.is_held(*c))
    }

    /// Was this key freshly pressed this frame? (edge trigger)
    pub fn was_pressed(&self, code: KeyCode) -> bool {
        self.fresh_presses.contains(&code)
    }

    pub fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.was_pressed(*c))
    }

    pub fn ctrl_c_pressed(&self) -> bool {
        self.raw_events.iter().any(|k| {
            k.modifiers.contains(KeyModifiers::CONTROL)
                && (k.code == KeyCode::Char('c') || k.code == KeyCode::Char('C'))
        })
    }
}
