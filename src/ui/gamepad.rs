/// Gamepad input tracker using gilrs.
///
/// Button mapping comes from the `[gamepad]` section of config.toml via
/// `load_button_config()`. Default mapping:
///   D-pad / Left Stick    →  Movement, menu navigation
///   A / Start             →  Confirm
///   B                     →  Back / Settings
///   Select                →  Pause
///   L1 / R1               →  Undo / Redo (wire puzzle)
///   Y                     →  Reset wires

#[cfg(feature = "gamepad")]
use gilrs::{Axis, Button, EventType, Gilrs};
use tracing::info;

use crate::config::GamepadConfig;

#[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
const STICK_DEADZONE: f32 = 0.25;

/// Logical button identifiers (one per physical button).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum Btn {
    A,       // South
    B,       // East
    X,       // West
    Y,       // North
    L1,      // LeftTrigger
    R1,      // RightTrigger
    L2,      // LeftTrigger2
    R2,      // RightTrigger2
    Start,
    Select,
}

impl Btn {
    fn from_name(s: &str) -> Option<Btn> {
        match s.to_uppercase().as_str() {
            "A" | "SOUTH"  => Some(Btn::A),
            "B" | "EAST"   => Some(Btn::B),
            "X" | "WEST"   => Some(Btn::X),
            "Y" | "NORTH"  => Some(Btn::Y),
            "L1" | "LB" | "LEFTTRIGGER"  => Some(Btn::L1),
            "R1" | "RB" | "RIGHTTRIGGER" => Some(Btn::R1),
            "L2" | "LT" | "LEFTTRIGGER2"  => Some(Btn::L2),
            "R2" | "RT" | "RIGHTTRIGGER2" => Some(Btn::R2),
            "START" => Some(Btn::Start),
            "SELECT" | "BACK" => Some(Btn::Select),
            _ => None,
        }
    }

    #[cfg(feature = "gamepad")]
    fn from_gilrs(btn: Button) -> Option<Btn> {
        match btn {
            Button::South         => Some(Btn::A),
            Button::East          => Some(Btn::B),
            Button::West          => Some(Btn::X),
            Button::North         => Some(Btn::Y),
            Button::LeftTrigger   => Some(Btn::L1),
            Button::RightTrigger  => Some(Btn::R1),
            Button::LeftTrigger2  => Some(Btn::L2),
            Button::RightTrigger2 => Some(Btn::R2),
            Button::Start         => Some(Btn::Start),
            Button::Select        => Some(Btn::Select),
            _ => None,
        }
    }
}

/// Per-button state: held (continuous) and just_pressed (edge).
#[derive(Clone, Copy, Debug, Default)]
struct BtnState {
    held: bool,
    just_pressed: bool,
}

impl BtnState {
    fn set(&mut self, held: bool) {
        if held && !self.held {
            self.just_pressed = true;
        }
        self.held = held;
    }
}

/// Logical gamepad actions with a configurable button list.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PadAction {
    Confirm,
    Cancel,
    Pause,
    Undo,
    Redo,
    Reset,
}

/// Action-to-button mapping (loaded from config).
#[derive(Debug)]
struct ActionMap {
    confirm: Vec<Btn>,
    cancel: Vec<Btn>,
    pause: Vec<Btn>,
    undo: Vec<Btn>,
    redo: Vec<Btn>,
    reset: Vec<Btn>,
}

impl Default for ActionMap {
    fn default() -> Self {
        ActionMap {
            confirm: vec![Btn::A, Btn::Start],
            cancel:  vec![Btn::B],
            pause:   vec![Btn::Select],
            undo:    vec![Btn::L1],
            redo:    vec![Btn::R1],
            reset:   vec![Btn::Y],
        }
    }
}

impl ActionMap {
    /// Empty or unrecognised lists keep the default.
    fn apply_config(&mut self, cfg: &GamepadConfig) {
        fn apply(slot: &mut Vec<Btn>, names: &[String]) {
            let parsed: Vec<Btn> = names.iter().filter_map(|s| Btn::from_name(s)).collect();
            if !parsed.is_empty() {
                *slot = parsed;
            }
        }
        apply(&mut self.confirm, &cfg.confirm);
        apply(&mut self.cancel, &cfg.cancel);
        apply(&mut self.pause, &cfg.pause);
        apply(&mut self.undo, &cfg.undo);
        apply(&mut self.redo, &cfg.redo);
        apply(&mut self.reset, &cfg.reset);
    }

    fn buttons(&self, action: PadAction) -> &[Btn] {
        match action {
            PadAction::Confirm => &self.confirm,
            PadAction::Cancel => &self.cancel,
            PadAction::Pause => &self.pause,
            PadAction::Undo => &self.undo,
            PadAction::Redo => &self.redo,
            PadAction::Reset => &self.reset,
        }
    }
}

/// D-pad or stick direction slots.
const UP: usize = 0;
const DOWN: usize = 1;
const LEFT: usize = 2;
const RIGHT: usize = 3;

pub struct GamepadState {
    #[cfg(feature = "gamepad")]
    gilrs: Option<Gilrs>,

    buttons: [BtnState; 10],
    dpad: [BtnState; 4],
    stick: [BtnState; 4],
    stick_x: f32,
    stick_y: f32,

    action_map: ActionMap,

    pub connected: bool,
}

fn btn_index(btn: Btn) -> usize {
    btn as usize
}

impl GamepadState {
    pub fn new() -> Self {
        #[cfg(feature = "gamepad")]
        let (gilrs_opt, connected) = match Gilrs::new() {
            Ok(g) => {
                let has_pad = g.gamepads().next().is_some();
                (Some(g), has_pad)
            }
            Err(e) => {
                tracing::warn!(error = %e, "gamepad backend unavailable, keyboard only");
                (None, false)
            }
        };
        #[cfg(not(feature = "gamepad"))]
        let connected = false;

        if connected {
            info!("gamepad connected");
        }

        GamepadState {
            #[cfg(feature = "gamepad")]
            gilrs: gilrs_opt,
            buttons: [BtnState::default(); 10],
            dpad: [BtnState::default(); 4],
            stick: [BtnState::default(); 4],
            stick_x: 0.0,
            stick_y: 0.0,
            action_map: ActionMap::default(),
            connected,
        }
    }

    /// Load button mapping from config.
    pub fn load_button_config(&mut self, cfg: &GamepadConfig) {
        self.action_map.apply_config(cfg);
    }

    pub fn update(&mut self) {
        self.clear_just_pressed();

        #[cfg(feature = "gamepad")]
        self.poll_gilrs();
    }

    #[cfg(feature = "gamepad")]
    fn poll_gilrs(&mut self) {
        let Some(gilrs) = &mut self.gilrs else { return };
        let events: Vec<_> = std::iter::from_fn(|| gilrs.next_event()).collect();

        for event in events {
            match event.event {
                EventType::ButtonPressed(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, true);
                }
                EventType::ButtonReleased(btn, _) => {
                    self.connected = true;
                    self.set_button(btn, false);
                }
                EventType::AxisChanged(axis, value, _) => {
                    self.connected = true;
                    match axis {
                        Axis::LeftStickX => self.stick_x = value,
                        Axis::LeftStickY => self.stick_y = value,
                        _ => {}
                    }
                }
                EventType::Connected => {
                    info!("gamepad connected");
                    self.connected = true;
                }
                EventType::Disconnected => {
                    info!("gamepad disconnected");
                    self.connected = false;
                    self.release_all();
                }
                _ => {}
            }
        }

        self.stick[LEFT].set(self.stick_x < -STICK_DEADZONE);
        self.stick[RIGHT].set(self.stick_x > STICK_DEADZONE);
        self.stick[UP].set(self.stick_y > STICK_DEADZONE);
        self.stick[DOWN].set(self.stick_y < -STICK_DEADZONE);
    }

    #[cfg(feature = "gamepad")]
    fn set_button(&mut self, gilrs_btn: Button, held: bool) {
        let slot = match gilrs_btn {
            Button::DPadUp => Some(UP),
            Button::DPadDown => Some(DOWN),
            Button::DPadLeft => Some(LEFT),
            Button::DPadRight => Some(RIGHT),
            _ => None,
        };
        if let Some(i) = slot {
            self.dpad[i].set(held);
            return;
        }
        if let Some(btn) = Btn::from_gilrs(gilrs_btn) {
            self.buttons[btn_index(btn)].set(held);
        }
    }

    // ── Action queries ──

    pub fn pressed(&self, action: PadAction) -> bool {
        self.action_map
            .buttons(action)
            .iter()
            .any(|&b| self.buttons[btn_index(b)].just_pressed)
    }

    // Movement (continuous, held)
    pub fn up_held(&self) -> bool { self.dpad[UP].held || self.stick[UP].held }
    pub fn down_held(&self) -> bool { self.dpad[DOWN].held || self.stick[DOWN].held }
    pub fn left_held(&self) -> bool { self.dpad[LEFT].held || self.stick[LEFT].held }
    pub fn right_held(&self) -> bool { self.dpad[RIGHT].held || self.stick[RIGHT].held }

    // Navigation (edge)
    pub fn up_pressed(&self) -> bool { self.dpad[UP].just_pressed || self.stick[UP].just_pressed }
    pub fn down_pressed(&self) -> bool { self.dpad[DOWN].just_pressed || self.stick[DOWN].just_pressed }
    pub fn left_pressed(&self) -> bool { self.dpad[LEFT].just_pressed || self.stick[LEFT].just_pressed }
    pub fn right_pressed(&self) -> bool { self.dpad[RIGHT].just_pressed || self.stick[RIGHT].just_pressed }

    // ── Internal ──

    fn clear_just_pressed(&mut self) {
        for b in self.buttons.iter_mut().chain(&mut self.dpad).chain(&mut self.stick) {
            b.just_pressed = false;
        }
    }

    #[cfg_attr(not(feature = "gamepad"), allow(dead_code))]
    fn release_all(&mut self) {
        for b in self.buttons.iter_mut().chain(&mut self.dpad).chain(&mut self.stick) {
            *b = BtnState::default();
        }
        self.stick_x = 0.0;
        self.stick_y = 0.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn button_names_are_case_insensitive() {
        assert_eq!(Btn::from_name("start"), Some(Btn::Start));
        assert_eq!(Btn::from_name("LB"), Some(Btn::L1));
        assert_eq!(Btn::from_name("back"), Some(Btn::Select));
        assert_eq!(Btn::from_name("turbo"), None);
    }

    #[test]
    fn config_overrides_only_valid_lists() {
        let mut map = ActionMap::default();
        let mut cfg = crate::config::GameConfig::default().gamepad;
        cfg.undo = vec!["X".into()];
        cfg.redo = vec!["nonsense".into()];
        map.apply_config(&cfg);
        assert_eq!(map.buttons(PadAction::Undo), &[Btn::X]);
        assert_eq!(map.buttons(PadAction::Redo), &[Btn::R1]);
        assert_eq!(map.buttons(PadAction::Confirm), &[Btn::A, Btn::Start]);
    }

    #[test]
    fn press_edge_clears_next_frame() {
        let mut s = BtnState::default();
        s.set(true);
        assert!(s.just_pressed && s.held);
        s.just_pressed = false;
        s.set(true);
        assert!(!s.just_pressed);
        s.set(false);
        assert!(!s.held);
    }
}
