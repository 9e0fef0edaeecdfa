/// Session state machine: the top-level game phase and every transition
/// between phases.
///
/// ## Transition table
///
/// ┌───────────────┬──────────────────────────────────────┬──────────────────────────┐
/// │ From          │ Trigger                               │ To                       │
/// ├───────────────┼──────────────────────────────────────┼──────────────────────────┤
/// │ Title         │ Confirm on Start                      │ Playing (level 1)        │
/// │ Title         │ Confirm on Load Game                  │ LevelSelect              │
/// │ Title         │ Confirm on Quit / Quit                │ (exit requested)         │
/// │ LevelSelect   │ Confirm                               │ Playing (chosen level)   │
/// │ LevelSelect   │ Back                                  │ Title                    │
/// │ Playing       │ post bumped with all four tools       │ WirePuzzle               │
/// │ Playing       │ Pause                                 │ Paused                   │
/// │ Playing       │ Back                                  │ Settings                 │
/// │ Playing       │ level countdown hits zero             │ GameOver (TimeOut)       │
/// │ Paused        │ Pause / Confirm                       │ Playing                  │
/// │ Paused        │ Back                                  │ Settings                 │
/// │ Settings      │ Restart / Lobby / Quit / Back         │ Playing(1) / Title / exit / previous │
/// │ WirePuzzle    │ Solved, +outcome delay                │ Playing → LevelComplete  │
/// │ WirePuzzle    │ Failed, +outcome delay                │ Playing                  │
/// │ WirePuzzle    │ Failed with no life left              │ GameOver (OutOfLives)    │
/// │ WirePuzzle    │ Back while unresolved                 │ Playing                  │
/// │ LevelComplete │ +level-complete delay                 │ Playing (next) / GameOver (Victory) │
/// │ GameOver      │ Restart / Back / Quit                 │ Playing(1) / Title / exit │
/// └───────────────┴──────────────────────────────────────┴──────────────────────────┘
///
/// Within Playing the order per tick is: world step (and the puzzle
/// trigger), then pause/settings commands, then the level countdown.
///
/// Timed transitions go through the `DeadlineQueue`; every phase change
/// bumps its generation so a deferred action never fires in a phase it was
/// not scheduled for.

use rand::rngs::StdRng;
use tracing::{debug, info, warn};

use crate::config::{GameConfig, PlayerConfig, TimingConfig};
use crate::domain::entity::Direction;
use super::deadline::DeadlineQueue;
use super::event::{GameEvent, GameOverCause};
use super::maps::MapLibrary;
use super::progression::{Advance, LevelProgression};
use super::puzzle::{Outcome, WirePuzzle};
use super::step;
use super::world::World;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Phase {
    Title,
    LevelSelect,
    Playing,
    Paused,
    WirePuzzle,
    LevelComplete,
    GameOver,
    Settings,
}

/// A discrete player intent for one tick. Movement is carried separately
/// in `FrameInput` because it is held, not pressed.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Command {
    Up,
    Down,
    Left,
    Right,
    Confirm,
    Back,
    Pause,
    Undo,
    Redo,
    /// Disconnect every wire (puzzle) or cancel the current drag.
    ResetWires,
    Restart,
    Lobby,
    Quit,
    /// Pointer events in puzzle board units.
    PointerDown(i32, i32),
    PointerMove(i32, i32),
    PointerUp(i32, i32),
}

#[derive(Clone, Debug, Default)]
pub struct FrameInput {
    pub movement: Option<Direction>,
    pub commands: Vec<Command>,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum TitleItem {
    Start,
    LoadGame,
    Quit,
}

impl TitleItem {
    pub const ALL: [TitleItem; 3] = [TitleItem::Start, TitleItem::LoadGame, TitleItem::Quit];

    pub fn label(self) -> &'static str {
        match self {
            TitleItem::Start => "Start",
            TitleItem::LoadGame => "Load Game",
            TitleItem::Quit => "Quit",
        }
    }
}

/// Columns in the level select grid.
pub const SELECT_COLUMNS: u32 = 5;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum Deferred {
    /// Leave the puzzle once its outcome has been on screen long enough.
    PuzzleReturn,
    AdvanceLevel,
}

#[derive(Clone, Debug)]
struct Advisory {
    text: String,
    until_ms: u64,
}

pub struct GameMachine {
    phase: Phase,
    /// Where Back from Settings returns to.
    settings_return: Phase,
    game_over: Option<GameOverCause>,

    timing: TimingConfig,
    player_cfg: PlayerConfig,

    world: World,
    progression: LevelProgression,
    puzzle: WirePuzzle,
    deadlines: DeadlineQueue<Deferred>,
    maps: MapLibrary,
    rng: StdRng,

    title_cursor: usize,
    select_level: u32,
    /// Level shown on the LevelComplete screen.
    completed_level: u32,
    advisory: Option<Advisory>,
    quit: bool,
}

// ── Construction / accessors ──

impl GameMachine {
    pub fn new(config: &GameConfig, maps: MapLibrary, mut rng: StdRng) -> Self {
        let puzzle = WirePuzzle::new(config.timing.puzzle_time_ms, &mut rng);
        GameMachine {
            phase: Phase::Title,
            settings_return: Phase::Playing,
            game_over: None,
            timing: config.timing.clone(),
            player_cfg: config.player.clone(),
            world: World::new(&config.player),
            progression: LevelProgression::new(&config.timing),
            puzzle,
            deadlines: DeadlineQueue::new(),
            maps,
            rng,
            title_cursor: 0,
            select_level: 1,
            completed_level: 0,
            advisory: None,
            quit: false,
        }
    }

    pub fn phase(&self) -> Phase { self.phase }
    pub fn world(&self) -> &World { &self.world }
    pub fn world_mut(&mut self) -> &mut World { &mut self.world }
    pub fn progression(&self) -> &LevelProgression { &self.progression }
    pub fn puzzle(&self) -> &WirePuzzle { &self.puzzle }
    pub fn game_over_cause(&self) -> Option<GameOverCause> { self.game_over }
    pub fn title_item(&self) -> TitleItem { TitleItem::ALL[self.title_cursor] }
    pub fn selected_level(&self) -> u32 { self.select_level }
    pub fn completed_level(&self) -> u32 { self.completed_level }
    pub fn settings_return(&self) -> Phase { self.settings_return }
    pub fn quit_requested(&self) -> bool { self.quit }

    /// Current advisory message, while it is still showing.
    pub fn advisory(&self, now_ms: u64) -> Option<&str> {
        self.advisory
            .as_ref()
            .filter(|a| now_ms < a.until_ms)
            .map(|a| a.text.as_str())
    }

    fn advise(&mut self, text: String, now_ms: u64) {
        debug!(%text, "advisory");
        self.advisory = Some(Advisory { text, until_ms: now_ms + self.timing.advisory_ms });
    }

    fn set_phase(&mut self, to: Phase) {
        if to != self.phase {
            info!(from = ?self.phase, ?to, "phase change");
        }
        self.phase = to;
        self.deadlines.bump();
    }
}

// ══════════════════════════════════════════════════════════════
// Tick
// ══════════════════════════════════════════════════════════════

impl GameMachine {
    pub fn tick(&mut self, now_ms: u64, input: &FrameInput) -> Vec<GameEvent> {
        let mut events = Vec::new();

        for action in self.deadlines.pop_due(now_ms) {
            self.fire(action, now_ms, &mut events);
        }

        match self.phase {
            Phase::Title => self.tick_title(input, now_ms, &mut events),
            Phase::LevelSelect => self.tick_level_select(input, now_ms, &mut events),
            Phase::Playing => self.tick_playing(input, now_ms, &mut events),
            Phase::Paused => self.tick_paused(input, &mut events),
            Phase::Settings => self.tick_settings(input, now_ms, &mut events),
            Phase::WirePuzzle => self.tick_puzzle(input, now_ms, &mut events),
            Phase::LevelComplete => {}
            Phase::GameOver => self.tick_game_over(input, now_ms, &mut events),
        }
        events
    }

    fn fire(&mut self, action: Deferred, now_ms: u64, events: &mut Vec<GameEvent>) {
        match action {
            Deferred::PuzzleReturn => self.leave_resolved_puzzle(now_ms, events),
            Deferred::AdvanceLevel => match self.progression.advance(now_ms) {
                Advance::Next(level) => {
                    self.begin_level(now_ms, true);
                    events.push(GameEvent::LevelStarted { level });
                }
                Advance::GameComplete => self.end_game(GameOverCause::Victory, events),
            },
        }
    }

    // ── Menus ──

    fn tick_title(&mut self, input: &FrameInput, now_ms: u64, events: &mut Vec<GameEvent>) {
        let n = TitleItem::ALL.len();
        for &cmd in &input.commands {
            match cmd {
                Command::Up => {
                    self.title_cursor = (self.title_cursor + n - 1) % n;
                    events.push(GameEvent::MenuMoved);
                }
                Command::Down => {
                    self.title_cursor = (self.title_cursor + 1) % n;
                    events.push(GameEvent::MenuMoved);
                }
                Command::Confirm => {
                    events.push(GameEvent::MenuConfirmed);
                    match self.title_item() {
                        TitleItem::Start => self.start_new_game(1, now_ms, events),
                        TitleItem::LoadGame => {
                            self.select_level = 1;
                            self.set_phase(Phase::LevelSelect);
                        }
                        TitleItem::Quit => self.request_quit(events),
                    }
                    return;
                }
                Command::Quit => {
                    self.request_quit(events);
                    return;
                }
                _ => {}
            }
        }
    }

    fn tick_level_select(&mut self, input: &FrameInput, now_ms: u64, events: &mut Vec<GameEvent>) {
        let max = self.progression.max_level();
        for &cmd in &input.commands {
            let shift: i64 = match cmd {
                Command::Left => -1,
                Command::Right => 1,
                Command::Up => -(SELECT_COLUMNS as i64),
                Command::Down => SELECT_COLUMNS as i64,
                Command::Confirm => {
                    events.push(GameEvent::MenuConfirmed);
                    let level = self.select_level;
                    self.start_new_game(level, now_ms, events);
                    return;
                }
                Command::Back => {
                    self.set_phase(Phase::Title);
                    return;
                }
                Command::Quit => {
                    self.request_quit(events);
                    return;
                }
                _ => continue,
            };
            let idx = (self.select_level as i64 - 1 + shift).rem_euclid(max as i64);
            self.select_level = idx as u32 + 1;
            events.push(GameEvent::MenuMoved);
        }
    }

    // ── Playing ──

    fn tick_playing(&mut self, input: &FrameInput, now_ms: u64, events: &mut Vec<GameEvent>) {
        let stepped = step::step_play(
            &mut self.world,
            input.movement,
            now_ms,
            &self.player_cfg,
            self.timing.boost_duration_ms,
            &mut self.rng,
        );
        for ev in stepped {
            let bumped = ev == GameEvent::PostBumped;
            events.push(ev);
            if bumped && self.try_start_puzzle(now_ms, events) {
                return;
            }
        }

        for &cmd in &input.commands {
            match cmd {
                Command::Pause => {
                    self.set_phase(Phase::Paused);
                    events.push(GameEvent::Paused);
                    return;
                }
                Command::Back => {
                    self.open_settings(events);
                    return;
                }
                _ => {}
            }
        }

        if self.progression.tick(now_ms) {
            self.end_game(GameOverCause::TimeOut, events);
        }
    }

    /// The post was bumped: open the puzzle, or say what is missing.
    fn try_start_puzzle(&mut self, now_ms: u64, events: &mut Vec<GameEvent>) -> bool {
        let inv = &self.world.inventory;
        if !inv.is_complete() {
            let text = format!("Need {} more tools to repair!", inv.missing());
            self.advise(text, now_ms);
            return false;
        }
        self.puzzle.start(now_ms, &mut self.rng);
        self.set_phase(Phase::WirePuzzle);
        events.push(GameEvent::PuzzleStarted);
        true
    }

    fn tick_paused(&mut self, input: &FrameInput, events: &mut Vec<GameEvent>) {
        for &cmd in &input.commands {
            match cmd {
                Command::Pause | Command::Confirm => {
                    self.set_phase(Phase::Playing);
                    events.push(GameEvent::Resumed);
                    return;
                }
                Command::Back => {
                    self.open_settings(events);
                    return;
                }
                _ => {}
            }
        }
    }

    fn open_settings(&mut self, events: &mut Vec<GameEvent>) {
        self.settings_return = self.phase;
        self.set_phase(Phase::Settings);
        events.push(GameEvent::SettingsOpened);
    }

    fn tick_settings(&mut self, input: &FrameInput, now_ms: u64, events: &mut Vec<GameEvent>) {
        for &cmd in &input.commands {
            match cmd {
                Command::Restart => {
                    self.start_new_game(1, now_ms, events);
                    return;
                }
                Command::Lobby => {
                    self.set_phase(Phase::Title);
                    return;
                }
                Command::Quit => {
                    self.request_quit(events);
                    return;
                }
                Command::Back => {
                    self.set_phase(self.settings_return);
                    events.push(GameEvent::Resumed);
                    return;
                }
                _ => {}
            }
        }
    }

    // ── Wire puzzle ──

    fn tick_puzzle(&mut self, input: &FrameInput, now_ms: u64, events: &mut Vec<GameEvent>) {
        for &cmd in &input.commands {
            let p = &mut self.puzzle;
            match cmd {
                Command::PointerDown(x, y) => { p.pointer_down(x, y); }
                Command::PointerMove(x, y) => p.pointer_move(x, y),
                Command::PointerUp(x, y) => { p.pointer_up(x, y); }
                Command::Undo => {
                    if !p.undo() && !p.is_resolved() {
                        self.advise("Nothing to undo".to_string(), now_ms);
                    }
                }
                Command::Redo => {
                    if !p.redo() && !p.is_resolved() {
                        self.advise("Nothing to redo".to_string(), now_ms);
                    }
                }
                Command::ResetWires => {
                    if p.drag().is_some() {
                        p.cancel_drag();
                    } else {
                        p.disconnect_all();
                    }
                }
                Command::Back if !p.is_resolved() => {
                    p.cancel_drag();
                    self.set_phase(Phase::Playing);
                    events.push(GameEvent::PuzzleExited);
                    return;
                }
                _ => {}
            }
        }

        match self.puzzle.tick(now_ms) {
            Some(Outcome::Solved) => {
                if let Some(p) = self.world.player.player_state_mut() {
                    p.grant_boost(now_ms, self.timing.boost_duration_ms);
                }
                events.push(GameEvent::PuzzleSolved);
                self.deadlines.schedule(now_ms + self.timing.outcome_delay_ms, Deferred::PuzzleReturn);
            }
            Some(Outcome::Failed) => {
                let mut out_of_life = false;
                if self.puzzle.claim_life_penalty() {
                    out_of_life = self.world.player.damage(1);
                    events.push(GameEvent::PuzzleFailed { life: self.world.player.life });
                }
                if out_of_life {
                    self.end_game(GameOverCause::OutOfLives, events);
                } else {
                    self.deadlines.schedule(now_ms + self.timing.outcome_delay_ms, Deferred::PuzzleReturn);
                }
            }
            Some(Outcome::InProgress) | None => {}
        }
    }

    fn leave_resolved_puzzle(&mut self, now_ms: u64, events: &mut Vec<GameEvent>) {
        if self.phase != Phase::WirePuzzle {
            warn!(phase = ?self.phase, "puzzle return fired outside the puzzle");
            return;
        }
        match self.puzzle.outcome() {
            Outcome::Solved => {
                self.set_phase(Phase::Playing);
                self.world.remove_post();
                self.progression.stop();
                self.completed_level = self.progression.level();
                self.set_phase(Phase::LevelComplete);
                events.push(GameEvent::LevelCompleted { level: self.completed_level });
                self.deadlines.schedule(now_ms + self.timing.level_complete_delay_ms, Deferred::AdvanceLevel);
            }
            Outcome::Failed => {
                self.set_phase(Phase::Playing);
                events.push(GameEvent::PuzzleExited);
            }
            Outcome::InProgress => {}
        }
    }

    // ── Game over ──

    fn tick_game_over(&mut self, input: &FrameInput, now_ms: u64, events: &mut Vec<GameEvent>) {
        for &cmd in &input.commands {
            match cmd {
                Command::Restart | Command::Confirm => {
                    self.start_new_game(1, now_ms, events);
                    return;
                }
                Command::Back => {
                    self.set_phase(Phase::Title);
                    return;
                }
                Command::Quit => {
                    self.request_quit(events);
                    return;
                }
                _ => {}
            }
        }
    }

    fn end_game(&mut self, cause: GameOverCause, events: &mut Vec<GameEvent>) {
        info!(?cause, level = self.progression.level(), "game over");
        self.progression.stop();
        self.game_over = Some(cause);
        self.set_phase(Phase::GameOver);
        events.push(GameEvent::GameOver(cause));
    }

    fn request_quit(&mut self, events: &mut Vec<GameEvent>) {
        self.quit = true;
        events.push(GameEvent::QuitRequested);
    }

    // ── Level entry ──

    /// New game from `level`: no boost carried over.
    fn start_new_game(&mut self, level: u32, now_ms: u64, events: &mut Vec<GameEvent>) {
        self.progression.start_level(level, now_ms);
        self.begin_level(now_ms, false);
        events.push(GameEvent::LevelStarted { level: self.progression.level() });
    }

    /// Fresh level at the current progression level.
    fn begin_level(&mut self, now_ms: u64, keep_boost: bool) {
        let loaded = self.maps.load_level(&mut self.rng);
        self.world.populate(loaded, &self.player_cfg, keep_boost, &mut self.rng);
        self.puzzle.reset_puzzle(&mut self.rng);
        self.game_over = None;
        self.advisory = None;
        self.set_phase(Phase::Playing);
        debug!(level = self.progression.level(), now_ms, "level entered");
    }
}

// ══════════════════════════════════════════════════════════════
// Unit tests
// ══════════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::object::{ObjectKind, WorldObject};
    use crate::domain::tools::ToolType;
    use crate::sim::puzzle::WIRE_COUNT;
    use rand::SeedableRng;

    fn machine() -> GameMachine {
        GameMachine::new(&GameConfig::default(), MapLibrary::empty(), StdRng::seed_from_u64(42))
    }

    fn cmds(c: &[Command]) -> FrameInput {
        FrameInput { movement: None, commands: c.to_vec() }
    }

    fn idle() -> FrameInput {
        FrameInput::default()
    }

    /// Title → Start → Playing at `now`.
    fn playing(now: u64) -> GameMachine {
        let mut m = machine();
        m.tick(now, &cmds(&[Command::Confirm]));
        assert_eq!(m.phase(), Phase::Playing);
        m
    }

    /// Put the post right of the player and give them `tools` tools.
    fn stage_post(m: &mut GameMachine, tools: usize) {
        let w = m.world_mut();
        let (px, py) = w.player.pos();
        w.objects.retain(|o| o.kind != ObjectKind::Post);
        w.objects.retain(|o| (o.x, o.y) != (px + 1, py));
        w.npcs.clear();
        w.objects.push(WorldObject::new(ObjectKind::Post, px + 1, py));
        w.map.set(px + 1, py, crate::domain::tile::Tile::ROAD);
        for t in ToolType::ALL.iter().take(tools) {
            w.inventory.pick_up(*t);
        }
    }

    fn bump(m: &mut GameMachine, now: u64) -> Vec<GameEvent> {
        m.tick(now, &FrameInput { movement: Some(Direction::Right), commands: vec![] })
    }

    /// Connect every wire through pointer commands.
    fn solve(m: &mut GameMachine, now: u64) -> Vec<GameEvent> {
        let mut c = vec![];
        for w in m.puzzle().wires() {
            let (sx, sy) = m.puzzle().nodes()[w.start].centre();
            let (ex, ey) = m.puzzle().nodes()[w.end].centre();
            c.push(Command::PointerDown(sx, sy));
            c.push(Command::PointerMove(ex, ey));
            c.push(Command::PointerUp(ex, ey));
        }
        m.tick(now, &cmds(&c))
    }

    // ── Menus ──

    #[test]
    fn title_menu_wraps_and_routes() {
        let mut m = machine();
        assert_eq!(m.phase(), Phase::Title);
        m.tick(0, &cmds(&[Command::Up]));
        assert_eq!(m.title_item(), TitleItem::Quit);
        m.tick(0, &cmds(&[Command::Down, Command::Down]));
        assert_eq!(m.title_item(), TitleItem::LoadGame);
        m.tick(0, &cmds(&[Command::Confirm]));
        assert_eq!(m.phase(), Phase::LevelSelect);
        m.tick(0, &cmds(&[Command::Back]));
        assert_eq!(m.phase(), Phase::Title);
    }

    #[test]
    fn title_quit_requests_exit() {
        let mut m = machine();
        let ev = m.tick(0, &cmds(&[Command::Up, Command::Confirm]));
        assert!(m.quit_requested());
        assert!(ev.contains(&GameEvent::QuitRequested));
    }

    #[test]
    fn level_select_grid_wraps() {
        let mut m = machine();
        m.tick(0, &cmds(&[Command::Down, Command::Confirm]));
        m.tick(0, &cmds(&[Command::Left]));
        assert_eq!(m.selected_level(), 10);
        m.tick(0, &cmds(&[Command::Right, Command::Down]));
        assert_eq!(m.selected_level(), 6);
        m.tick(0, &cmds(&[Command::Down]));
        assert_eq!(m.selected_level(), 1);
        m.tick(0, &cmds(&[Command::Up, Command::Right, Command::Right]));
        assert_eq!(m.selected_level(), 8);

        let ev = m.tick(1_000, &cmds(&[Command::Confirm]));
        assert_eq!(m.phase(), Phase::Playing);
        assert_eq!(m.progression().level(), 8);
        assert!(ev.contains(&GameEvent::LevelStarted { level: 8 }));
        assert_eq!(m.progression().remaining_ms(1_000), 210_000);
    }

    #[test]
    fn fresh_level_is_fully_set_up() {
        let m = playing(0);
        let w = m.world();
        assert_eq!(w.inventory.count(), 0);
        assert_eq!(w.player.life, 6);
        assert!(w.post().is_some());
        assert_eq!(w.objects.len(), 6);
        assert_eq!(w.npcs.len(), 1);
    }

    // ── Scenario A: level timeout ──

    #[test]
    fn level_one_timeout_ends_the_game() {
        let mut m = playing(0);
        m.tick(419_999, &idle());
        assert_eq!(m.phase(), Phase::Playing);
        let ev = m.tick(420_000, &idle());
        assert_eq!(m.phase(), Phase::GameOver);
        assert_eq!(m.game_over_cause(), Some(GameOverCause::TimeOut));
        assert!(ev.contains(&GameEvent::GameOver(GameOverCause::TimeOut)));
    }

    #[test]
    fn paused_game_still_times_out_on_the_wall_clock() {
        let mut m = playing(0);
        m.tick(100, &cmds(&[Command::Pause]));
        assert_eq!(m.phase(), Phase::Paused);
        m.tick(150_000, &cmds(&[Command::Back]));
        assert_eq!(m.phase(), Phase::Settings);
        assert_eq!(m.settings_return(), Phase::Paused);
        m.tick(199_000, &cmds(&[Command::Back]));
        assert_eq!(m.phase(), Phase::Paused);
        m.tick(200_000, &cmds(&[Command::Pause]));
        assert_eq!(m.phase(), Phase::Playing);
        assert_eq!(m.progression().remaining_ms(300_000), 120_000);
        m.tick(419_950, &idle());
        assert_eq!(m.phase(), Phase::Playing);
        m.tick(420_000, &idle());
        assert_eq!(m.phase(), Phase::GameOver);
        assert_eq!(m.game_over_cause(), Some(GameOverCause::TimeOut));
    }

    #[test]
    fn expiry_while_paused_is_caught_on_the_first_playing_tick() {
        let mut m = playing(0);
        m.tick(1_000, &cmds(&[Command::Pause]));
        m.tick(500_000, &idle());
        assert_eq!(m.phase(), Phase::Paused);
        let ev = m.tick(500_050, &cmds(&[Command::Pause]));
        assert!(ev.contains(&GameEvent::Resumed));
        assert_eq!(m.phase(), Phase::Playing);
        m.tick(500_100, &idle());
        assert_eq!(m.phase(), Phase::GameOver);
        assert_eq!(m.game_over_cause(), Some(GameOverCause::TimeOut));
    }

    #[test]
    fn settings_restart_and_lobby() {
        let mut m = playing(0);
        m.tick(10, &cmds(&[Command::Back]));
        assert_eq!(m.phase(), Phase::Settings);
        assert_eq!(m.settings_return(), Phase::Playing);
        m.tick(20, &cmds(&[Command::Restart]));
        assert_eq!(m.phase(), Phase::Playing);
        assert_eq!(m.progression().level(), 1);
        m.tick(30, &cmds(&[Command::Back]));
        m.tick(40, &cmds(&[Command::Lobby]));
        assert_eq!(m.phase(), Phase::Title);
    }

    // ── Scenario B: trigger ──

    #[test]
    fn post_without_tools_gives_advisory() {
        let mut m = playing(0);
        stage_post(&mut m, 3);
        assert!(!m.world().inventory.is_complete());
        bump(&mut m, 50);
        assert_eq!(m.phase(), Phase::Playing);
        assert_eq!(m.advisory(60), Some("Need 1 more tools to repair!"));
        assert_eq!(m.advisory(3_050), None);
    }

    #[test]
    fn four_tools_open_a_fresh_puzzle() {
        let mut m = playing(0);
        stage_post(&mut m, 4);
        assert!(m.world().inventory.is_complete());
        let ev = bump(&mut m, 50);
        assert_eq!(m.phase(), Phase::WirePuzzle);
        assert!(ev.contains(&GameEvent::PuzzleStarted));
        let mut seen = [0; 8];
        for w in m.puzzle().wires() {
            assert!(!w.connected);
            seen[w.start] += 1;
            seen[w.end] += 1;
        }
        assert_eq!(seen, [1; 8]);
        assert_eq!(m.puzzle().remaining_ms(50), 15_000);
    }

    #[test]
    fn back_leaves_unresolved_puzzle_without_penalty() {
        let mut m = playing(0);
        stage_post(&mut m, 4);
        bump(&mut m, 50);
        m.tick(1_000, &cmds(&[Command::Back]));
        assert_eq!(m.phase(), Phase::Playing);
        assert_eq!(m.world().player.life, 6);
        assert!(m.world().post().is_some());
    }

    // ── Scenario C: solve ──

    #[test]
    fn solving_completes_the_level() {
        let mut m = playing(0);
        stage_post(&mut m, 4);
        bump(&mut m, 50);
        let ev = solve(&mut m, 5_000);
        assert!(ev.contains(&GameEvent::PuzzleSolved));
        assert_eq!(m.puzzle().connected_count(), WIRE_COUNT);
        assert_eq!(m.world().boost_remaining_ms(5_000), 10_000);

        m.tick(6_999, &idle());
        assert_eq!(m.phase(), Phase::WirePuzzle);
        let ev = m.tick(7_000, &idle());
        assert_eq!(m.phase(), Phase::LevelComplete);
        assert!(ev.contains(&GameEvent::LevelCompleted { level: 1 }));
        assert!(m.world().post().is_none());

        m.tick(9_999, &idle());
        assert_eq!(m.phase(), Phase::LevelComplete);
        let ev = m.tick(10_000, &idle());
        assert_eq!(m.phase(), Phase::Playing);
        assert!(ev.contains(&GameEvent::LevelStarted { level: 2 }));
        assert_eq!(m.progression().remaining_ms(10_000), 390_000);
        assert_eq!(m.world().boost_remaining_ms(10_000), 5_000);
        assert_eq!(m.world().boost_remaining_ms(15_000), 0);
    }

    // ── Scenario D: timeout ──

    #[test]
    fn puzzle_timeout_costs_one_life_once() {
        let mut m = playing(0);
        stage_post(&mut m, 4);
        bump(&mut m, 50);
        m.tick(15_049, &idle());
        assert_eq!(m.world().player.life, 6);
        let ev = m.tick(15_050, &idle());
        assert!(ev.contains(&GameEvent::PuzzleFailed { life: 5 }));
        m.tick(15_100, &idle());
        m.tick(16_000, &idle());
        assert_eq!(m.world().player.life, 5);
        assert_eq!(m.phase(), Phase::WirePuzzle);

        m.tick(17_050, &idle());
        assert_eq!(m.phase(), Phase::Playing);
        assert!(m.world().post().is_some());
    }

    #[test]
    fn puzzle_timeout_on_last_life_is_game_over() {
        let mut m = playing(0);
        stage_post(&mut m, 4);
        m.world_mut().player.life = 1;
        bump(&mut m, 50);
        m.tick(15_050, &idle());
        assert_eq!(m.phase(), Phase::GameOver);
        assert_eq!(m.game_over_cause(), Some(GameOverCause::OutOfLives));

        // The pending return must not pull the player back into Playing.
        m.tick(20_000, &idle());
        assert_eq!(m.phase(), Phase::GameOver);
    }

    #[test]
    fn undo_at_the_start_only_advises() {
        let mut m = playing(0);
        stage_post(&mut m, 4);
        bump(&mut m, 50);
        m.tick(100, &cmds(&[Command::Undo]));
        assert_eq!(m.phase(), Phase::WirePuzzle);
        assert_eq!(m.advisory(100), Some("Nothing to undo"));
        assert_eq!(m.puzzle().connected_count(), 0);
    }

    #[test]
    fn reset_key_cancels_a_drag_before_clearing_wires() {
        let mut m = playing(0);
        stage_post(&mut m, 4);
        bump(&mut m, 50);
        let w = m.puzzle().wires()[0];
        let (sx, sy) = m.puzzle().nodes()[w.start].centre();
        let (ex, ey) = m.puzzle().nodes()[w.end].centre();
        m.tick(100, &cmds(&[Command::PointerDown(sx, sy), Command::PointerUp(ex, ey)]));
        assert_eq!(m.puzzle().connected_count(), 1);

        let other = m.puzzle().wires()[1];
        let (ox, oy) = m.puzzle().nodes()[other.start].centre();
        m.tick(150, &cmds(&[Command::PointerDown(ox, oy)]));
        assert!(m.puzzle().drag().is_some());
        m.tick(200, &cmds(&[Command::ResetWires]));
        assert!(m.puzzle().drag().is_none());
        assert_eq!(m.puzzle().connected_count(), 1);

        m.tick(250, &cmds(&[Command::ResetWires]));
        assert_eq!(m.puzzle().connected_count(), 0);
        m.tick(300, &cmds(&[Command::Undo]));
        assert_eq!(m.puzzle().connected_count(), 1);
    }

    #[test]
    fn resolved_puzzle_ignores_back() {
        let mut m = playing(0);
        stage_post(&mut m, 4);
        bump(&mut m, 50);
        solve(&mut m, 1_000);
        m.tick(1_500, &cmds(&[Command::Back]));
        assert_eq!(m.phase(), Phase::WirePuzzle);
    }

    #[test]
    fn restart_drops_pending_transitions() {
        let mut m = playing(0);
        stage_post(&mut m, 4);
        bump(&mut m, 50);
        solve(&mut m, 1_000);
        // Force a game over, then restart before the return would fire.
        m.world_mut().player.life = 0;
        m.set_phase(Phase::GameOver);
        m.tick(1_500, &cmds(&[Command::Restart]));
        assert_eq!(m.phase(), Phase::Playing);
        m.tick(3_000, &idle());
        m.tick(10_000, &idle());
        assert_eq!(m.phase(), Phase::Playing);
        assert_eq!(m.progression().level(), 1);
    }

    // ── Scenario E: last level ──

    #[test]
    fn finishing_level_ten_is_victory() {
        let mut m = machine();
        m.tick(0, &cmds(&[Command::Down, Command::Confirm]));
        m.tick(0, &cmds(&[Command::Left, Command::Confirm]));
        assert_eq!(m.progression().level(), 10);
        stage_post(&mut m, 4);
        bump(&mut m, 50);
        solve(&mut m, 100);
        m.tick(2_100, &idle());
        assert_eq!(m.phase(), Phase::LevelComplete);
        let ev = m.tick(5_100, &idle());
        assert_eq!(m.phase(), Phase::GameOver);
        assert_eq!(m.game_over_cause(), Some(GameOverCause::Victory));
        assert!(ev.contains(&GameEvent::GameOver(GameOverCause::Victory)));

        m.tick(6_000, &cmds(&[Command::Back]));
        assert_eq!(m.phase(), Phase::Title);
    }
}
