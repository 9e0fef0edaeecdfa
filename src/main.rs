/// Entry point and game loop.

mod config;
mod domain;
mod error;
mod sim;
mod ui;

use std::fs::File;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crossterm::event::KeyCode;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use config::GameConfig;
use domain::entity::Direction;
use error::GameError;
use sim::event::{GameEvent, GameOverCause};
use sim::machine::{Command, FrameInput, GameMachine, Phase};
use sim::maps::MapLibrary;
use ui::gamepad::{GamepadState, PadAction};
use ui::input::{InputState, PointerKind};
use ui::renderer::{BoardLayout, PuzzleButton, Renderer};
use ui::sound::{Cue, SoundEngine};

const FRAME_SLEEP: Duration = Duration::from_millis(5);

fn main() {
    let config = GameConfig::load();
    init_tracing(&config);

    if let Err(e) = run(&config) {
        error!(error = %e, "fatal");
        eprintln!("{e}");
        std::process::exit(1);
    }

    println!();
    println!("Thanks for playing LineFix: Power Restoration!");
}

/// Log to the configured file; the terminal is in raw mode while playing.
/// `RUST_LOG` overrides the configured level.
fn init_tracing(config: &GameConfig) {
    let file = match File::create(&config.log_file) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Warning: cannot open log file {}: {e}", config.log_file.display());
            return;
        }
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .with_target(false)
        .init();
}

fn run(config: &GameConfig) -> Result<(), GameError> {
    info!(maps_dir = %config.maps_dir.display(), tick_ms = config.timing.tick_rate_ms, "starting");
    let maps = MapLibrary::scan(&config.maps_dir);
    info!(maps = ?maps.names(), "map library ready");
    let mut game = GameMachine::new(config, maps, StdRng::from_entropy());

    let mut renderer = Renderer::new();
    let enhanced_keys = match renderer.init() {
        Ok(v) => v,
        Err(e) => {
            let _ = renderer.cleanup();
            return Err(GameError::TerminalInit(e));
        }
    };

    let sound = SoundEngine::new();
    let result = game_loop(&mut game, &mut renderer, sound.as_ref(), config, enhanced_keys);

    renderer.cleanup().map_err(GameError::TerminalCleanup)?;
    result
}

fn game_loop(
    game: &mut GameMachine,
    renderer: &mut Renderer,
    sound: Option<&SoundEngine>,
    config: &GameConfig,
    enhanced_keys: bool,
) -> Result<(), GameError> {
    let mut kb = InputState::new();
    kb.honor_release = enhanced_keys;
    let mut gp = GamepadState::new();
    gp.load_button_config(&config.gamepad);

    let clock = Instant::now();
    let tick_rate = Duration::from_millis(config.timing.tick_rate_ms);
    let mut last_tick = Instant::now();
    let mut pending: Vec<Command> = Vec::new();
    let mut music_on = false;

    loop {
        kb.drain_events();
        gp.update();

        if kb.ctrl_c_pressed() {
            info!("ctrl-c");
            break;
        }

        pending.extend(read_commands(game.phase(), &kb, &gp, renderer.board()));
        renderer.fit_camera(game.world_mut());

        if last_tick.elapsed() >= tick_rate {
            let now_ms = clock.elapsed().as_millis() as u64;
            let input = FrameInput {
                movement: detect_movement(&kb, &gp),
                commands: std::mem::take(&mut pending),
            };
            let events = game.tick(now_ms, &input);
            process_sound_events(sound, &events);
            music_on = sync_music(sound, game.phase(), music_on);
            last_tick = Instant::now();

            if game.quit_requested() {
                break;
            }
        }

        renderer
            .render(game, clock.elapsed().as_millis() as u64)
            .map_err(GameError::Render)?;
        std::thread::sleep(FRAME_SLEEP);
    }

    Ok(())
}

// ── Sound ──

fn process_sound_events(sound: Option<&SoundEngine>, events: &[GameEvent]) {
    let Some(sfx) = sound else { return };
    for event in events {
        match event {
            GameEvent::ToolPicked(_)
            | GameEvent::MenuMoved
            | GameEvent::PuzzleSolved => sfx.play(Cue::Pickup),
            GameEvent::BoostPicked => sfx.play(Cue::Boost),
            GameEvent::MenuConfirmed
            | GameEvent::Resumed
            | GameEvent::LevelStarted { .. } => sfx.play(Cue::Confirm),
            GameEvent::LevelCompleted { .. }
            | GameEvent::GameOver(GameOverCause::Victory) => sfx.play(Cue::LevelComplete),
            _ => {}
        }
    }
}

/// Background music runs while a level is on screen.
fn sync_music(sound: Option<&SoundEngine>, phase: Phase, music_on: bool) -> bool {
    let want = matches!(phase, Phase::Playing | Phase::WirePuzzle | Phase::LevelComplete);
    if want != music_on {
        if let Some(sfx) = sound {
            if want { sfx.loop_music() } else { sfx.stop_music() }
        }
    }
    want
}

// ── Key Constants ──

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter, KeyCode::Char(' ')];
const KEYS_BACK: &[KeyCode] = &[KeyCode::Esc];
const KEYS_PAUSE: &[KeyCode] = &[KeyCode::Char('p'), KeyCode::Char('P')];
const KEYS_UNDO: &[KeyCode] = &[KeyCode::Char('z'), KeyCode::Char('Z')];
const KEYS_REDO: &[KeyCode] = &[KeyCode::Char('y'), KeyCode::Char('Y')];
const KEYS_RESET: &[KeyCode] = &[KeyCode::Char('r'), KeyCode::Char('R')];
const KEYS_LOBBY: &[KeyCode] = &[KeyCode::Char('l'), KeyCode::Char('L')];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Char('q'), KeyCode::Char('Q')];

fn detect_movement(kb: &InputState, gp: &GamepadState) -> Option<Direction> {
    if kb.any_held(KEYS_UP) || kb.any_pressed(KEYS_UP) || gp.up_held() {
        Some(Direction::Up)
    } else if kb.any_held(KEYS_DOWN) || kb.any_pressed(KEYS_DOWN) || gp.down_held() {
        Some(Direction::Down)
    } else if kb.any_held(KEYS_LEFT) || kb.any_pressed(KEYS_LEFT) || gp.left_held() {
        Some(Direction::Left)
    } else if kb.any_held(KEYS_RIGHT) || kb.any_pressed(KEYS_RIGHT) || gp.right_held() {
        Some(Direction::Right)
    } else {
        None
    }
}

/// Edge-triggered commands for this frame. R means "reset wires" on the
/// puzzle screen and "restart" everywhere else.
fn read_commands(phase: Phase, kb: &InputState, gp: &GamepadState, board: BoardLayout) -> Vec<Command> {
    let mut out = Vec::new();
    let mut push = |hit: bool, cmd: Command| {
        if hit {
            out.push(cmd);
        }
    };

    push(kb.any_pressed(KEYS_UP) || gp.up_pressed(), Command::Up);
    push(kb.any_pressed(KEYS_DOWN) || gp.down_pressed(), Command::Down);
    push(kb.any_pressed(KEYS_LEFT) || gp.left_pressed(), Command::Left);
    push(kb.any_pressed(KEYS_RIGHT) || gp.right_pressed(), Command::Right);
    push(kb.any_pressed(KEYS_CONFIRM) || gp.pressed(PadAction::Confirm), Command::Confirm);
    push(kb.any_pressed(KEYS_BACK) || gp.pressed(PadAction::Cancel), Command::Back);
    push(kb.any_pressed(KEYS_PAUSE) || gp.pressed(PadAction::Pause), Command::Pause);
    push(kb.any_pressed(KEYS_UNDO) || gp.pressed(PadAction::Undo), Command::Undo);
    push(kb.any_pressed(KEYS_REDO) || gp.pressed(PadAction::Redo), Command::Redo);
    push(kb.any_pressed(KEYS_LOBBY), Command::Lobby);
    push(kb.any_pressed(KEYS_QUIT), Command::Quit);

    let reset = kb.any_pressed(KEYS_RESET) || gp.pressed(PadAction::Reset);
    if phase == Phase::WirePuzzle {
        push(reset, Command::ResetWires);
        out.extend(pointer_commands(kb, board));
    } else {
        push(reset, Command::Restart);
    }
    out
}

/// Mouse samples → board-unit pointer commands or button presses.
fn pointer_commands(kb: &InputState, board: BoardLayout) -> Vec<Command> {
    let mut out = Vec::new();
    for s in &kb.pointer {
        let (col, row) = (s.col as usize, s.row as usize);
        let cmd = match s.kind {
            PointerKind::Down => match board.button_at(col, row) {
                Some(PuzzleButton::Undo) => Some(Command::Undo),
                Some(PuzzleButton::Redo) => Some(Command::Redo),
                Some(PuzzleButton::Reset) => Some(Command::ResetWires),
                Some(PuzzleButton::Exit) => Some(Command::Back),
                None => board.to_units(col, row, false).map(|(x, y)| Command::PointerDown(x, y)),
            },
            PointerKind::Drag => board.to_units(col, row, true).map(|(x, y)| Command::PointerMove(x, y)),
            PointerKind::Up => board.to_units(col, row, true).map(|(x, y)| Command::PointerUp(x, y)),
        };
        match cmd {
            Some(c) => out.push(c),
            None => debug!(col, row, "pointer event outside the board ignored"),
        }
    }
    out
}
