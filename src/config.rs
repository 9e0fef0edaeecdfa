/// External configuration loader.
///
/// Reads `config.toml` from the executable's directory (or CWD).
/// Falls back to sensible defaults if the file is missing or incomplete.

use serde::Deserialize;
use std::path::PathBuf;

// ── Public Config Struct ──

#[derive(Clone, Debug)]
pub struct GameConfig {
    pub timing: TimingConfig,
    pub player: PlayerConfig,
    pub gamepad: GamepadConfig,
    pub maps_dir: PathBuf,
    pub log_file: PathBuf,
    pub log_level: String,
}

#[derive(Clone, Debug)]
pub struct TimingConfig {
    pub tick_rate_ms: u64,
    pub level_base_secs: u64,     // level 1 budget
    pub level_step_secs: u64,     // removed per level after the first
    pub max_level: u32,
    pub puzzle_time_ms: u64,
    pub outcome_delay_ms: u64,    // board stays visible after solve / fail
    pub level_complete_delay_ms: u64,
    pub boost_duration_ms: u64,
    pub advisory_ms: u64,
}

#[derive(Clone, Debug)]
pub struct PlayerConfig {
    pub max_life: u32,
    pub base_speed: u32,
    pub boost_bonus: u32,
    pub move_cost: u32,  // speed points needed to cross one tile
    pub npc_speed: u32,
}

#[derive(Clone, Debug)]
pub struct GamepadConfig {
    pub confirm: Vec<String>,
    pub cancel: Vec<String>,
    pub pause: Vec<String>,
    pub undo: Vec<String>,
    pub redo: Vec<String>,
    pub reset: Vec<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        GameConfig::from_toml(TomlConfig::default(), &[])
    }
}

// ── TOML Schema (with serde defaults) ──

#[derive(Deserialize, Debug, Default)]
struct TomlConfig {
    #[serde(default)]
    timing: TomlTiming,
    #[serde(default)]
    player: TomlPlayer,
    #[serde(default)]
    gamepad: TomlGamepad,
    #[serde(default)]
    general: TomlGeneral,
}

#[derive(Deserialize, Debug)]
struct TomlTiming {
    #[serde(default = "default_tick_rate")]
    tick_rate_ms: u64,
    #[serde(default = "default_level_base")]
    level_base_secs: u64,
    #[serde(default = "default_level_step")]
    level_step_secs: u64,
    #[serde(default = "default_max_level")]
    max_level: u32,
    #[serde(default = "default_puzzle_time")]
    puzzle_time_ms: u64,
    #[serde(default = "default_outcome_delay")]
    outcome_delay_ms: u64,
    #[serde(default = "default_level_complete_delay")]
    level_complete_delay_ms: u64,
    #[serde(default = "default_boost_duration")]
    boost_duration_ms: u64,
    #[serde(default = "default_advisory")]
    advisory_ms: u64,
}

#[derive(Deserialize, Debug)]
struct TomlPlayer {
    #[serde(default = "default_max_life")]
    max_life: u32,
    #[serde(default = "default_base_speed")]
    base_speed: u32,
    #[serde(default = "default_boost_bonus")]
    boost_bonus: u32,
    #[serde(default = "default_move_cost")]
    move_cost: u32,
    #[serde(default = "default_npc_speed")]
    npc_speed: u32,
}

#[derive(Deserialize, Debug)]
struct TomlGamepad {
    #[serde(default = "default_confirm")]
    confirm: Vec<String>,
    #[serde(default = "default_cancel")]
    cancel: Vec<String>,
    #[serde(default = "default_pause")]
    pause: Vec<String>,
    #[serde(default = "default_undo")]
    undo: Vec<String>,
    #[serde(default = "default_redo")]
    redo: Vec<String>,
    #[serde(default = "default_reset")]
    reset: Vec<String>,
}

#[derive(Deserialize, Debug)]
struct TomlGeneral {
    #[serde(default = "default_maps_dir")]
    maps_dir: String,
    #[serde(default = "default_log_file")]
    log_file: String,
    #[serde(default = "default_log_level")]
    log_level: String,
}

// ── Defaults ──

fn default_tick_rate() -> u64 { 50 }
fn default_level_base() -> u64 { 420 }   // 7 minutes for level 1
fn default_level_step() -> u64 { 30 }    // level 10 ends up at 2:30
fn default_max_level() -> u32 { 10 }
fn default_puzzle_time() -> u64 { 15_000 }
fn default_outcome_delay() -> u64 { 2_000 }
fn default_level_complete_delay() -> u64 { 3_000 }
fn default_boost_duration() -> u64 { 10_000 }
fn default_advisory() -> u64 { 3_000 }

fn default_max_life() -> u32 { 6 }       // 3 hearts, 2 points each
fn default_base_speed() -> u32 { 4 }
fn default_boost_bonus() -> u32 { 2 }
fn default_move_cost() -> u32 { 12 }
fn default_npc_speed() -> u32 { 1 }

fn default_confirm() -> Vec<String> { vec!["A".into(), "Start".into()] }
fn default_cancel() -> Vec<String> { vec!["B".into()] }
fn default_pause() -> Vec<String> { vec!["Select".into()] }
fn default_undo() -> Vec<String> { vec!["L1".into()] }
fn default_redo() -> Vec<String> { vec!["R1".into()] }
fn default_reset() -> Vec<String> { vec!["Y".into()] }

fn default_maps_dir() -> String { "maps".into() }
fn default_log_file() -> String { "linefix.log".into() }
fn default_log_level() -> String { "info".into() }

impl Default for TomlTiming {
    fn default() -> Self {
        TomlTiming {
            tick_rate_ms: default_tick_rate(),
            level_base_secs: default_level_base(),
            level_step_secs: default_level_step(),
            max_level: default_max_level(),
            puzzle_time_ms: default_puzzle_time(),
            outcome_delay_ms: default_outcome_delay(),
            level_complete_delay_ms: default_level_complete_delay(),
            boost_duration_ms: default_boost_duration(),
            advisory_ms: default_advisory(),
        }
    }
}

impl Default for TomlPlayer {
    fn default() -> Self {
        TomlPlayer {
            max_life: default_max_life(),
            base_speed: default_base_speed(),
            boost_bonus: default_boost_bonus(),
            move_cost: default_move_cost(),
            npc_speed: default_npc_speed(),
        }
    }
}

impl Default for TomlGamepad {
    fn default() -> Self {
        TomlGamepad {
            confirm: default_confirm(),
            cancel: default_cancel(),
            pause: default_pause(),
            undo: default_undo(),
            redo: default_redo(),
            reset: default_reset(),
        }
    }
}

impl Default for TomlGeneral {
    fn default() -> Self {
        TomlGeneral {
            maps_dir: default_maps_dir(),
            log_file: default_log_file(),
            log_level: default_log_level(),
        }
    }
}

// ── Loading ──

impl GameConfig {
    /// Load config from `config.toml`.
    /// Search order: (1) exe directory, (2) current working directory.
    /// Missing file or missing keys gracefully fall back to defaults.
    pub fn load() -> Self {
        let search_dirs = candidate_dirs();
        let toml_cfg = load_toml(&search_dirs);
        GameConfig::from_toml(toml_cfg, &search_dirs)
    }

    /// Parse a config document without searching for the maps directory.
    #[allow(dead_code)]
    pub fn parse(text: &str) -> Result<Self, toml::de::Error> {
        let toml_cfg = toml::from_str::<TomlConfig>(text)?;
        Ok(GameConfig::from_toml(toml_cfg, &[]))
    }

    fn from_toml(toml_cfg: TomlConfig, search_dirs: &[PathBuf]) -> Self {
        let maps_dir_str = &toml_cfg.general.maps_dir;
        let maps_dir = if PathBuf::from(maps_dir_str).is_absolute() {
            PathBuf::from(maps_dir_str)
        } else {
            search_dirs.iter()
                .map(|d| d.join(maps_dir_str))
                .find(|p| p.is_dir())
                .unwrap_or_else(|| PathBuf::from(maps_dir_str))
        };

        let t = toml_cfg.timing;
        let p = toml_cfg.player;
        let g = toml_cfg.gamepad;

        GameConfig {
            timing: TimingConfig {
                tick_rate_ms: t.tick_rate_ms.max(1),
                level_base_secs: t.level_base_secs,
                level_step_secs: t.level_step_secs,
                max_level: t.max_level.max(1),
                puzzle_time_ms: t.puzzle_time_ms,
                outcome_delay_ms: t.outcome_delay_ms,
                level_complete_delay_ms: t.level_complete_delay_ms,
                boost_duration_ms: t.boost_duration_ms,
                advisory_ms: t.advisory_ms,
            },
            player: PlayerConfig {
                max_life: p.max_life.max(1),
                base_speed: p.base_speed,
                boost_bonus: p.boost_bonus,
                move_cost: p.move_cost.max(1),
                npc_speed: p.npc_speed,
            },
            gamepad: GamepadConfig {
                confirm: g.confirm,
                cancel: g.cancel,
                pause: g.pause,
                undo: g.undo,
                redo: g.redo,
                reset: g.reset,
            },
            maps_dir,
            log_file: PathBuf::from(toml_cfg.general.log_file),
            log_level: toml_cfg.general.log_level,
        }
    }
}

/// Candidate directories to search: exe dir + CWD + system paths (deduplicated).
fn candidate_dirs() -> Vec<PathBuf> {
    let mut dirs = vec![];

    // 1. Directory of the running executable
    if let Ok(exe) = std::env::current_exe() {
        let resolved = exe.canonicalize().unwrap_or(exe);
        if let Some(parent) = resolved.parent() {
            dirs.push(parent.to_path_buf());
        }
    }

    // 2. Current working directory
    if let Ok(cwd) = std::env::current_dir() {
        if !dirs.iter().any(|d| d == &cwd) {
            dirs.push(cwd);
        }
    }

    // 3. XDG data home (~/.local/share/linefix)
    if let Ok(home) = std::env::var("HOME") {
        let xdg = PathBuf::from(&home).join(".local/share/linefix");
        if xdg.is_dir() && !dirs.iter().any(|d| d == &xdg) {
            dirs.push(xdg);
        }
    }

    // 4. System data directory (/usr/share/linefix)
    let sys = PathBuf::from("/usr/share/linefix");
    if sys.is_dir() && !dirs.iter().any(|d| d == &sys) {
        dirs.push(sys);
    }

    if dirs.is_empty() {
        dirs.push(PathBuf::from("."));
    }

    dirs
}

/// Search for config.toml in candidate directories.
///
/// Runs before the log subscriber exists, so problems go to stderr.
fn load_toml(search_dirs: &[PathBuf]) -> TomlConfig {
    for dir in search_dirs {
        let path = dir.join("config.toml");
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(text) => match toml::from_str::<TomlConfig>(&text) {
                    Ok(cfg) => return cfg,
                    Err(e) => {
                        eprintln!("Warning: config.toml parse error: {e}");
                        eprintln!("Using default settings.");
                        return TomlConfig::default();
                    }
                },
                Err(e) => {
                    eprintln!("Warning: could not read {}: {e}", path.display());
                }
            }
        }
    }
    TomlConfig::default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_uses_defaults() {
        let cfg = GameConfig::parse("").unwrap();
        assert_eq!(cfg.timing.level_base_secs, 420);
        assert_eq!(cfg.timing.level_step_secs, 30);
        assert_eq!(cfg.timing.max_level, 10);
        assert_eq!(cfg.timing.puzzle_time_ms, 15_000);
        assert_eq!(cfg.timing.outcome_delay_ms, 2_000);
        assert_eq!(cfg.timing.boost_duration_ms, 10_000);
        assert_eq!(cfg.player.max_life, 6);
        assert_eq!(cfg.player.base_speed, 4);
    }

    #[test]
    fn partial_section_keeps_other_defaults() {
        let cfg = GameConfig::parse("[timing]\npuzzle_time_ms = 9000\n").unwrap();
        assert_eq!(cfg.timing.puzzle_time_ms, 9000);
        assert_eq!(cfg.timing.tick_rate_ms, 50);
        assert_eq!(cfg.player.boost_bonus, 2);
    }

    #[test]
    fn degenerate_values_are_clamped() {
        let cfg = GameConfig::parse(
            "[timing]\ntick_rate_ms = 0\nmax_level = 0\n[player]\nmove_cost = 0\nmax_life = 0\n",
        ).unwrap();
        assert_eq!(cfg.timing.tick_rate_ms, 1);
        assert_eq!(cfg.timing.max_level, 1);
        assert_eq!(cfg.player.move_cost, 1);
        assert_eq!(cfg.player.max_life, 1);
    }

    #[test]
    fn malformed_document_is_an_error() {
        assert!(GameConfig::parse("[timing\n").is_err());
    }
}
