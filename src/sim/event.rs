/// Events emitted during a tick.
/// The presentation layer turns these into sound cues and screen effects.

use crate::domain::tools::ToolType;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum GameOverCause {
    TimeOut,
    OutOfLives,
    Victory,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GameEvent {
    // ── Play ──
    ToolPicked(ToolType),
    /// Duplicate tool, consumed without effect.
    ToolAlreadyHeld(ToolType),
    BoostPicked,
    PostBumped,

    // ── Menus ──
    MenuMoved,
    MenuConfirmed,
    Paused,
    Resumed,
    SettingsOpened,

    // ── Session ──
    LevelStarted { level: u32 },
    PuzzleStarted,
    PuzzleSolved,
    PuzzleFailed { life: u32 },
    PuzzleExited,
    LevelCompleted { level: u32 },
    GameOver(GameOverCause),
    QuitRequested,
}
