/// Fatal error type for the game binary.
///
/// Everything recoverable (missing maps, audio, gamepad, config) is
/// logged and replaced by a fallback where it happens; only terminal
/// setup/teardown failures travel up to `main`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GameError {
    #[error("terminal setup failed: {0}")]
    TerminalInit(#[source] std::io::Error),
    #[error("terminal restore failed: {0}")]
    TerminalCleanup(#[source] std::io::Error),
    #[error("render failed: {0}")]
    Render(#[source] std::io::Error),
}
