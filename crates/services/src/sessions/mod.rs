mod attempt;
mod engine;
mod launcher;
mod progress;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use attempt::{CurrentQuestion, PresentedQuestion};
pub use engine::TestSession;
pub use launcher::SessionLauncher;
pub use progress::{SessionPhase, SessionStatus};
