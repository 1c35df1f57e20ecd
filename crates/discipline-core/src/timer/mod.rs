mod session;
mod ticker;

pub use session::{SessionId, SessionTimer, StoppedSession, TimerSnapshot, TimerState};
pub use ticker::{SharedTimer, Ticker, DEFAULT_TICK_INTERVAL};
