//! Process supervision: PID file management, shutdown signals, and the
//! launch sequence that ties configuration, telemetry, and the server
//! together.

mod errors;
mod guard;
mod launch;
mod shutdown;

pub use self::errors::{LaunchError, PidFileError};
pub use self::guard::PidFile;
pub use self::launch::{LaunchPlan, run_server, run_server_with};
pub use self::shutdown::{ShutdownError, ShutdownSignal, SystemShutdownSignal};

const PROCESS_TARGET: &str = concat!(env!("CARGO_PKG_NAME"), "::process");
