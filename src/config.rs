// ABOUTME: Version and REPL constants

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const WELCOME_MESSAGE: &str = "lyre - a small homoiconic Lisp";
pub const WELCOME_FOOTER: &str = "Use Ctrl-D to exit.";
pub const HISTORY_FILE: &str = ".lyre_history";
