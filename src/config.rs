// ABOUTME: Version, REPL strings, and process exit codes

pub const VERSION: &str = "1.0.0";

pub const WELCOME_MESSAGE: &str = "Lox Interpreter v1.0";
pub const WELCOME_SUBTITLE: &str = "A tree-walking Lox interpreter in Rust";
pub const WELCOME_FOOTER: &str = "Enter an empty line to exit";

pub const PROMPT: &str = "> ";
pub const HISTORY_FILE: &str = ".lox_history";

/// Exit code after static (lex/parse/resolve) errors in file mode.
pub const EXIT_STATIC_ERROR: i32 = 65;
/// Exit code after a runtime error in file mode.
pub const EXIT_RUNTIME_ERROR: i32 = 70;
