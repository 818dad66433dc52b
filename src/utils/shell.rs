//! Shell quoting for assembled command lines.
//!
//! Jobs run through `sh -c` on Unix and `cmd /C` on Windows, so arguments
//! are quoted for whichever shell the spawner will hand them to.

/// Escape a value for use inside single quotes.
/// Replaces `'` with `'\''` (end quote, escaped quote, start quote).
pub fn escape_single_quote_content(value: &str) -> String {
    value.replace('\'', "'\\''")
}

// Characters that require quoting under sh
const SHELL_META: &[char] = &[
    ' ', '\t', '\n', '\'', '"', '\\', '$', '`', '!', '*', '?', '[', ']', '(', ')', '{', '}', '<',
    '>', '|', '&', ';', '#', '~',
];

// Characters that require quoting under cmd.exe. Single quotes and brackets
// are literal there.
const CMD_META: &[char] = &[' ', '\t', '"', '&', '|', '<', '>', '^', '(', ')', '%', '!'];

/// Quote a single argument for `sh -c`.
/// - Empty strings become `''`
/// - Strings with shell metacharacters are wrapped in single quotes
/// - Everything else passes through untouched
pub fn quote_posix_arg(arg: &str) -> String {
    if arg.is_empty() {
        return "''".to_string();
    }

    if !arg.contains(SHELL_META) {
        return arg.to_string();
    }

    format!("'{}'", escape_single_quote_content(arg))
}

/// Quote a single argument for `cmd /C`.
/// - Empty strings become `""`
/// - Strings with cmd metacharacters are wrapped in double quotes, with
///   embedded `"` doubled
/// - Everything else passes through untouched
pub fn quote_cmd_arg(arg: &str) -> String {
    if arg.is_empty() {
        return "\"\"".to_string();
    }

    if !arg.contains(CMD_META) {
        return arg.to_string();
    }

    format!("\"{}\"", arg.replace('"', "\"\""))
}

/// Quote a single argument for the platform shell.
pub fn quote_arg(arg: &str) -> String {
    if cfg!(windows) {
        quote_cmd_arg(arg)
    } else {
        quote_posix_arg(arg)
    }
}

/// Quote and join multiple arguments with single spaces.
pub fn quote_args<S: AsRef<str>>(args: &[S]) -> String {
    args.iter()
        .map(|a| quote_arg(a.as_ref()))
        .collect::<Vec<_>>()
        .join(" ")
}
