//! Output normalization: from raw captured bytes to what gets persisted.
//!
//! Works on bytes throughout, so it is total over any device output and
//! never rewrites bytes that are not part of an escape sequence.

use std::borrow::Cow;
use std::sync::LazyLock;

use regex::bytes::Regex;

use crate::driver::{CapturedOutput, CleanedOutput};

/// ANSI escape: ESC, a byte in `@`..`_`, parameter bytes, intermediate
/// bytes, and a final byte.
static ANSI_ESCAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\x1B[@-_][0-?]*[ -/]*[@-~]").expect("ANSI escape pattern is valid")
});

/// Remove every complete ANSI escape sequence.
///
/// Incomplete sequences are left as they are.
pub fn strip_ansi(data: &[u8]) -> Cow<'_, [u8]> {
    ANSI_ESCAPE.replace_all(data, &b""[..])
}

/// Everything after the first line terminator, or nothing if there is none.
///
/// The first line of captured output is the device echoing the command.
pub fn drop_echo_line(data: &[u8]) -> &[u8] {
    match memchr::memchr(b'\n', data) {
        Some(pos) => &data[pos + 1..],
        None => &[],
    }
}

/// Strip control sequences and the command echo from captured output.
///
/// Single-line output (no line terminator at all) cleans to empty text.
/// On devices that do not echo commands this discards a genuine first line.
pub fn clean(captured: &CapturedOutput, issued_command: &str) -> CleanedOutput {
    let raw = captured.text();
    let stripped = strip_ansi(&raw);
    CleanedOutput {
        command: issued_command.to_string(),
        text: drop_echo_line(&stripped).to_vec(),
    }
}
