//! Captured and cleaned command output.
//!
//! Output stays as raw bytes from the channel to the sink. Switches are
//! free to send Latin-1 banners or descriptions, and nothing on the way
//! may rewrite them.

use std::borrow::Cow;
use std::time::Duration;

use bytes::Bytes;

/// Text accumulated by one paginated command execution.
///
/// Append-only while the command runs; once handed out by the executor
/// there is no way to mutate it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapturedOutput {
    command: String,
    chunks: Vec<Bytes>,
    pages: usize,
    prompt: String,
    elapsed: Duration,
}

impl CapturedOutput {
    pub(crate) fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    pub(crate) fn push(&mut self, chunk: Bytes) {
        self.chunks.push(chunk);
    }

    pub(crate) fn page_advanced(&mut self) {
        self.pages += 1;
    }

    pub(crate) fn finish(mut self, prompt: String, elapsed: Duration) -> Self {
        self.prompt = prompt;
        self.elapsed = elapsed;
        self
    }

    /// The command that produced this output.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Raw chunks in arrival order, one per pagination or prompt match.
    pub fn chunks(&self) -> &[Bytes] {
        &self.chunks
    }

    /// Number of pagination markers advanced past.
    pub fn pages(&self) -> usize {
        self.pages
    }

    /// The prompt that terminated the output; empty if it never appeared.
    pub fn prompt(&self) -> &str {
        &self.prompt
    }

    /// Time from sending the command to the final prompt.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// All chunks concatenated.
    pub fn text(&self) -> Vec<u8> {
        self.chunks.concat()
    }
}

/// Captured output with control sequences and the command echo removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanedOutput {
    /// The command the output belongs to.
    pub command: String,

    /// The cleaned bytes.
    pub text: Vec<u8>,
}

impl CleanedOutput {
    /// The text for display, with invalid UTF-8 replaced.
    pub fn text_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.text)
    }

    /// Check if the cleaned text is empty.
    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

impl std::fmt::Display for CleanedOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.text_lossy())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captured_output_concatenates_chunks() {
        let mut captured = CapturedOutput::new("show running-config");
        captured.push(Bytes::from_static(b"page one\r\n"));
        captured.page_advanced();
        captured.push(Bytes::from_static(b"page two\r\n"));
        let captured = captured.finish("switch#".to_string(), Duration::from_millis(5));

        assert_eq!(captured.command(), "show running-config");
        assert_eq!(captured.chunks().len(), 2);
        assert_eq!(captured.pages(), 1);
        assert_eq!(captured.prompt(), "switch#");
        assert_eq!(captured.text(), b"page one\r\npage two\r\n");
    }

    #[test]
    fn test_cleaned_output_display() {
        let cleaned = CleanedOutput {
            command: "show vlan".to_string(),
            text: b"VLAN 1\nname caf\xe9\n".to_vec(),
        };
        assert_eq!(cleaned.to_string(), "VLAN 1\nname caf\u{fffd}\n");
        assert_eq!(cleaned.text, b"VLAN 1\nname caf\xe9\n");
        assert!(!cleaned.is_empty());
    }
}
