//! Command parser - splits prefixed text into keyword and arguments

/// Recognizes command invocations by prefix. The configured prefix and a
/// bare `.` both work, matching long-standing user habit.
pub struct MessageParser {
    prefix: String,
}

impl MessageParser {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Parse text into `(keyword, args)` if it is a command invocation.
    /// The keyword is lowercase-normalized; a bare prefix is not a command.
    pub fn parse_command(&self, text: &str) -> Option<(String, Vec<String>)> {
        let rest = text
            .strip_prefix(&self.prefix)
            .or_else(|| text.strip_prefix('.'))?;

        let mut parts = rest.split_whitespace();
        let keyword = parts.next()?.to_lowercase();
        let args = parts.map(str::to_string).collect();

        Some((keyword, args))
    }
}
