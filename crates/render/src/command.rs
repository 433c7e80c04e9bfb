//! Shell command highlighter
//!
//! Splits a command string on top-level `&&`, `||`, and `;`, keeping the
//! separators as their own styled tokens. Within each segment the first
//! whitespace-delimited word is the command name. A static, ordered
//! table maps well-known notable/dangerous commands to a human-readable
//! hint; first match wins. All of this is advisory display metadata and
//! never influences whether approval is required.

/// One styled token of a highlighted command string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandToken {
    /// The first word of a segment.
    Command(String),
    /// Everything after the command name within a segment.
    Argument(String),
    /// A top-level `&&`, `||`, or `;`.
    Separator(String),
}

/// Ordered pattern → hint table for notable commands. Matching is a
/// plain substring test against the full command string; the first
/// entry that matches supplies the hint.
const COMMAND_HINTS: &[(&str, &str)] = &[
    ("rm -rf", "Recursively force-deletes files and directories"),
    ("rm -fr", "Recursively force-deletes files and directories"),
    ("sudo rm", "Deletes files with elevated privileges"),
    ("git push --force", "Overwrites remote history"),
    ("git push -f", "Overwrites remote history"),
    ("git reset --hard", "Discards local changes irreversibly"),
    ("git clean -f", "Deletes untracked files"),
    ("| sh", "Pipes downloaded or generated text into a shell"),
    ("| bash", "Pipes downloaded or generated text into a shell"),
    ("chmod 777", "Makes files writable by every user"),
    ("chown -R", "Recursively changes file ownership"),
    ("mkfs", "Formats a filesystem, destroying its contents"),
    ("dd if=", "Low-level disk write"),
    ("npm install", "Installs packages and runs their install scripts"),
    ("pip install", "Installs packages into the environment"),
    ("sudo", "Runs with elevated privileges"),
];

/// Look up the human-readable hint for a command, if any.
pub fn command_hint(command: &str) -> Option<&'static str> {
    COMMAND_HINTS
        .iter()
        .find(|(pattern, _)| command.contains(pattern))
        .map(|(_, hint)| *hint)
}

/// Tokenize a command string for display.
pub fn highlight_command(command: &str) -> Vec<CommandToken> {
    let mut tokens = Vec::new();

    for piece in split_top_level(command) {
        match piece {
            Piece::Separator(sep) => tokens.push(CommandToken::Separator(sep.to_string())),
            Piece::Segment(segment) => {
                let trimmed = segment.trim();
                if trimmed.is_empty() {
                    continue;
                }
                match trimmed.split_once(char::is_whitespace) {
                    Some((name, rest)) => {
                        tokens.push(CommandToken::Command(name.to_string()));
                        tokens.push(CommandToken::Argument(rest.trim().to_string()));
                    }
                    None => tokens.push(CommandToken::Command(trimmed.to_string())),
                }
            }
        }
    }

    tokens
}

enum Piece<'a> {
    Segment(&'a str),
    Separator(&'a str),
}

/// Split on `&&`, `||`, `;` outside of single or double quotes.
fn split_top_level(command: &str) -> Vec<Piece<'_>> {
    let bytes = command.as_bytes();
    let mut pieces = Vec::new();
    let mut start = 0;
    let mut i = 0;
    let mut quote: Option<u8> = None;

    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) => {
                if b == q {
                    quote = None;
                }
                i += 1;
            }
            None => match b {
                b'\'' | b'"' => {
                    quote = Some(b);
                    i += 1;
                }
                b'&' | b'|' if i + 1 < bytes.len() && bytes[i + 1] == b => {
                    pieces.push(Piece::Segment(&command[start..i]));
                    pieces.push(Piece::Separator(&command[i..i + 2]));
                    i += 2;
                    start = i;
                }
                b';' => {
                    pieces.push(Piece::Segment(&command[start..i]));
                    pieces.push(Piece::Separator(&command[i..i + 1]));
                    i += 1;
                    start = i;
                }
                _ => i += 1,
            },
        }
    }

    if start < command.len() {
        pieces.push(Piece::Segment(&command[start..]));
    }

    pieces
}
