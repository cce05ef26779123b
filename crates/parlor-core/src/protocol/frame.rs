//! Text frame codec for the session protocol.
//!
//! Wire format:
//! ```text
//! <command> [arg1] [arg2] ... [argN]
//! ```
//! Frames are UTF-8 text. Tokens are separated by a single space character;
//! the first token is the command name and the remaining tokens are
//! positional string arguments. There is no escaping model — arguments must
//! not themselves contain the delimiter. Message boundaries come entirely
//! from the transport's own framing, so there is no length prefix.
//!
//! This layer performs no validation of argument count or type. Unknown
//! commands are not rejected here either; classifying and handling them is
//! the dispatcher's responsibility. Handlers must tolerate missing trailing
//! arguments without tearing down the session.

/// A parsed wire frame: a command name plus its positional arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The first token of the frame. Empty when the frame itself was empty.
    pub command: String,
    /// The remaining tokens, in order. May be empty.
    pub args: Vec<String>,
}

/// Splits a raw frame into a command name and ordered argument list.
///
/// Splitting is on the single space character, matching the wire format.
/// Consecutive delimiters produce empty-string arguments rather than being
/// collapsed, so `format_frame` is the exact inverse.
///
/// # Examples
///
/// ```rust
/// use parlor_core::protocol::frame::parse_frame;
///
/// let frame = parse_frame("join-table _client_1 ideas chair");
/// assert_eq!(frame.command, "join-table");
/// assert_eq!(frame.args, vec!["_client_1", "ideas", "chair"]);
/// ```
pub fn parse_frame(raw: &str) -> Frame {
    let mut tokens = raw.split(' ');
    // `split` always yields at least one item, so this never panics.
    let command = tokens.next().unwrap_or_default().to_string();
    let args = tokens.map(str::to_string).collect();
    Frame { command, args }
}

/// Serializes a command name and argument list into a raw frame.
///
/// This is the exact inverse of [`parse_frame`]: tokens are joined with a
/// single space and nothing is quoted or escaped.
pub fn format_frame(command: &str, args: &[String]) -> String {
    if args.is_empty() {
        return command.to_string();
    }
    let mut out = String::with_capacity(command.len() + args.iter().map(|a| a.len() + 1).sum::<usize>());
    out.push_str(command);
    for arg in args {
        out.push(' ');
        out.push_str(arg);
    }
    out
}

// ── Tests ─────────────────────────────────────────────────────────────────────
