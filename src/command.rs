//! Command protocol parser
//!
//! Turns one inbound line into a typed [`Command`]. All syntactic
//! validation happens here, so the routing engine only branches on the
//! variant and trusts the payload shape.
//!
//! Grammar (keyword is case-insensitive):
//! - anything not starting with `/` is plain chat, including the empty line
//! - `/msg @<name> <text>` with a non-empty name and non-empty text
//! - `/join <channel>` with exactly one space-free token
//! - `/leave`, `/list`, `/who`, `/quit` (trailing arguments are ignored)
//! - `/` alone is invalid; any other keyword is unknown
//!
//! Lines arrive as raw bytes; [`decode_line`] turns them into text first.

/// Client → Server command, borrowed from the input line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command<'a> {
    /// Chat text for the sender's channel
    Plain(&'a str),
    /// Private message; `target` excludes the `@`
    Msg { target: &'a str, text: &'a str },
    /// Join (or switch to) a channel
    Join(&'a str),
    /// Leave the current channel
    Leave,
    /// List active channels
    List,
    /// List members of the current channel
    Who,
    /// End the session
    Quit,
    /// Known command with malformed arguments, or a bare `/`
    Invalid,
    /// Unrecognized keyword, as typed
    Unknown(&'a str),
}

impl<'a> Command<'a> {
    /// Parse a line with its terminator already removed
    pub fn parse(line: &'a str) -> Self {
        let Some(rest) = line.strip_prefix('/') else {
            return Command::Plain(line);
        };

        let keyword_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let (keyword, args) = rest.split_at(keyword_end);
        let args = args.trim_start();

        if keyword.is_empty() {
            return Command::Invalid;
        }

        match keyword.to_ascii_lowercase().as_str() {
            "msg" => parse_msg(args),
            "join" => parse_join(args),
            "leave" => Command::Leave,
            "list" => Command::List,
            "who" => Command::Who,
            "quit" => Command::Quit,
            _ => Command::Unknown(keyword),
        }
    }

    /// Argument payload as the wire carried it
    ///
    /// `"@name text"` for a private message, the token for a join, the
    /// whole line for plain chat, empty otherwise.
    pub fn payload(&self) -> String {
        match self {
            Command::Plain(text) => (*text).to_string(),
            Command::Msg { target, text } => format!("@{target} {text}"),
            Command::Join(channel) => (*channel).to_string(),
            _ => String::new(),
        }
    }
}

/// Text of one raw inbound line, without a trailing `\r`
///
/// Returns `None` if the line is not valid UTF-8.
pub fn decode_line(raw: &[u8]) -> Option<&str> {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    std::str::from_utf8(raw).ok()
}

/// `@name text`: name at least one char, single space separator, text non-empty
fn parse_msg(args: &str) -> Command<'_> {
    let Some(addressed) = args.strip_prefix('@') else {
        return Command::Invalid;
    };
    let Some((target, text)) = addressed.split_once(' ') else {
        return Command::Invalid;
    };
    if target.is_empty() || text.is_empty() {
        return Command::Invalid;
    }
    Command::Msg { target, text }
}

/// Exactly one non-empty token without spaces
fn parse_join(args: &str) -> Command<'_> {
    if args.is_empty() || args.contains(' ') {
        return Command::Invalid;
    }
    Command::Join(args)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_line() {
        assert_eq!(decode_line(b"hello"), Some("hello"));
        assert_eq!(decode_line(b"/join #a\r"), Some("/join #a"));
        assert_eq!(decode_line(b""), Some(""));
        assert_eq!(decode_line("caf\u{e9}".as_bytes()), Some("caf\u{e9}"));
        assert_eq!(decode_line(b"caf\xe9"), None);
        assert_eq!(decode_line(b"\xff\r"), None);
    }

    #[test]
    fn test_valid_commands() {
        let cmd = Command::parse("/join #test");
        assert_eq!(cmd, Command::Join("#test"));
        assert_eq!(cmd.payload(), "#test");

        let cmd = Command::parse("/msg @gary hello");
        assert_eq!(
            cmd,
            Command::Msg {
                target: "gary",
                text: "hello"
            }
        );
        assert_eq!(cmd.payload(), "@gary hello");

        for (line, expected) in [
            ("/leave", Command::Leave),
            ("/list", Command::List),
            ("/who", Command::Who),
            ("/quit", Command::Quit),
        ] {
            let cmd = Command::parse(line);
            assert_eq!(cmd, expected);
            assert_eq!(cmd.payload(), "");
        }
    }

    #[test]
    fn test_malformed_msg() {
        assert_eq!(Command::parse("/msg gary hello"), Command::Invalid);
        assert_eq!(Command::parse("/msg @gary"), Command::Invalid);
        assert_eq!(Command::parse("/msg @gary "), Command::Invalid);
        assert_eq!(Command::parse("/msg @ hello"), Command::Invalid);
        assert_eq!(Command::parse("/msg"), Command::Invalid);
    }

    #[test]
    fn test_msg_keeps_text_verbatim() {
        assert_eq!(
            Command::parse("/msg @bob  two spaces"),
            Command::Msg {
                target: "bob",
                text: " two spaces"
            }
        );
    }

    #[test]
    fn test_malformed_join() {
        assert_eq!(Command::parse("/join "), Command::Invalid);
        assert_eq!(Command::parse("/join"), Command::Invalid);
        assert_eq!(Command::parse("/join bad chan"), Command::Invalid);
    }

    #[test]
    fn test_unknown_commands() {
        assert_eq!(Command::parse("/randocomando"), Command::Unknown("randocomando"));
        assert_eq!(Command::parse("/msggaryhello"), Command::Unknown("msggaryhello"));
        assert_eq!(Command::parse("/"), Command::Invalid);
        assert_eq!(Command::parse("/ join"), Command::Invalid);
    }

    #[test]
    fn test_non_commands() {
        assert_eq!(Command::parse(""), Command::Plain(""));
        assert_eq!(Command::parse("hello world"), Command::Plain("hello world"));
        assert_eq!(Command::parse(" /join #a"), Command::Plain(" /join #a"));

        let long = "a".repeat(1100);
        assert_eq!(Command::parse(&long), Command::Plain(long.as_str()));
    }

    #[test]
    fn test_case_insensitive_keyword() {
        assert_eq!(Command::parse("/JOIN #channel1"), Command::Join("#channel1"));
        assert_eq!(
            Command::parse("/Msg @bobbyf Yo"),
            Command::Msg {
                target: "bobbyf",
                text: "Yo"
            }
        );
        assert_eq!(Command::parse("/QuIt"), Command::Quit);
    }

    #[test]
    fn test_argument_free_commands_ignore_trailing_text() {
        assert_eq!(Command::parse("/leave now"), Command::Leave);
        assert_eq!(Command::parse("/who\t"), Command::Who);
    }
}
