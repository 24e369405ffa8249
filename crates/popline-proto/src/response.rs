//! POP3 response grammars (client side).
//!
//! Five independent parsers over raw response lines as received from the
//! server, CRLF included. Each returns a three-way outcome so that a
//! "recognized but negative" reply (`-ERR`) is never conflated with a line
//! that conforms to no known grammar at all — the latter means the peer
//! cannot be trusted and is the caller's decision to abort or ignore.
//!
//! None of these parsers can panic; malformed peer output always reaches
//! the caller as [`ParseOutcome::Ambiguous`] or [`BodyLine::Ambiguous`].

use crate::types::{Greeting, ListEntry, Stat, UidlEntry};

/// Status indicator opening a positive single-line reply.
const OK: &str = "+OK";
/// Status indicator opening a negative single-line reply.
const ERR: &str = "-ERR";

/// Outcome of parsing one single-line response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome<T> {
    /// Well-formed `+OK` reply with its typed payload.
    Accepted(T),
    /// Well-formed `-ERR` reply; the server's diagnostic text.
    Rejected {
        /// Free text following `-ERR`.
        comment: String,
    },
    /// The line conforms to no known grammar. Do not trust the peer.
    Ambiguous,
}

impl<T> ParseOutcome<T> {
    /// Returns `true` for [`ParseOutcome::Ambiguous`].
    #[must_use]
    pub const fn is_ambiguous(&self) -> bool {
        matches!(self, Self::Ambiguous)
    }
}

/// Outcome of parsing one continuation line of a multi-line body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BodyLine<T> {
    /// One more data line.
    Data(T),
    /// The lone-period terminator; no further lines belong to this body.
    End,
    /// The line conforms to no known grammar. Do not trust the peer.
    Ambiguous,
}

/// Parses the connection greeting.
///
/// On `+OK` the comment is scanned for an APOP challenge of the form
/// `<digits.digits@domain>`; its absence means the server does not offer
/// APOP. The challenge is returned verbatim, brackets included, because
/// the APOP digest is computed over the exact advertised string.
#[must_use]
pub fn parse_greeting(line: &str) -> ParseOutcome<Greeting> {
    let Some((ok, comment)) = split_status(line) else {
        return ParseOutcome::Ambiguous;
    };
    if ok {
        ParseOutcome::Accepted(Greeting {
            apop_challenge: find_apop_challenge(comment),
            comment: comment.to_string(),
        })
    } else {
        ParseOutcome::Rejected {
            comment: comment.to_string(),
        }
    }
}

/// Parses a `STAT` reply: `+OK` followed by exactly two unsigned integers.
#[must_use]
pub fn parse_stat(line: &str) -> ParseOutcome<Stat> {
    let Some((ok, rest)) = split_status(line) else {
        return ParseOutcome::Ambiguous;
    };
    if !ok {
        return ParseOutcome::Rejected {
            comment: rest.to_string(),
        };
    }
    let mut fields = rest.split(' ');
    let (Some(messages), Some(total_bytes), None) =
        (fields.next(), fields.next(), fields.next())
    else {
        return ParseOutcome::Ambiguous;
    };
    match (parse_number::<u32>(messages), parse_number::<u64>(total_bytes)) {
        (Some(messages), Some(total_bytes)) => ParseOutcome::Accepted(Stat {
            messages,
            total_bytes,
        }),
        _ => ParseOutcome::Ambiguous,
    }
}

/// Classifies a reply by its leading status token.
///
/// Used for commands whose success carries no structured payload; the
/// remainder of the line is captured as a comment either way.
#[must_use]
pub fn parse_simple(line: &str) -> ParseOutcome<String> {
    match split_status(line) {
        Some((true, comment)) => ParseOutcome::Accepted(comment.to_string()),
        Some((false, comment)) => ParseOutcome::Rejected {
            comment: comment.to_string(),
        },
        None => ParseOutcome::Ambiguous,
    }
}

/// Returns `true` for the lone-period line terminating a multi-line body.
///
/// Continuation parsers check this before attempting their own grammar,
/// so a terminator is reported as "no more lines" rather than as data.
#[must_use]
pub fn is_terminator(line: &str) -> bool {
    line == ".\r\n"
}

/// Parses one `UIDL` continuation line: message number and a unique-id of
/// 1 to 70 printable ASCII characters.
#[must_use]
pub fn parse_uidl_line(line: &str) -> BodyLine<UidlEntry> {
    if is_terminator(line) {
        return BodyLine::End;
    }
    let Some(line) = line.strip_suffix("\r\n") else {
        return BodyLine::Ambiguous;
    };
    let Some((message, uid)) = line.split_once(' ') else {
        return BodyLine::Ambiguous;
    };
    let Some(message) = parse_number::<u32>(message) else {
        return BodyLine::Ambiguous;
    };
    let uid_ok = (1..=70).contains(&uid.len()) && uid.bytes().all(|b| (0x21..=0x7e).contains(&b));
    if !uid_ok {
        return BodyLine::Ambiguous;
    }
    BodyLine::Data(UidlEntry {
        message,
        uid: uid.to_string(),
    })
}

/// Parses one `LIST` continuation line: message number and size in octets.
#[must_use]
pub fn parse_list_line(line: &str) -> BodyLine<ListEntry> {
    if is_terminator(line) {
        return BodyLine::End;
    }
    let Some(line) = line.strip_suffix("\r\n") else {
        return BodyLine::Ambiguous;
    };
    let Some((message, bytes)) = line.split_once(' ') else {
        return BodyLine::Ambiguous;
    };
    match (parse_number::<u32>(message), parse_number::<u64>(bytes)) {
        (Some(message), Some(bytes)) => BodyLine::Data(ListEntry { message, bytes }),
        _ => BodyLine::Ambiguous,
    }
}

/// Parses one `TOP`/`RETR` continuation line.
///
/// A byte-stuffed `..` line is unescaped to a single `.`; every other line
/// is returned verbatim (RFC 1939 byte-stuffing transparency).
#[must_use]
pub fn parse_mail_line(line: &str) -> BodyLine<String> {
    if is_terminator(line) {
        return BodyLine::End;
    }
    if line == "..\r\n" {
        return BodyLine::Data(".".to_string());
    }
    match line.strip_suffix("\r\n") {
        Some(text) => BodyLine::Data(text.to_string()),
        None => BodyLine::Ambiguous,
    }
}

/// Splits a CRLF-terminated line into its status token and comment.
///
/// Returns `Some(true, comment)` for `+OK`, `Some(false, comment)` for
/// `-ERR`, and `None` when the line carries no leading status token, is
/// not CRLF-terminated, or embeds non-printable characters. The token
/// must be followed by a space or the end of line: `+OKAY` is nobody's
/// success indicator.
fn split_status(line: &str) -> Option<(bool, &str)> {
    let line = line.strip_suffix("\r\n")?;
    let (ok, rest) = if let Some(rest) = line.strip_prefix(OK) {
        (true, rest)
    } else if let Some(rest) = line.strip_prefix(ERR) {
        (false, rest)
    } else {
        return None;
    };
    let comment = match rest.strip_prefix(' ') {
        Some(comment) => comment,
        None if rest.is_empty() => "",
        None => return None,
    };
    if !comment.bytes().all(|b| (0x20..=0x7e).contains(&b)) {
        return None;
    }
    Some((ok, comment))
}

/// Strict decimal unsigned parse: digits only, no sign, no leading junk.
fn parse_number<T: std::str::FromStr>(token: &str) -> Option<T> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    token.parse().ok()
}

/// Scans free text for an APOP challenge: `<digits.digits@domain>` where
/// the domain is dot-separated labels of `[a-z0-9+-]`.
fn find_apop_challenge(text: &str) -> Option<String> {
    let bytes = text.as_bytes();
    for (start, _) in bytes.iter().enumerate().filter(|&(_, &b)| b == b'<') {
        let rest = &text[start + 1..];
        let Some(end) = rest.find('>') else {
            continue;
        };
        if challenge_body_is_valid(&rest[..end]) {
            return Some(text[start..=start + 1 + end].to_string());
        }
    }
    None
}

/// Validates the bracket-free body: `digits.digits@label(.label)*`.
fn challenge_body_is_valid(body: &str) -> bool {
    let Some((timestamp, domain)) = body.split_once('@') else {
        return false;
    };
    let Some((seconds, fraction)) = timestamp.split_once('.') else {
        return false;
    };
    let digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    if !digits(seconds) || !digits(fraction) {
        return false;
    }
    !domain.is_empty()
        && domain.split('.').all(|label| {
            !label.is_empty()
                && label
                    .bytes()
                    .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'+' || b == b'-')
        })
}
