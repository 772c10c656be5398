//! SMTP response parser.

use crate::error::{Error, Result};
use crate::types::{Reply, ReplyCode};

/// Parses an SMTP reply from response lines (line endings already stripped).
///
/// SMTP replies can be single-line or multi-line:
/// - Single: `250 OK`
/// - Multi: `250-First line`, `250-Second line`, `250 Last line`
///
/// # Errors
///
/// Returns an error if the reply is malformed or the lines disagree on the code.
pub fn parse_reply(lines: &[String]) -> Result<Reply> {
    let first = lines
        .first()
        .ok_or_else(|| Error::Protocol("Empty reply".into()))?;

    let code = reply_code(first)?;
    let mut message = Vec::with_capacity(lines.len());

    for line in lines {
        if reply_code(line)? != code {
            return Err(Error::Protocol(format!(
                "Reply code changed within multi-line reply: {line}"
            )));
        }
        match line.as_bytes().get(3) {
            None => message.push(String::new()),
            Some(b' ' | b'-') => message.push(line[4..].to_string()),
            Some(_) => return Err(Error::Protocol(format!("Malformed reply line: {line}"))),
        }
    }

    Ok(Reply::new(code, message))
}

fn reply_code(line: &str) -> Result<ReplyCode> {
    line.get(..3)
        .filter(|digits| digits.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|digits| digits.parse::<u16>().ok())
        .map(ReplyCode::new)
        .ok_or_else(|| Error::Protocol(format!("Invalid reply code: {line}")))
}

/// Checks if a line is the last line of a reply.
///
/// Continuation lines use `-` after the code; the last line uses a space
/// or carries no text at all.
#[must_use]
pub fn is_last_reply_line(line: &str) -> bool {
    line.len() == 3 || (line.len() >= 4 && line.as_bytes()[3] == b' ')
}
