//! Line-oriented parser for the signable text grammar.
//!
//! The grammar is strict: fields appear in a fixed order, unknown or
//! trailing content is an error, and the parsed fields render back to the
//! input byte-identically.

use {crate::Message, crate::format::PREAMBLE, std::iter::Peekable, thiserror::Error, url::Url};

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum ParseError {
    #[error("message is missing the {0} line")]
    MissingLine(&'static str),
    #[error("malformed {field} line {value:?}")]
    MalformedLine { field: &'static str, value: String },
    #[error("unexpected content after the last field: {0:?}")]
    TrailingContent(String),
}

pub fn parse(text: &str) -> Result<Message, ParseError> {
    // `split` rather than `lines` so a trailing newline shows up as a
    // trailing empty line instead of disappearing.
    let mut lines = text.split('\n').peekable();

    let preamble = lines.next().ok_or(ParseError::MissingLine("preamble"))?;
    let domain = preamble
        .strip_suffix(PREAMBLE)
        .ok_or_else(|| ParseError::MalformedLine {
            field: "preamble",
            value: preamble.to_owned(),
        })?
        .to_owned();
    let address = lines
        .next()
        .ok_or(ParseError::MissingLine("address"))?
        .to_owned();
    blank_line(&mut lines)?;

    let statement = match lines.peek() {
        Some(line) if !line.starts_with("URI: ") => {
            let statement = lines
                .next()
                .ok_or(ParseError::MissingLine("statement"))?
                .to_owned();
            blank_line(&mut lines)?;
            Some(statement)
        }
        _ => None,
    };

    let uri = required(&mut lines, "URI")?;
    let version = required(&mut lines, "Version")?;
    let chain_id = required(&mut lines, "Chain ID")?;
    let chain_id = chain_id
        .parse()
        .map_err(|_| ParseError::MalformedLine {
            field: "Chain ID",
            value: chain_id,
        })?;
    let nonce = required(&mut lines, "Nonce")?;
    let issued_at = required(&mut lines, "Issued At")?;
    let expiration_time = optional(&mut lines, "Expiration Time");
    let not_before = optional(&mut lines, "Not Before");
    let request_id = optional(&mut lines, "Request ID");

    let resources = match lines.peek() {
        Some(&"Resources:") => {
            lines.next();
            let mut resources = Vec::new();
            while let Some(resource) = lines.peek().and_then(|line| line.strip_prefix("- ")) {
                Url::parse(resource).map_err(|_| ParseError::MalformedLine {
                    field: "Resources",
                    value: resource.to_owned(),
                })?;
                resources.push(resource.to_owned());
                lines.next();
            }
            Some(resources)
        }
        _ => None,
    };

    if let Some(line) = lines.next() {
        return Err(ParseError::TrailingContent(line.to_owned()));
    }

    Ok(Message {
        domain,
        address,
        statement,
        uri,
        version,
        chain_id,
        nonce,
        issued_at: Some(issued_at),
        expiration_time,
        not_before,
        request_id,
        resources,
    })
}

fn blank_line<'a>(lines: &mut impl Iterator<Item = &'a str>) -> Result<(), ParseError> {
    match lines.next() {
        Some("") => Ok(()),
        Some(line) => Err(ParseError::MalformedLine {
            field: "separator",
            value: line.to_owned(),
        }),
        None => Err(ParseError::MissingLine("separator")),
    }
}

fn required<'a>(
    lines: &mut impl Iterator<Item = &'a str>,
    field: &'static str,
) -> Result<String, ParseError> {
    let line = lines.next().ok_or(ParseError::MissingLine(field))?;
    tagged(line, field)
        .map(str::to_owned)
        .ok_or_else(|| ParseError::MalformedLine {
            field,
            value: line.to_owned(),
        })
}

fn optional<'a>(
    lines: &mut Peekable<impl Iterator<Item = &'a str>>,
    field: &'static str,
) -> Option<String> {
    let value = lines.peek().and_then(|line| tagged(line, field))?.to_owned();
    lines.next();
    Some(value)
}

fn tagged<'a>(line: &'a str, field: &str) -> Option<&'a str> {
    line.strip_prefix(field)?.strip_prefix(": ")
}
