use chrono::{DateTime, Utc};
use mailparse::{DispositionType, MailHeaderMap, ParsedMail};
use ticbot_core::Message;

use crate::mail_error::MailError;

/// Headers copied onto the domain message.
const KEPT_HEADERS: &[&str] = &[
    "From",
    "To",
    "Cc",
    "Date",
    "Message-ID",
    "In-Reply-To",
    "References",
    "Thread-Topic",
];

/// Builds a [`Message`] from a raw RFC 822 payload.
///
/// `unique_id` comes from the transport (the Gmail message id), never from
/// the payload. Content prefers `text/plain` parts and falls back to the
/// first `text/html` part.
pub fn parse_rfc822(
    unique_id: &str,
    raw: &[u8],
    labels: Vec<String>,
) -> Result<Message, MailError> {
    let parse_error = |message: String| MailError::Parse {
        uid: unique_id.to_string(),
        message,
    };
    let parsed = mailparse::parse_mail(raw).map_err(|error| parse_error(error.to_string()))?;

    let date_header = parsed
        .headers
        .get_first_value("Date")
        .ok_or_else(|| parse_error("missing Date header".to_string()))?;
    let timestamp =
        mailparse::dateparse(&date_header).map_err(|error| parse_error(error.to_string()))?;
    let date = DateTime::<Utc>::from_timestamp(timestamp, 0)
        .ok_or_else(|| parse_error(format!("date out of range: {date_header}")))?;

    let mut message = Message::new(unique_id, date)
        .with_subject(parsed.headers.get_first_value("Subject").unwrap_or_default())
        .with_content(extract_text(&parsed))
        .with_labels(labels);
    for name in KEPT_HEADERS {
        if let Some(value) = parsed.headers.get_first_value(name) {
            message = message.with_header(*name, value);
        }
    }
    Ok(message)
}

fn extract_text(mail: &ParsedMail) -> String {
    if mail.subparts.is_empty() {
        return mail.get_body().unwrap_or_default();
    }
    let mut plain = Vec::new();
    let mut html = Vec::new();
    collect_text_parts(mail, &mut plain, &mut html);
    if !plain.is_empty() {
        plain.join("\n")
    } else {
        html.into_iter().next().unwrap_or_default()
    }
}

fn collect_text_parts(mail: &ParsedMail, plain: &mut Vec<String>, html: &mut Vec<String>) {
    for part in &mail.subparts {
        if part.get_content_disposition().disposition == DispositionType::Attachment {
            continue;
        }
        if !part.subparts.is_empty() {
            collect_text_parts(part, plain, html);
            continue;
        }
        let mimetype = part.ctype.mimetype.to_ascii_lowercase();
        let Ok(body) = part.get_body() else {
            continue;
        };
        if mimetype == "text/plain" {
            plain.push(body);
        } else if mimetype == "text/html" {
            html.push(body);
        }
    }
}
