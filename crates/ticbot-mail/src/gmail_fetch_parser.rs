use regex::Regex;

/// Gmail extension attributes of one fetched message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GmailFetchMeta {
    pub uid: u32,
    pub message_id: String,
    pub labels: Vec<String>,
}

/// Parses raw `UID FETCH ... (X-GM-MSGID X-GM-LABELS)` responses.
///
/// The imap crate does not model Gmail's extension attributes, so the
/// untagged response lines are matched directly.
pub struct GmailFetchParser {
    uid: Regex,
    message_id: Regex,
    labels: Regex,
    label_token: Regex,
}

impl GmailFetchParser {
    pub fn new() -> Result<Self, regex::Error> {
        Ok(Self {
            uid: Regex::new(r"\bUID (\d+)")?,
            message_id: Regex::new(r"\bX-GM-MSGID (\d+)")?,
            labels: Regex::new(r"\bX-GM-LABELS \(([^)]*)\)")?,
            label_token: Regex::new(r#""((?:[^"\\]|\\.)*)"|(\S+)"#)?,
        })
    }

    /// One entry per untagged FETCH line that carries both a UID and a
    /// Gmail message id; other lines are ignored.
    pub fn parse_response(&self, raw: &str) -> Vec<GmailFetchMeta> {
        raw.lines()
            .filter(|line| line.starts_with("* ") && line.contains(" FETCH "))
            .filter_map(|line| self.parse_line(line))
            .collect()
    }

    fn parse_line(&self, line: &str) -> Option<GmailFetchMeta> {
        let uid = self.uid.captures(line)?.get(1)?.as_str().parse().ok()?;
        let message_id = self.message_id.captures(line)?.get(1)?.as_str().to_string();
        let labels = self
            .labels
            .captures(line)
            .and_then(|captures| captures.get(1))
            .map(|labels| self.split_labels(labels.as_str()))
            .unwrap_or_default();
        Some(GmailFetchMeta {
            uid,
            message_id,
            labels,
        })
    }

    /// Shell-style split: quoted labels may contain spaces and escapes.
    pub fn split_labels(&self, raw: &str) -> Vec<String> {
        self.label_token
            .captures_iter(raw)
            .filter_map(|captures| {
                if let Some(quoted) = captures.get(1) {
                    return Some(unescape_quoted(quoted.as_str()));
                }
                captures.get(2).map(|bare| bare.as_str().to_string())
            })
            .collect()
    }
}

fn unescape_quoted(raw: &str) -> String {
    let mut unescaped = String::with_capacity(raw.len());
    let mut chars = raw.chars();
    while let Some(ch) = chars.next() {
        if ch == '\\' {
            if let Some(next) = chars.next() {
                unescaped.push(next);
            }
        } else {
            unescaped.push(ch);
        }
    }
    unescaped
}

#[cfg(test)]
mod tests {
    use super::{GmailFetchMeta, GmailFetchParser};

    #[test]
    fn functional_parse_response_reads_uid_message_id_and_labels() {
        let parser = GmailFetchParser::new().expect("parser");
        let raw = concat!(
            "* 1 FETCH (X-GM-MSGID 1790123456789012345 ",
            "X-GM-LABELS (\\Inbox \"Needs Triage\") UID 101)\r\n",
            "* 2 FETCH (UID 102 X-GM-MSGID 1790123456789012346 X-GM-LABELS ())\r\n",
        );
        assert_eq!(
            parser.parse_response(raw),
            vec![
                GmailFetchMeta {
                    uid: 101,
                    message_id: "1790123456789012345".to_string(),
                    labels: vec!["\\Inbox".to_string(), "Needs Triage".to_string()],
                },
                GmailFetchMeta {
                    uid: 102,
                    message_id: "1790123456789012346".to_string(),
                    labels: Vec::new(),
                },
            ]
        );
    }

    #[test]
    fn regression_lines_without_gmail_id_are_skipped() {
        let parser = GmailFetchParser::new().expect("parser");
        let raw = "* 3 FETCH (UID 103 FLAGS (\\Seen))\r\n* OK still here\r\n";
        assert!(parser.parse_response(raw).is_empty());
    }

    #[test]
    fn unit_split_labels_handles_escaped_quotes() {
        let parser = GmailFetchParser::new().expect("parser");
        assert_eq!(
            parser.split_labels(r#""\\Important" "say \"hi\"" plain"#),
            vec![
                "\\Important".to_string(),
                "say \"hi\"".to_string(),
                "plain".to_string()
            ]
        );
    }
}
