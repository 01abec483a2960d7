// 📩 SMS Export Parser
// Reads <sms .../> elements out of an Android SMS backup XML

use anyhow::{Context, Result};
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde::{Deserialize, Serialize};
use std::io::BufRead;
use std::path::Path;
use tracing::debug;

/// RawMessage - one SMS exactly as exported, before any extraction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawMessage {
    pub address: String,
    pub body: String,
    /// Epoch milliseconds, kept as the raw attribute text
    pub date: String,
    /// `type` attribute (1 = inbox, 2 = sent)
    pub kind: String,
    /// `id` attribute when the export carries one
    pub source_id: Option<String>,
}

impl RawMessage {
    fn from_element(element: &BytesStart<'_>) -> Result<Self> {
        let mut message = RawMessage {
            address: String::new(),
            body: String::new(),
            date: String::new(),
            kind: String::new(),
            source_id: None,
        };

        for attr in element.attributes() {
            let attr = attr.context("Malformed sms attribute")?;
            let value = attr
                .unescape_value()
                .context("Malformed sms attribute value")?
                .into_owned();

            match attr.key.as_ref() {
                b"address" => message.address = value,
                b"body" => message.body = value,
                b"date" => message.date = value,
                b"type" => message.kind = value,
                b"id" => message.source_id = Some(value),
                _ => {}
            }
        }

        Ok(message)
    }
}

/// Parse every <sms> element of the export at `path`
pub fn parse_sms_file(path: &Path) -> Result<Vec<RawMessage>> {
    let reader = Reader::from_file(path)
        .with_context(|| format!("Failed to open SMS export: {}", path.display()))?;

    let messages = read_messages(reader)
        .with_context(|| format!("Failed to parse SMS export: {}", path.display()))?;

    debug!(count = messages.len(), path = %path.display(), "parsed sms export");
    Ok(messages)
}

/// Parse an in-memory export
pub fn parse_sms_str(xml: &str) -> Result<Vec<RawMessage>> {
    read_messages(Reader::from_str(xml))
}

/// The export must be complete: a missing `<smses>` root or elements still
/// open at end of input mean the file was cut short.
fn read_messages<R: BufRead>(mut reader: Reader<R>) -> Result<Vec<RawMessage>> {
    let mut messages = Vec::new();
    let mut buf = Vec::new();
    let mut depth = 0usize;
    let mut saw_root = false;

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(ref e)) => {
                match e.name().as_ref() {
                    b"smses" if depth == 0 => saw_root = true,
                    b"sms" => messages.push(RawMessage::from_element(e)?),
                    _ => {}
                }
                depth += 1;
            }
            Ok(Event::Empty(ref e)) => match e.name().as_ref() {
                b"smses" if depth == 0 => saw_root = true,
                b"sms" => messages.push(RawMessage::from_element(e)?),
                _ => {}
            },
            Ok(Event::End(_)) => depth = depth.saturating_sub(1),
            Ok(Event::Eof) => {
                if depth > 0 {
                    anyhow::bail!(
                        "Truncated SMS export: {} element(s) left open at byte {}",
                        depth,
                        reader.buffer_position()
                    );
                }
                break;
            }
            Ok(_) => {}
            Err(e) => {
                return Err(anyhow::Error::new(e)
                    .context(format!("Malformed XML at byte {}", reader.buffer_position())));
            }
        }
        buf.clear();
    }

    if !saw_root {
        anyhow::bail!("SMS export has no <smses> root element");
    }

    Ok(messages)
}

// ============================================================================
// TESTS
// ============================================================================
