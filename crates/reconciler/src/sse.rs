use models::{Envelope, Notification};

/// SseEvent is a single dispatched Server-Sent Event.
#[derive(Debug, Clone, PartialEq)]
pub struct SseEvent {
    pub event: Option<String>,
    pub data: String,
}

/// SseDecoder incrementally decodes an `text/event-stream` body,
/// which may be split across chunks at arbitrary byte offsets.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: Vec<u8>,
    event: Option<String>,
    data: Vec<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed the next chunk of the body, returning events which it completed.
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<SseEvent> {
        self.buf.extend_from_slice(chunk);

        let mut out = Vec::new();
        while let Some(newline) = self.buf.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buf.drain(..=newline).collect();
            let line = String::from_utf8_lossy(&line[..line.len() - 1]);
            let line = line.strip_suffix('\r').unwrap_or(&line);

            if let Some(event) = self.line(line) {
                out.push(event);
            }
        }
        out
    }

    fn line(&mut self, line: &str) -> Option<SseEvent> {
        if line.is_empty() {
            let event = self.event.take();
            if self.data.is_empty() {
                return None;
            }
            let data = std::mem::take(&mut self.data).join("\n");
            return Some(SseEvent { event, data });
        }
        if line.starts_with(':') {
            return None; // Comment (keep-alive).
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        match field {
            "data" => self.data.push(value.to_string()),
            "event" => self.event = Some(value.to_string()),
            _ => {} // `id`, `retry`, and unknown fields.
        }
        None
    }
}

/// Incoming is a decoded message of the Notification topic.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    Envelope(Envelope<Notification>),
    /// The hub dropped messages to us, and we must re-fetch.
    Resync,
}

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unexpected event type {0:?}")]
    UnknownEvent(String),
    #[error("invalid envelope payload")]
    Payload(#[from] serde_json::Error),
}

pub fn decode(event: &SseEvent) -> Result<Incoming, DecodeError> {
    match event.event.as_deref() {
        None | Some("message") => Ok(Incoming::Envelope(serde_json::from_str(&event.data)?)),
        Some(pubsub::http::RESYNC_EVENT) => Ok(Incoming::Resync),
        Some(other) => Err(DecodeError::UnknownEvent(other.to_string())),
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_framing_across_chunks() {
        let mut decoder = SseDecoder::new();

        assert_eq!(decoder.feed(b"data: {\"a\""), vec![]);
        assert_eq!(decoder.feed(b":1}\r\n"), vec![]);
        assert_eq!(
            decoder.feed(b"\r\n: keep-alive\n\nevent: resync\ndata: 3\n\ndata:x\ndata: y"),
            vec![
                SseEvent {
                    event: None,
                    data: "{\"a\":1}".to_string()
                },
                SseEvent {
                    event: Some("resync".to_string()),
                    data: "3".to_string()
                },
            ]
        );
        assert_eq!(
            decoder.feed(b"\n\n"),
            vec![SseEvent {
                event: None,
                data: "x\ny".to_string()
            }]
        );
    }

    #[test]
    fn test_event_without_data_is_not_dispatched() {
        let mut decoder = SseDecoder::new();
        assert_eq!(decoder.feed(b"event: resync\n\ndata: z\n\n").len(), 1);
    }

    #[test]
    fn test_decode() {
        let event = |event: Option<&str>, data: &str| SseEvent {
            event: event.map(str::to_string),
            data: data.to_string(),
        };

        let payload = r#"{"type":"DELETE","data":{"id":4,"recipientId":1,"title":"t","message":"m","type":"info","isRead":true,"createdAt":"2024-03-01T10:00:00Z"}}"#;
        let Incoming::Envelope(Envelope::Delete(deleted)) = decode(&event(None, payload)).unwrap()
        else {
            panic!("expected a DELETE envelope");
        };
        assert_eq!(deleted.id, models::Id(4));

        assert_eq!(decode(&event(Some("resync"), "2")).unwrap(), Incoming::Resync);
        assert!(matches!(
            decode(&event(None, r#"{"type":"PATCH","data":{}}"#)),
            Err(DecodeError::Payload(_))
        ));
        assert!(matches!(
            decode(&event(None, "not json")),
            Err(DecodeError::Payload(_))
        ));
        assert!(matches!(
            decode(&event(Some("ping"), "{}")),
            Err(DecodeError::UnknownEvent(_))
        ));
    }
}
