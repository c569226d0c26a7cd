//! Frame codec for the completion stream.
//!
//! The backend answers `POST /chat/completions` with newline-delimited
//! frames:
//!
//! ```text
//! data: {"content": "Hi"}
//!
//! data: {"content": " there"}
//!
//! data: [DONE]
//! ```
//!
//! Network chunks do not respect frame boundaries. [`FrameCodec`] leaves
//! line splitting to `LinesCodec`, which holds partial lines in the
//! `BytesMut` between reads, and only interprets complete lines. It does no
//! I/O itself; [`fragments`] drives it with `FramedRead` over a
//! `StreamReader` wrapping the response body.

use futures_util::stream::{self, BoxStream};
use futures_util::StreamExt;
use tokio_util::bytes::BytesMut;
use tokio_util::codec::{Decoder, FramedRead, LinesCodec, LinesCodecError};
use tokio_util::io::StreamReader;
use tracing::{trace, warn};

use crate::backend::ByteStream;
use crate::ChatError;

const DATA_PREFIX: &str = "data: ";
const DONE_MARKER: &str = "[DONE]";

/// One decoded piece of assistant text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fragment {
    pub text: String,
    /// The backend served this reply from its response cache.
    pub cached: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameEvent {
    Fragment(Fragment),
    /// `data: [DONE]` was seen; nothing after it is decoded.
    Done,
    /// The backend reported `{"error": ...}` mid-stream.
    Failed(String),
}

#[derive(Debug, Default)]
pub struct FrameCodec {
    lines: LinesCodec,
    done: bool,
}

impl FrameCodec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_done(&self) -> bool {
        self.done
    }

    /// Pull complete lines until one of them yields an event. `eof` flushes
    /// a trailing line that has no newline.
    fn next_event(
        &mut self,
        buf: &mut BytesMut,
        eof: bool,
    ) -> Result<Option<FrameEvent>, ChatError> {
        loop {
            if self.done {
                buf.clear();
                return Ok(None);
            }
            let line = if eof {
                self.lines.decode_eof(buf)
            } else {
                self.lines.decode(buf)
            };
            match line {
                Ok(Some(line)) => {
                    if let Some(event) = self.decode_line(&line) {
                        return Ok(Some(event));
                    }
                }
                Ok(None) => return Ok(None),
                // The offending line has already been consumed.
                Err(LinesCodecError::Io(e)) => {
                    warn!(error = %ChatError::MalformedFrame(e.to_string()), "skipping frame");
                }
                Err(e @ LinesCodecError::MaxLineLengthExceeded) => {
                    return Err(ChatError::MalformedFrame(e.to_string()));
                }
            }
        }
    }

    fn decode_line(&mut self, line: &str) -> Option<FrameEvent> {
        let payload = line.strip_prefix(DATA_PREFIX)?;
        if payload == DONE_MARKER {
            self.done = true;
            return Some(FrameEvent::Done);
        }

        let value: serde_json::Value = match serde_json::from_str(payload) {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    error = %ChatError::MalformedFrame(e.to_string()),
                    payload,
                    "skipping frame"
                );
                return None;
            }
        };

        if let Some(error) = value.get("error") {
            let message = error
                .as_str()
                .map(String::from)
                .unwrap_or_else(|| error.to_string());
            return Some(FrameEvent::Failed(message));
        }

        match value.get("content").and_then(|c| c.as_str()) {
            Some(content) if !content.is_empty() => Some(FrameEvent::Fragment(Fragment {
                text: content.to_string(),
                cached: value.get("cached").and_then(|c| c.as_bool()).unwrap_or(false),
            })),
            _ => {
                trace!(payload, "frame without content");
                None
            }
        }
    }
}

impl Decoder for FrameCodec {
    type Item = FrameEvent;
    type Error = ChatError;

    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<FrameEvent>, ChatError> {
        self.next_event(buf, false)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<FrameEvent>, ChatError> {
        self.next_event(buf, true)
    }
}

/// Decode a response body into fragments.
///
/// Ends after `[DONE]` or when the body ends. A transport error or an
/// error frame is yielded once as `Err` and ends the stream.
pub fn fragments(body: ByteStream) -> BoxStream<'static, Result<Fragment, ChatError>> {
    let reader = StreamReader::new(body.map(|chunk| chunk.map_err(std::io::Error::other)));
    let frames = FramedRead::new(reader, FrameCodec::new());

    stream::unfold(Some(frames), |frames| async move {
        let mut frames = frames?;
        match frames.next().await? {
            Ok(FrameEvent::Fragment(fragment)) => Some((Ok(fragment), Some(frames))),
            Ok(FrameEvent::Done) => None,
            Ok(FrameEvent::Failed(message)) => Some((Err(ChatError::Generation(message)), None)),
            Err(e) => Some((Err(e), None)),
        }
    })
    .boxed()
}
