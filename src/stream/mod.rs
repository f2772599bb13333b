// src/stream/mod.rs — Turning a chat-stream byte stream into text deltas

pub mod parser;

use futures::{Stream, StreamExt};

use crate::infra::errors::TutorError;
use crate::transport::ByteStream;

pub use parser::{FrameParser, StreamEvent};

/// One incremental unit of a streamed reply. `Done` is always last.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamDelta {
    Text(String),
    Done,
}

/// Lazily decode `bytes`. Ends with `Ok(Done)` on the sentinel or end of
/// data, or with a single `Err` on an error frame or read failure.
pub fn delta_stream(mut bytes: ByteStream) -> impl Stream<Item = Result<StreamDelta, TutorError>> + Send {
    async_stream::stream! {
        let mut parser = FrameParser::new();

        while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(c) => c,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            tracing::trace!(len = chunk.len(), "chunk");
            for event in parser.push(&chunk) {
                match event {
                    StreamEvent::Text(t) => yield Ok(StreamDelta::Text(t)),
                    StreamEvent::Done => {
                        yield Ok(StreamDelta::Done);
                        return;
                    }
                    StreamEvent::Error(message) => {
                        yield Err(TutorError::StreamAborted(message));
                        return;
                    }
                }
            }
        }

        for event in parser.finish() {
            match event {
                StreamEvent::Text(t) => yield Ok(StreamDelta::Text(t)),
                StreamEvent::Done => {}
                StreamEvent::Error(message) => {
                    yield Err(TutorError::StreamAborted(message));
                    return;
                }
            }
        }
        if parser.malformed_lines() > 0 {
            tracing::debug!(skipped = parser.malformed_lines(), "stream ended with skipped frames");
        }
        yield Ok(StreamDelta::Done);
    }
}

/// Drive a delta stream to its end, handing each text delta to `sink`.
/// Returns the full reply, or the terminal error.
pub async fn collect_reply<S>(stream: S, sink: &mut dyn FnMut(&str)) -> Result<String, TutorError>
where
    S: Stream<Item = Result<StreamDelta, TutorError>>,
{
    futures::pin_mut!(stream);
    let mut reply = String::new();
    while let Some(delta) = stream.next().await {
        match delta? {
            StreamDelta::Text(t) => {
                sink(&t);
                reply.push_str(&t);
            }
            StreamDelta::Done => break,
        }
    }
    Ok(reply)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;

    fn bytes_of(chunks: Vec<&'static [u8]>) -> ByteStream {
        Box::pin(stream::iter(chunks.into_iter().map(|c| Ok(c.to_vec()))))
    }

    #[tokio::test]
    async fn test_collect_hello() {
        let s = delta_stream(bytes_of(vec![
            b"data: {\"text\":\"Hel\"}\n",
            b"data: {\"text\":\"lo\"}\n",
            b"data: [DONE]\n",
        ]));
        let mut seen = Vec::new();
        let text = collect_reply(s, &mut |d| seen.push(d.to_string()))
            .await
            .unwrap();
        assert_eq!(text, "Hello");
        assert_eq!(seen, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_error_frame_surfaces() {
        let s = delta_stream(bytes_of(vec![
            b"data: {\"text\":\"partial\"}\n",
            b"data: {\"error\":\"quota exceeded\"}\n",
        ]));
        let err = collect_reply(s, &mut |_| {}).await.unwrap_err();
        assert!(matches!(err, TutorError::StreamAborted(ref m) if m == "quota exceeded"));
    }

    #[tokio::test]
    async fn test_end_of_data_without_sentinel_is_success() {
        let s = delta_stream(bytes_of(vec![b"data: {\"text\":\"a\"}\n", b"data: {\"text\":\"b\"}"]));
        let text = collect_reply(s, &mut |_| {}).await.unwrap();
        assert_eq!(text, "ab");
    }

    #[tokio::test]
    async fn test_read_failure_is_terminal() {
        let chunks: Vec<Result<Vec<u8>, TutorError>> = vec![
            Ok(b"data: {\"text\":\"a\"}\n".to_vec()),
            Err(TutorError::Transport {
                endpoint: "ai:chat-stream".into(),
                message: "connection reset".into(),
            }),
        ];
        let s = delta_stream(Box::pin(stream::iter(chunks)));
        let items: Vec<_> = s.collect().await;
        assert_eq!(items.len(), 2);
        assert!(matches!(items[0], Ok(StreamDelta::Text(_))));
        assert!(matches!(items[1], Err(TutorError::Transport { .. })));
    }

    #[tokio::test]
    async fn test_done_is_last_item() {
        let s = delta_stream(bytes_of(vec![b"data: [DONE]\ndata: {\"text\":\"x\"}\n"]));
        let items: Vec<_> = s.collect().await;
        assert_eq!(items.len(), 1);
        assert!(matches!(items[0], Ok(StreamDelta::Done)));
    }

    #[test]
    fn test_emoji_split_across_chunks() {
        let raw = "data: {\"text\":\"Ngiyabonga \u{1F393}\"}\n".as_bytes();
        // byte 28 is inside the emoji
        let (a, b) = raw.split_at(28);
        let chunks: Vec<Result<Vec<u8>, TutorError>> = vec![Ok(a.to_vec()), Ok(b.to_vec())];
        let s = delta_stream(Box::pin(stream::iter(chunks)));
        let text = tokio_test::block_on(collect_reply(s, &mut |_| {})).unwrap();
        assert_eq!(text, "Ngiyabonga \u{1F393}");
    }
}

