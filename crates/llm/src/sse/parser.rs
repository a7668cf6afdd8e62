use std::{fmt::Display, pin::Pin};

use futures::{Stream, StreamExt, stream};

use crate::error::BackendError;

struct LineState<S> {
    stream: Pin<Box<S>>,
    buffer: Vec<u8>,
    finished: bool,
}

/// Split a backend byte stream into its non-empty lines.
///
/// Partial lines are buffered across network chunks, `\r\n` and `\n` both end a line, and an
/// unterminated trailing line is emitted when the stream ends. A read error is yielded once and
/// ends the stream.
pub(crate) fn lines<S, B, E>(stream: S) -> impl Stream<Item = Result<String, BackendError>> + Send
where
    S: Stream<Item = Result<B, E>> + Send,
    B: AsRef<[u8]> + Send,
    E: Display + Send,
{
    let state = LineState {
        stream: Box::pin(stream),
        buffer: Vec::new(),
        finished: false,
    };

    let batches = stream::unfold(state, |mut state| async move {
        if state.finished {
            return None;
        }

        let mut lines = Vec::new();

        match state.stream.next().await {
            Some(Ok(bytes)) => {
                state.buffer.extend_from_slice(bytes.as_ref());

                while let Some(newline_pos) = state.buffer.iter().position(|&b| b == b'\n') {
                    let line = state.buffer.drain(..=newline_pos).collect::<Vec<_>>();
                    push_line(&mut lines, &line);
                }
            }
            Some(Err(e)) => {
                log::error!("Backend stream read error: {e}");

                state.finished = true;
                lines.push(Err(BackendError::new(format!("Backend stream failed: {e}"))));
            }
            None => {
                state.finished = true;

                let rest = std::mem::take(&mut state.buffer);
                push_line(&mut lines, &rest);
            }
        }

        Some((lines, state))
    });

    batches.flat_map(stream::iter)
}

fn push_line(lines: &mut Vec<Result<String, BackendError>>, raw: &[u8]) {
    let line = String::from_utf8_lossy(raw);
    let line = line.trim_end_matches(['\r', '\n']);

    if !line.trim().is_empty() {
        lines.push(Ok(line.to_string()));
    }
}
