use futures::StreamExt as _;
use futures::stream;

/// Splits an unbounded sequence of byte chunks into newline-terminated lines.
///
/// Bytes after the last `\n` are held back and prefixed to the next chunk.
/// A remainder that never sees its newline is not a frame: `discard_remainder`
/// drops it when the stream ends.
#[derive(Debug, Default)]
pub struct LineFramer {
    buf: Vec<u8>,
}

impl LineFramer {
    /// Creates an empty framer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a chunk and returns every line it completed, in order, with the
    /// `\n` separator stripped.
    ///
    /// Splitting happens on bytes, so a multi-byte UTF-8 character cut across
    /// two chunks is reassembled before it is decoded.
    pub fn push_chunk(&mut self, chunk: &[u8]) -> Vec<String> {
        // Held-back bytes never contain a newline; only the new chunk is scanned.
        let scanned_from = self.buf.len();
        self.buf.extend_from_slice(chunk);
        let Some(last_newline) = self.buf[scanned_from..]
            .iter()
            .rposition(|b| *b == b'\n')
            .map(|idx| scanned_from + idx)
        else {
            return Vec::new();
        };

        let remainder = self.buf.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.buf, remainder);
        complete[..last_newline]
            .split(|b| *b == b'\n')
            .map(|line| String::from_utf8_lossy(line).into_owned())
            .collect()
    }

    /// Number of buffered bytes still waiting for a newline.
    pub fn pending_len(&self) -> usize {
        self.buf.len()
    }

    /// Drops the unterminated remainder and returns how many bytes were lost.
    pub fn discard_remainder(&mut self) -> usize {
        let dropped = self.buf.len();
        self.buf.clear();
        dropped
    }
}

/// Lazily frames a chunk stream into a line stream.
///
/// The first chunk error ends the line stream after being yielded. When the
/// chunk stream ends, any unterminated remainder is discarded.
pub fn frame_lines<S, B, E>(chunks: S) -> impl futures::Stream<Item = Result<String, E>> + Send
where
    S: futures::Stream<Item = Result<B, E>> + Send + Unpin,
    B: AsRef<[u8]> + Send,
    E: Send,
{
    struct State<S> {
        chunks: S,
        framer: LineFramer,
        pending: std::collections::VecDeque<String>,
        done: bool,
    }

    stream::unfold(
        State {
            chunks,
            framer: LineFramer::new(),
            pending: std::collections::VecDeque::new(),
            done: false,
        },
        |mut state| async move {
            loop {
                if let Some(line) = state.pending.pop_front() {
                    return Some((Ok(line), state));
                }
                if state.done {
                    return None;
                }

                match state.chunks.next().await {
                    Some(Ok(chunk)) => {
                        state.pending.extend(state.framer.push_chunk(chunk.as_ref()));
                    }
                    Some(Err(err)) => {
                        state.done = true;
                        return Some((Err(err), state));
                    }
                    None => {
                        state.done = true;
                        let dropped = state.framer.discard_remainder();
                        if dropped > 0 {
                            tracing::debug!(bytes = dropped, "discarding unterminated trailing frame");
                        }
                    }
                }
            }
        },
    )
}
