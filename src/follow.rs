use std::io::{self, BufRead, Seek, SeekFrom};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, trace, warn};

use crate::decode_line;
use crate::error::{MyResult, TailError};

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(500);

const NEWLINE: u8 = b'\n';

pub trait LineSink {
    fn emit(&mut self, line: &str) -> io::Result<()>;
}

impl<F> LineSink for F
where
    F: FnMut(&str) -> io::Result<()>,
{
    fn emit(&mut self, line: &str) -> io::Result<()> {
        self(line)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Follows `stream` from its current end. See [`watch_from_current`].
pub fn watch<R, S>(
    stream: &mut R,
    sink: &mut S,
    interval: Duration,
    cancel: &CancelToken,
) -> MyResult<()>
where
    R: BufRead + Seek,
    S: LineSink + ?Sized,
{
    stream
        .seek(SeekFrom::End(0))
        .map_err(|e| TailError::lost(0, e))?;
    watch_from_current(stream, sink, interval, cancel)
}

/// Polls `stream` for bytes past its cursor and hands each line to `sink`,
/// partial lines included. Returns once `cancel` is set; fails with
/// [`TailError::StreamLost`] if the stream shrinks below the cursor or stops
/// being readable, and with [`TailError::Io`] if the sink fails.
pub fn watch_from_current<R, S>(
    stream: &mut R,
    sink: &mut S,
    interval: Duration,
    cancel: &CancelToken,
) -> MyResult<()>
where
    R: BufRead + Seek,
    S: LineSink + ?Sized,
{
    let mut offset = stream
        .stream_position()
        .map_err(|e| TailError::lost(0, e))?;
    debug!(offset, ?interval, "following stream");

    let mut buf = Vec::new();
    while !cancel.is_cancelled() {
        offset = stream
            .stream_position()
            .map_err(|e| TailError::lost(offset, e))?;

        buf.clear();
        let bytes_read = stream
            .read_until(NEWLINE, &mut buf)
            .map_err(|e| TailError::lost(offset, e))?;

        if bytes_read == 0 {
            restore_idle(stream, offset)?;
            trace!(offset, "no new data");
            thread::sleep(interval);
            continue;
        }

        sink.emit(&decode_line(&buf))?;
    }

    debug!(offset, "follow cancelled");
    Ok(())
}

fn restore_idle<R>(stream: &mut R, offset: u64) -> MyResult<()>
where
    R: Seek,
{
    let len = stream
        .seek(SeekFrom::End(0))
        .map_err(|e| TailError::lost(offset, e))?;
    if len < offset {
        warn!(offset, len, "followed stream was truncated");
        return Err(TailError::lost(
            offset,
            format!("stream truncated to {} byte(s)", len),
        ));
    }

    stream
        .seek(SeekFrom::Start(offset))
        .map_err(|e| TailError::lost(offset, e))?;
    Ok(())
}
