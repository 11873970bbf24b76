use std::fs::File;
use std::io::{self, BufReader, ErrorKind, Read, Seek, SeekFrom, Write};
use std::time::Duration;

use clap::Parser;
use tracing::{debug, warn};

pub mod error;
pub mod follow;
pub mod tail;

pub use crate::error::{MyResult, TailError};
pub use crate::follow::{watch, watch_from_current, CancelToken, LineSink, DEFAULT_POLL_INTERVAL};
pub use crate::tail::read_last_lines;

fn parse_line_count(s: &str) -> Result<usize, String> {
    s.parse::<usize>()
        .map_err(|_| format!("illegal line count -- {}", s))
}

fn parse_interval(s: &str) -> Result<Duration, String> {
    match s.parse::<u64>() {
        Ok(ms) if ms > 0 => Ok(Duration::from_millis(ms)),
        _ => Err(format!("illegal sleep interval -- {}", s)),
    }
}

#[derive(Parser, Debug)]
#[command(name = "tailf", version = "0.1.0", about = "Print the last lines of a file and follow it as it grows")]
pub struct Cli {
    #[arg(value_name = "FILE", help = "Input file")]
    file: String,
    #[arg(short, long, help = "Keep printing lines as they are appended")]
    follow: bool,
    #[arg(value_name = "LINES", short = 'n', long = "number-of-lines", help = "Number of lines", default_value = "10", value_parser = parse_line_count)]
    lines: usize,
    #[arg(value_name = "MS", short = 's', long, help = "Milliseconds between polls while following", default_value = "500", value_parser = parse_interval)]
    sleep_interval: Duration,
}

pub fn get_cli() -> MyResult<Cli> {
    Ok(Cli::parse())
}

pub fn decode_line(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn write_to_output(line: &str) -> io::Result<()> {
    let mut out = io::stdout().lock();
    write!(out, "{}", line)?;
    // Partial lines have no newline to trigger the line-buffered flush.
    out.flush()
}

/// Sends the last `n` lines of `stream` to `sink`. A stream too short to
/// hold a line, or one that shrinks while being scanned, yields nothing.
pub fn print_last_lines<R, S>(stream: &mut R, n: usize, sink: &mut S) -> MyResult<()>
where
    R: Read + Seek,
    S: LineSink + ?Sized,
{
    let lines = match read_last_lines(stream, n) {
        Ok(lines) => lines,
        Err(TailError::EmptyOrTooShortFile { len }) => {
            debug!(len, "nothing to tail");
            return Ok(());
        }
        Err(TailError::Io(e)) if e.kind() == ErrorKind::UnexpectedEof => {
            warn!("stream shrank while tailing");
            stream.seek(SeekFrom::End(0))?;
            return Ok(());
        }
        Err(e) => return Err(e),
    };

    for line in &lines {
        sink.emit(line)?;
    }
    Ok(())
}

fn stop_on_broken_pipe(res: MyResult<()>) -> MyResult<()> {
    match res {
        Err(TailError::Io(e)) if e.kind() == ErrorKind::BrokenPipe => {
            debug!("output closed");
            Ok(())
        }
        res => res,
    }
}

pub fn run(cli: &Cli) -> MyResult<()> {
    let file = File::open(&cli.file).map_err(|source| TailError::FileOpen {
        path: cli.file.clone(),
        source,
    })?;
    let mut stream = BufReader::new(file);
    let mut sink = write_to_output;

    let cancel = CancelToken::new();
    let res = print_last_lines(&mut stream, cli.lines, &mut sink).and_then(|_| {
        if cli.follow {
            watch_from_current(&mut stream, &mut sink, cli.sleep_interval, &cancel)
        } else {
            Ok(())
        }
    });

    stop_on_broken_pipe(res)
}
