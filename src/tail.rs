use std::io::{Read, Seek, SeekFrom};
use std::ops::Range;

use tracing::{debug, trace};

use crate::decode_line;
use crate::error::{MyResult, TailError};

const BLOCK_SIZE: u64 = 4096;
const NEWLINE: u8 = b'\n';

/// Returns at most the last `n` lines of `stream`, oldest first, leaving the
/// cursor at the end measured on entry.
pub fn read_last_lines<R>(stream: &mut R, n: usize) -> MyResult<Vec<String>>
where
    R: Read + Seek,
{
    let len = stream.seek(SeekFrom::End(0))?;
    if n == 0 {
        return Ok(Vec::new());
    }
    if len < 2 {
        return Err(TailError::EmptyOrTooShortFile { len });
    }

    let ranges = find_line_ranges(stream, len, n)?;
    let mut lines = Vec::with_capacity(ranges.len());
    for range in ranges.into_iter().rev() {
        lines.push(read_line_at(stream, range)?);
    }

    // End of the displayed content, even if the file grew meanwhile.
    stream.seek(SeekFrom::Start(len))?;
    debug!(len, found = lines.len(), requested = n, "tail finished");

    Ok(lines)
}

// Line byte ranges, newest first.
fn find_line_ranges<R>(stream: &mut R, len: u64, n: usize) -> MyResult<Vec<Range<u64>>>
where
    R: Read + Seek,
{
    let mut ranges = Vec::new();
    let mut block = vec![0u8; BLOCK_SIZE as usize];
    let mut line_end = len;
    // The last byte either terminates the newest line or belongs to it.
    let mut scan_end = len - 1;

    while scan_end > 0 {
        let scan_start = scan_end.saturating_sub(BLOCK_SIZE);
        let chunk = &mut block[..(scan_end - scan_start) as usize];
        stream.seek(SeekFrom::Start(scan_start))?;
        stream.read_exact(chunk)?;
        trace!(scan_start, scan_end, "scanning block");

        for (i, &byte) in chunk.iter().enumerate().rev() {
            if byte != NEWLINE {
                continue;
            }

            let pos = scan_start + i as u64;
            ranges.push(pos + 1..line_end);
            line_end = pos + 1;

            if ranges.len() == n {
                return Ok(ranges);
            }
        }

        scan_end = scan_start;
    }

    // Start of file reached under quota: the prefix is the oldest line.
    ranges.push(0..line_end);
    Ok(ranges)
}

fn read_line_at<R>(stream: &mut R, range: Range<u64>) -> MyResult<String>
where
    R: Read + Seek,
{
    let mut buf = vec![0u8; (range.end - range.start) as usize];
    stream.seek(SeekFrom::Start(range.start))?;
    stream.read_exact(&mut buf)?;

    Ok(decode_line(&buf))
}
