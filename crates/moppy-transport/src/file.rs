//! Recorded sessions: replay from, and record to, text logs.

use std::fs::File;
use std::io::{BufRead, BufReader, LineWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use moppy_frame::{decode_text_line, encode_text_line, Frame, Message, TextFrame};
use tracing::info;

use crate::error::{Result, TransportError};
use crate::traits::{FrameSink, FrameSource};

/// Replays a recorded log, one line per frame.
///
/// A line is due its recorded delay after the previous frame was returned.
/// Each call waits at most `timeout` for the pending line, so callers can
/// check for cancellation between slices of a long delay. A line that does
/// not parse, including the empty read at end of file, ends the stream.
#[derive(Debug)]
pub struct FileReader {
    lines: BufReader<File>,
    path: PathBuf,
    line: Vec<u8>,
    line_no: usize,
    pending: Option<(Instant, Frame)>,
}

impl FileReader {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).map_err(|e| TransportError::Open {
            path: path.clone(),
            source: e,
        })?;

        info!(?path, "file reader created");

        Ok(Self {
            lines: BufReader::new(file),
            path,
            line: Vec::new(),
            line_no: 0,
            pending: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn next_line(&mut self) -> Result<TextFrame> {
        self.line.clear();
        self.line_no += 1;

        if let Err(err) = self.lines.read_until(b'\n', &mut self.line) {
            return Err(end_of_stream(&self.path, self.line_no, err));
        }
        let text = std::str::from_utf8(&self.line)
            .map_err(|err| end_of_stream(&self.path, self.line_no, err))?;
        decode_text_line(text).map_err(|err| end_of_stream(&self.path, self.line_no, err))
    }
}

fn end_of_stream(path: &Path, line_no: usize, reason: impl std::fmt::Display) -> TransportError {
    TransportError::EndOfStream(format!("{} line {line_no}: {reason}", path.display()))
}

impl FrameSource for FileReader {
    fn read_frame(&mut self, timeout: Duration) -> Result<Option<Message>> {
        let (due, frame) = match self.pending {
            Some(pending) => pending,
            None => {
                let parsed = self.next_line()?;
                let pending = (Instant::now() + parsed.delay, parsed.frame);
                self.pending = Some(pending);
                pending
            }
        };

        let remaining = due.saturating_duration_since(Instant::now());
        if remaining > timeout {
            std::thread::sleep(timeout);
            return Ok(None);
        }

        std::thread::sleep(remaining);
        self.pending = None;
        Ok(Some(Message::from(frame)))
    }

    fn tag(&self) -> &'static str {
        "filer"
    }
}

/// Records every frame as a text line with the delay since the previous one.
///
/// The first frame and every reset frame are recorded with a zero delay.
#[derive(Debug)]
pub struct FileWriter {
    out: LineWriter<File>,
    path: PathBuf,
    last: Option<Instant>,
}

impl FileWriter {
    /// Create (or truncate) the log at `path`.
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path).map_err(|e| TransportError::Open {
            path: path.clone(),
            source: e,
        })?;

        info!(?path, "file writer created");

        Ok(Self {
            out: LineWriter::new(file),
            path,
            last: None,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FrameSink for FileWriter {
    fn write_frame(&mut self, message: &Message) -> Result<()> {
        let frame = message.frame()?;

        let now = Instant::now();
        let delay = match self.last {
            Some(prev) if !frame.is_reset() => now.duration_since(prev),
            _ => Duration::ZERO,
        };
        self.last = Some(now);

        self.out
            .write_all(encode_text_line(delay, &frame).as_bytes())
            .map_err(|e| TransportError::Write {
                path: self.path.clone(),
                source: e,
            })
    }

    fn tag(&self) -> &'static str {
        "filew"
    }
}
