use std::time::Duration;

use moppy_frame::Message;
use moppy_transport::{FrameSink, FrameSource};
use tracing::{debug, info};

use crate::cancel::StopToken;
use crate::config::DEFAULT_READ_TIMEOUT;
use crate::error::{ProxyError, Result};
use crate::observer::{TracingObserver, Transfer, TransferObserver};

/// Lifecycle of a proxy. There is no way back from `Stopped`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProxyState {
    Running,
    Stopped,
}

/// Why a run ended without an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The stop token was triggered.
    Cancelled,
    /// The reader ran out of frames.
    EndOfStream,
    /// The requested number of iterations completed.
    IterationLimit,
}

/// Result of a single iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// A message was read and written.
    Forwarded(Message),
    /// Nothing arrived within the read timeout.
    Idle,
    /// The reader has no more frames.
    EndOfStream,
}

/// Counters for a proxy's lifetime.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProxyStats {
    pub forwarded: u64,
    pub bytes: u64,
    pub idle_polls: u64,
}

/// Relays messages from one reader to one writer.
///
/// The proxy owns both transports. Dropping it releases them (pty symlinks,
/// socket files, open handles) whichever way the run ended.
pub struct Proxy<R, W, O = TracingObserver> {
    reader: R,
    writer: W,
    observer: O,
    read_timeout: Duration,
    state: ProxyState,
    stats: ProxyStats,
}

impl<R: FrameSource, W: FrameSink> Proxy<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self {
            reader,
            writer,
            observer: TracingObserver,
            read_timeout: DEFAULT_READ_TIMEOUT,
            state: ProxyState::Running,
            stats: ProxyStats::default(),
        }
    }
}

impl<R: FrameSource, W: FrameSink, O: TransferObserver> Proxy<R, W, O> {
    /// Replace the transfer observer.
    pub fn with_observer<O2: TransferObserver>(self, observer: O2) -> Proxy<R, W, O2> {
        Proxy {
            reader: self.reader,
            writer: self.writer,
            observer,
            read_timeout: self.read_timeout,
            state: self.state,
            stats: self.stats,
        }
    }

    /// How long each read waits for a message.
    pub fn with_read_timeout(mut self, read_timeout: Duration) -> Self {
        self.read_timeout = read_timeout;
        self
    }

    /// Perform one read and, if a message arrived, one write.
    ///
    /// End of stream and fatal errors move the proxy to `Stopped`.
    pub fn step(&mut self) -> Result<Step> {
        if self.state == ProxyState::Stopped {
            return Err(ProxyError::Stopped);
        }

        let message = match self.reader.read_frame(self.read_timeout) {
            Ok(Some(message)) if !message.is_empty() => message,
            Ok(_) => {
                self.stats.idle_polls += 1;
                return Ok(Step::Idle);
            }
            Err(err) if err.is_end_of_stream() => {
                debug!(reader = self.reader.tag(), error = %err, "reader exhausted");
                self.state = ProxyState::Stopped;
                return Ok(Step::EndOfStream);
            }
            Err(source) => {
                self.state = ProxyState::Stopped;
                return Err(ProxyError::Read {
                    reader: self.reader.tag(),
                    source,
                });
            }
        };

        if let Err(source) = self.writer.write_frame(&message) {
            self.state = ProxyState::Stopped;
            return Err(ProxyError::Write {
                writer: self.writer.tag(),
                source,
            });
        }

        self.stats.forwarded += 1;
        self.stats.bytes += message.len() as u64;
        self.observer.on_transfer(&Transfer {
            message: &message,
            reader: self.reader.tag(),
            writer: self.writer.tag(),
        });

        Ok(Step::Forwarded(message))
    }

    /// Run until stopped, the reader is exhausted, or an error occurs.
    pub fn run(&mut self, stop: &StopToken) -> Result<StopReason> {
        self.run_inner(None, stop)
    }

    /// Like [`run`](Self::run), but also stops after `iterations` steps.
    /// Idle polls count as iterations.
    pub fn run_iterations(&mut self, iterations: u64, stop: &StopToken) -> Result<StopReason> {
        self.run_inner(Some(iterations), stop)
    }

    fn run_inner(&mut self, limit: Option<u64>, stop: &StopToken) -> Result<StopReason> {
        if self.state == ProxyState::Stopped {
            return Err(ProxyError::Stopped);
        }

        info!(
            reader = self.reader.tag(),
            writer = self.writer.tag(),
            timeout = ?self.read_timeout,
            "proxy running"
        );

        let mut done = 0u64;
        let reason = loop {
            if stop.is_stopped() {
                break StopReason::Cancelled;
            }
            if limit.is_some_and(|limit| done >= limit) {
                break StopReason::IterationLimit;
            }
            if self.step()? == Step::EndOfStream {
                break StopReason::EndOfStream;
            }
            done += 1;
        };

        self.state = ProxyState::Stopped;
        info!(
            ?reason,
            forwarded = self.stats.forwarded,
            idle_polls = self.stats.idle_polls,
            "proxy stopped"
        );
        Ok(reason)
    }

    pub fn state(&self) -> ProxyState {
        self.state
    }

    pub fn stats(&self) -> ProxyStats {
        self.stats
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Consume the proxy and return its transports.
    pub fn into_parts(self) -> (R, W) {
        (self.reader, self.writer)
    }
}

impl<R: FrameSource, W: FrameSink, O> std::fmt::Debug for Proxy<R, W, O> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Proxy")
            .field("reader", &self.reader.tag())
            .field("writer", &self.writer.tag())
            .field("state", &self.state)
            .field("stats", &self.stats)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::time::Instant;

    use moppy_frame::{decode_text_line, Frame};
    use moppy_transport::{FileReader, FileWriter, TransportError};

    use super::*;

    /// Scripted reader: each entry is one read result.
    struct ScriptedReader {
        script: VecDeque<moppy_transport::Result<Option<Message>>>,
    }

    impl ScriptedReader {
        fn new(script: Vec<moppy_transport::Result<Option<Message>>>) -> Self {
            Self {
                script: script.into(),
            }
        }
    }

    impl FrameSource for ScriptedReader {
        fn read_frame(&mut self, _timeout: Duration) -> moppy_transport::Result<Option<Message>> {
            self.script.pop_front().unwrap_or(Ok(None))
        }

        fn tag(&self) -> &'static str {
            "scriptr"
        }
    }

    #[derive(Default)]
    struct VecWriter {
        written: Vec<Message>,
        fail_after: Option<usize>,
    }

    impl FrameSink for VecWriter {
        fn write_frame(&mut self, message: &Message) -> moppy_transport::Result<()> {
            if self.fail_after == Some(self.written.len()) {
                return Err(TransportError::Io(std::io::Error::from(
                    std::io::ErrorKind::BrokenPipe,
                )));
            }
            self.written.push(message.clone());
            Ok(())
        }

        fn tag(&self) -> &'static str {
            "vecw"
        }
    }

    #[derive(Default)]
    struct RecordingObserver {
        records: Vec<(Vec<u8>, &'static str, &'static str)>,
    }

    impl TransferObserver for RecordingObserver {
        fn on_transfer(&mut self, transfer: &Transfer<'_>) {
            self.records.push((
                transfer.message.as_bytes().to_vec(),
                transfer.reader,
                transfer.writer,
            ));
        }
    }

    fn frame(pin: u8, value: u16) -> moppy_transport::Result<Option<Message>> {
        Ok(Some(Message::from(Frame::new(pin, value))))
    }

    fn end() -> moppy_transport::Result<Option<Message>> {
        Err(TransportError::EndOfStream("done".to_string()))
    }

    #[test]
    fn forwards_in_order_and_skips_idle_polls() {
        let reader = ScriptedReader::new(vec![frame(2, 1), Ok(None), frame(4, 2), end()]);
        let mut proxy = Proxy::new(reader, VecWriter::default());

        let reason = proxy.run(&StopToken::new()).unwrap();

        assert_eq!(reason, StopReason::EndOfStream);
        assert_eq!(proxy.state(), ProxyState::Stopped);
        let written: Vec<_> = proxy
            .writer()
            .written
            .iter()
            .map(|m| m.frame().unwrap())
            .collect();
        assert_eq!(written, vec![Frame::new(2, 1), Frame::new(4, 2)]);
        assert_eq!(
            proxy.stats(),
            ProxyStats {
                forwarded: 2,
                bytes: 6,
                idle_polls: 1
            }
        );
    }

    #[test]
    fn empty_message_counts_as_idle() {
        let reader = ScriptedReader::new(vec![Ok(Some(Message::new(Vec::<u8>::new()))), end()]);
        let mut proxy = Proxy::new(reader, VecWriter::default());

        proxy.run(&StopToken::new()).unwrap();
        assert!(proxy.writer().written.is_empty());
        assert_eq!(proxy.stats().idle_polls, 1);
    }

    #[test]
    fn observer_sees_bytes_and_tags() {
        let reader = ScriptedReader::new(vec![frame(100, 0), end()]);
        let mut proxy =
            Proxy::new(reader, VecWriter::default()).with_observer(RecordingObserver::default());

        proxy.run(&StopToken::new()).unwrap();

        assert_eq!(
            proxy.observer().records,
            vec![(vec![100, 0, 0], "scriptr", "vecw")]
        );
    }

    #[test]
    fn partial_messages_pass_through_untouched() {
        let reader = ScriptedReader::new(vec![Ok(Some(Message::new(vec![4u8, 1]))), end()]);
        let mut proxy = Proxy::new(reader, VecWriter::default());

        proxy.run(&StopToken::new()).unwrap();
        assert_eq!(proxy.writer().written[0].as_bytes(), &[4, 1]);
    }

    #[test]
    fn stop_token_prevents_next_iteration() {
        let reader = ScriptedReader::new(vec![frame(2, 1), frame(2, 2)]);
        let mut proxy = Proxy::new(reader, VecWriter::default());
        let stop = StopToken::new();
        stop.stop();

        let reason = proxy.run(&stop).unwrap();
        assert_eq!(reason, StopReason::Cancelled);
        assert!(proxy.writer().written.is_empty());
    }

    #[test]
    fn iteration_limit_stops_deterministically() {
        let reader = ScriptedReader::new(vec![frame(2, 1), frame(2, 2), frame(2, 3)]);
        let mut proxy = Proxy::new(reader, VecWriter::default());

        let reason = proxy.run_iterations(2, &StopToken::new()).unwrap();
        assert_eq!(reason, StopReason::IterationLimit);
        assert_eq!(proxy.writer().written.len(), 2);
        assert!(matches!(proxy.step(), Err(ProxyError::Stopped)));
        assert!(matches!(
            proxy.run(&StopToken::new()),
            Err(ProxyError::Stopped)
        ));
    }

    #[test]
    fn read_error_is_fatal() {
        let reader = ScriptedReader::new(vec![
            frame(2, 1),
            Err(TransportError::Io(std::io::Error::from(
                std::io::ErrorKind::PermissionDenied,
            ))),
            frame(2, 2),
        ]);
        let mut proxy = Proxy::new(reader, VecWriter::default());

        let err = proxy.run(&StopToken::new()).unwrap_err();
        assert!(matches!(err, ProxyError::Read { reader: "scriptr", .. }));
        assert_eq!(proxy.state(), ProxyState::Stopped);
        assert_eq!(proxy.writer().written.len(), 1);
    }

    #[test]
    fn write_error_is_fatal_and_not_retried() {
        let reader = ScriptedReader::new(vec![frame(2, 1), frame(2, 2), frame(2, 3)]);
        let writer = VecWriter {
            fail_after: Some(1),
            ..VecWriter::default()
        };
        let mut proxy = Proxy::new(reader, writer).with_observer(RecordingObserver::default());

        let err = proxy.run(&StopToken::new()).unwrap_err();
        assert!(matches!(err, ProxyError::Write { writer: "vecw", .. }));
        assert_eq!(proxy.writer().written.len(), 1);
        assert_eq!(proxy.observer().records.len(), 1);
        assert_eq!(proxy.stats().forwarded, 1);
    }

    #[test]
    fn file_to_file_replay_preserves_frames_and_timing() {
        let dir = std::env::temp_dir().join(format!("moppy-proxy-e2e-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let input = dir.join("in.mtf");
        let output = dir.join("out.mtf");
        std::fs::write(&input, "0,2,500\n0.05,2,0\n").unwrap();

        let reader = FileReader::open(&input).unwrap();
        let writer = FileWriter::create(&output).unwrap();
        let mut proxy = Proxy::new(reader, writer);

        let start = Instant::now();
        let reason = proxy.run_iterations(2, &StopToken::new()).unwrap();
        assert_eq!(reason, StopReason::IterationLimit);
        assert!(start.elapsed() >= Duration::from_millis(50));
        drop(proxy);

        let text = std::fs::read_to_string(&output).unwrap();
        let lines: Vec<_> = text.lines().map(|l| decode_text_line(l).unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].delay, Duration::ZERO);
        assert_eq!(lines[0].frame, Frame::new(2, 500));
        assert!(lines[1].delay >= Duration::from_millis(45), "{:?}", lines[1].delay);
        assert!(lines[1].delay < Duration::from_millis(120), "{:?}", lines[1].delay);
        assert_eq!(lines[1].frame, Frame::new(2, 0));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
