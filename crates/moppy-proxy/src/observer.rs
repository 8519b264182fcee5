use moppy_frame::Message;
use tracing::debug;

/// One forwarded message.
#[derive(Debug, Clone, Copy)]
pub struct Transfer<'a> {
    pub message: &'a Message,
    pub reader: &'static str,
    pub writer: &'static str,
}

/// Receives a record for every message the proxy forwards.
pub trait TransferObserver {
    fn on_transfer(&mut self, transfer: &Transfer<'_>);
}

/// Emits each transfer as a `tracing` debug event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl TransferObserver for TracingObserver {
    fn on_transfer(&mut self, transfer: &Transfer<'_>) {
        debug!(
            bytes = %transfer.message.hex(),
            reader = transfer.reader,
            writer = transfer.writer,
            "routing"
        );
    }
}

impl<T: TransferObserver + ?Sized> TransferObserver for &mut T {
    fn on_transfer(&mut self, transfer: &Transfer<'_>) {
        (**self).on_transfer(transfer)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::sync::{Arc, Mutex};

    use moppy_frame::Frame;

    use super::*;

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn tracing_observer_logs_hex_and_tags() {
        let captured = Captured::default();
        let sink = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || sink.clone())
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .finish();

        let message = Message::from(Frame::new(2, 500));
        tracing::subscriber::with_default(subscriber, || {
            TracingObserver.on_transfer(&Transfer {
                message: &message,
                reader: "ptyr",
                writer: "sysfsw",
            });
        });

        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("routing"), "{output}");
        assert!(output.contains("0201f4"), "{output}");
        assert!(output.contains("ptyr"), "{output}");
        assert!(output.contains("sysfsw"), "{output}");
    }
}
