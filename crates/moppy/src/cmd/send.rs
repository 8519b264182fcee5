use moppy_frame::{Frame, Message};
use moppy_transport::{FrameSink, SerialWriter, UdpWriter};
use tracing::debug;

use crate::cmd::{SendArgs, SendTarget};
use crate::exit::{transport_error, CliError, CliResult, SUCCESS, USAGE};
use crate::output::{print_sent, OutputFormat};

pub fn run(args: SendArgs, format: OutputFormat) -> CliResult<i32> {
    let frame = frame_from_args(&args)?;
    let message = Message::from(frame);

    let destination = match args.to {
        SendTarget::Udp => {
            let mut writer = UdpWriter::connect(&args.udp_host, args.udp_port)
                .map_err(|err| transport_error("udp setup failed", err))?;
            writer
                .write_frame(&message)
                .map_err(|err| transport_error("send failed", err))?;
            writer.destination().to_string()
        }
        SendTarget::Serial => {
            let mut writer = SerialWriter::open(&args.device)
                .map_err(|err| transport_error("device open failed", err))?;
            writer
                .write_frame(&message)
                .map_err(|err| transport_error("send failed", err))?;
            args.device.display().to_string()
        }
    };

    debug!(bytes = %message.hex(), %destination, "sent frame");
    print_sent(&frame, &destination, format);
    Ok(SUCCESS)
}

fn frame_from_args(args: &SendArgs) -> CliResult<Frame> {
    if args.reset {
        return Ok(Frame::reset());
    }
    match args.pin {
        Some(pin) => Ok(Frame::new(pin, args.value)),
        None => Err(CliError::new(USAGE, "either --pin or --reset is required")),
    }
}

#[cfg(test)]
mod tests {
    use std::net::UdpSocket;
    use std::path::PathBuf;
    use std::time::Duration;

    use super::*;

    fn args(to: SendTarget) -> SendArgs {
        SendArgs {
            to,
            pin: Some(4),
            value: 300,
            reset: false,
            udp_host: "127.0.0.1".to_string(),
            udp_port: 0,
            device: PathBuf::from("/nonexistent/moppy-device"),
        }
    }

    #[test]
    fn reset_flag_wins_over_pin() {
        let mut a = args(SendTarget::Udp);
        a.reset = true;
        assert_eq!(frame_from_args(&a).unwrap(), Frame::reset());

        a.reset = false;
        a.pin = None;
        assert_eq!(frame_from_args(&a).unwrap_err().code, USAGE);
    }

    #[test]
    fn sends_one_datagram() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();

        let mut a = args(SendTarget::Udp);
        a.udp_port = receiver.local_addr().unwrap().port();
        assert_eq!(run(a, OutputFormat::Pretty).unwrap(), SUCCESS);

        let mut buf = [0u8; 16];
        let n = receiver.recv(&mut buf).unwrap();
        assert_eq!(&buf[..n], &[4, 0x01, 0x2c]);
    }

    #[test]
    fn missing_device_is_transport_error() {
        let err = run(args(SendTarget::Serial), OutputFormat::Json).unwrap_err();
        assert_eq!(err.code, crate::exit::TRANSPORT_ERROR);
    }
}
