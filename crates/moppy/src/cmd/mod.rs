use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, Subcommand, ValueEnum};
use moppy_transport::{SysfsLayout, DEFAULT_PTY_LINK, DEFAULT_SYSFS_DIR};

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod inspect;
pub mod proxy;
pub mod send;
pub mod version;

/// Default UDP port shared by the player and the proxy.
pub const DEFAULT_UDP_PORT: u16 = 12345;
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/.moppy_proxy.sock";

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Relay frames from one reader to one writer.
    Proxy(ProxyArgs),
    /// Send a single frame.
    Send(SendArgs),
    /// Print the frames of a recorded log.
    Inspect(InspectArgs),
    /// Show version information.
    Version(VersionArgs),
}

pub fn run(command: Command, format: OutputFormat) -> CliResult<i32> {
    match command {
        Command::Proxy(args) => proxy::run(args),
        Command::Send(args) => send::run(args, format),
        Command::Inspect(args) => inspect::run(args, format),
        Command::Version(args) => version::run(args),
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum ReaderKind {
    Pty,
    Serial,
    Udp,
    File,
    Socket,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum WriterKind {
    Serial,
    Udp,
    Sysfs,
    File,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum LayoutArg {
    Split,
    Command,
}

impl From<LayoutArg> for SysfsLayout {
    fn from(arg: LayoutArg) -> Self {
        match arg {
            LayoutArg::Split => SysfsLayout::Split,
            LayoutArg::Command => SysfsLayout::Command,
        }
    }
}

#[derive(Args, Debug)]
pub struct ProxyArgs {
    /// Load the reader/writer pairing from a JSON file instead of flags.
    #[arg(long, value_name = "FILE", conflicts_with_all = ["reader", "writer"])]
    pub config: Option<PathBuf>,
    /// Where frames come from.
    #[arg(short, long, value_enum, default_value = "pty")]
    pub reader: ReaderKind,
    /// Where frames go.
    #[arg(short, long, value_enum, default_value = "sysfs")]
    pub writer: WriterKind,
    /// Serial device for the serial reader or writer.
    #[arg(long, default_value = "/dev/ttyUSB0", env = "MOPPY_SERIAL_PORT")]
    pub serial_port: PathBuf,
    /// Serial line speed.
    #[arg(long, default_value_t = moppy_transport::DEFAULT_BAUD_RATE)]
    pub baud: u32,
    /// UDP host to bind (reader) or send to (writer).
    #[arg(long, default_value = "localhost", env = "MOPPY_UDP_HOST")]
    pub udp_host: String,
    /// UDP port to bind (reader) or send to (writer).
    #[arg(long, default_value_t = DEFAULT_UDP_PORT, env = "MOPPY_UDP_PORT")]
    pub udp_port: u16,
    /// Recorded log to replay.
    #[arg(long, default_value = "moppyin.mtf")]
    pub file_in: PathBuf,
    /// Log to record into.
    #[arg(long, default_value = "moppyout.mtf")]
    pub file_out: PathBuf,
    /// Symlink published for the pty reader's slave device.
    #[arg(long, default_value = DEFAULT_PTY_LINK)]
    pub pty_link: PathBuf,
    /// Unix socket path for the socket reader.
    #[arg(long, default_value = DEFAULT_SOCKET_PATH)]
    pub socket_path: PathBuf,
    /// Directory holding the moppy kernel module attributes.
    #[arg(long, default_value = DEFAULT_SYSFS_DIR)]
    pub sysfs_dir: PathBuf,
    /// Attribute layout of the kernel module.
    #[arg(long, value_enum, default_value = "split")]
    pub sysfs_layout: LayoutArg,
    /// Wait per read before checking for shutdown (e.g. 500ms, 1s).
    #[arg(long, default_value = "500ms")]
    pub timeout: String,
    /// Drop incomplete serial frames instead of forwarding them.
    #[arg(long)]
    pub discard_partial: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum SendTarget {
    Udp,
    Serial,
}

#[derive(Args, Debug)]
pub struct SendArgs {
    /// Transport to send over.
    #[arg(long, value_enum, default_value = "udp")]
    pub to: SendTarget,
    /// Pin (channel * 2 + 2).
    #[arg(long, required_unless_present = "reset")]
    pub pin: Option<u8>,
    /// Period value; 0 silences the channel.
    #[arg(long, default_value_t = 0, conflicts_with = "reset")]
    pub value: u16,
    /// Send the reset frame.
    #[arg(long, conflicts_with = "pin")]
    pub reset: bool,
    #[arg(long, default_value = "localhost", env = "MOPPY_UDP_HOST")]
    pub udp_host: String,
    #[arg(long, default_value_t = DEFAULT_UDP_PORT, env = "MOPPY_UDP_PORT")]
    pub udp_port: u16,
    /// Serial or pty device (a running proxy's pty link works).
    #[arg(long, default_value = DEFAULT_PTY_LINK)]
    pub device: PathBuf,
}

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Recorded log.
    pub path: PathBuf,
    /// Stop after N frames.
    #[arg(long)]
    pub limit: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, unit) = if let Some(num) = input.strip_suffix("ms") {
        (num, "ms")
    } else if let Some(num) = input.strip_suffix('s') {
        (num, "s")
    } else {
        (input, "ms")
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    match unit {
        "ms" => Ok(Duration::from_millis(value)),
        _ => Ok(Duration::from_secs(value)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").unwrap(), Duration::from_secs(2));
        assert_eq!(parse_duration("150ms").unwrap(), Duration::from_millis(150));
        assert_eq!(parse_duration("500").unwrap(), Duration::from_millis(500));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        assert!(parse_duration("0ms").is_err());
        assert!(parse_duration("bad").is_err());
        assert!(parse_duration("").is_err());
    }
}
