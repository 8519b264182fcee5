use std::path::{Path, PathBuf};
use std::time::Duration;

use moppy_transport::{
    FileReader, FileWriter, PartialFramePolicy, PtyReader, Reader, SerialReader, SerialWriter,
    SocketReader, SysfsLayout, SysfsWriter, UdpReader, UdpWriter, Writer, DEFAULT_BAUD_RATE,
    DEFAULT_PTY_LINK, DEFAULT_SYSFS_DIR,
};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{ProxyError, Result};
use crate::proxy::Proxy;

/// Default wait per read.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(500);

/// Which frame source to open, and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReaderConfig {
    Serial {
        path: PathBuf,
        #[serde(default = "default_baud")]
        baud: u32,
        #[serde(default)]
        partial: PartialFramePolicy,
    },
    Pty {
        #[serde(default = "default_pty_link")]
        link: PathBuf,
    },
    Udp {
        host: String,
        port: u16,
    },
    File {
        path: PathBuf,
    },
    Socket {
        path: PathBuf,
    },
}

/// Which frame sink to open, and how.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum WriterConfig {
    Serial {
        path: PathBuf,
        #[serde(default = "default_baud")]
        baud: u32,
    },
    Udp {
        host: String,
        port: u16,
    },
    Sysfs {
        #[serde(default = "default_sysfs_dir")]
        dir: PathBuf,
        #[serde(default)]
        layout: SysfsLayout,
    },
    File {
        path: PathBuf,
    },
}

/// A complete reader/writer pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub reader: ReaderConfig,
    pub writer: WriterConfig,
    /// Wait per read in milliseconds.
    #[serde(default = "default_read_timeout_ms")]
    pub read_timeout_ms: u64,
}

fn default_baud() -> u32 {
    DEFAULT_BAUD_RATE
}

fn default_pty_link() -> PathBuf {
    PathBuf::from(DEFAULT_PTY_LINK)
}

fn default_sysfs_dir() -> PathBuf {
    PathBuf::from(DEFAULT_SYSFS_DIR)
}

fn default_read_timeout_ms() -> u64 {
    DEFAULT_READ_TIMEOUT.as_millis() as u64
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self::Pty {
            link: default_pty_link(),
        }
    }
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self::Sysfs {
            dir: default_sysfs_dir(),
            layout: SysfsLayout::default(),
        }
    }
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            reader: ReaderConfig::default(),
            writer: WriterConfig::default(),
            read_timeout_ms: default_read_timeout_ms(),
        }
    }
}

impl ReaderConfig {
    /// Construct the reader. Construction side effects (binding, pty
    /// symlinks) happen here.
    pub fn open(&self) -> moppy_transport::Result<Reader> {
        let reader: Reader = match self {
            Self::Serial {
                path,
                baud,
                partial,
            } => SerialReader::open_with(path, *baud, *partial)?.into(),
            Self::Pty { link } => PtyReader::open(link)?.into(),
            Self::Udp { host, port } => UdpReader::bind(host, *port)?.into(),
            Self::File { path } => FileReader::open(path)?.into(),
            Self::Socket { path } => SocketReader::bind(path)?.into(),
        };
        Ok(reader)
    }
}

impl WriterConfig {
    pub fn open(&self) -> moppy_transport::Result<Writer> {
        let writer: Writer = match self {
            Self::Serial { path, baud } => SerialWriter::open_with_baud(path, *baud)?.into(),
            Self::Udp { host, port } => UdpWriter::connect(host, *port)?.into(),
            Self::Sysfs { dir, layout } => SysfsWriter::with_layout(dir, *layout).into(),
            Self::File { path } => FileWriter::create(path)?.into(),
        };
        Ok(writer)
    }
}

impl ProxyConfig {
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|err| ProxyError::Config {
            path: path.to_path_buf(),
            message: err.to_string(),
        })?;
        serde_json::from_str(&text).map_err(|err| ProxyError::Config {
            path: path.to_path_buf(),
            message: err.to_string(),
        })
    }

    /// Open the reader, then the writer, and wire them into a proxy.
    ///
    /// If the writer fails to open, the already-open reader is dropped and
    /// its resources released before the error is returned.
    pub fn build(&self) -> Result<Proxy<Reader, Writer>> {
        let reader = self.reader.open().map_err(ProxyError::Setup)?;
        let writer = self.writer.open().map_err(ProxyError::Setup)?;
        info!(reader = ?self.reader, writer = ?self.writer, "transports ready");
        Ok(Proxy::new(reader, writer).with_read_timeout(self.read_timeout()))
    }
}
