use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use moppy_frame::{Frame, Message};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{Result, TransportError};
use crate::traits::FrameSink;

/// Where the kernel module exposes its attributes.
pub const DEFAULT_SYSFS_DIR: &str = "/sys/kernel/moppy/";

const CTRL_ATTR: &str = "ctrl";
const TICKS_ATTR: &str = "ticks";
const COMMAND_ATTR: &str = "command";

/// Attribute layout of the kernel module.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SysfsLayout {
    /// `ctrl` takes `reset`; `ticks` takes `"<channel>, <value>"`.
    #[default]
    Split,
    /// A single `command` attribute taking `"<pin>, <value>"` verbatim.
    Command,
}

/// Translates frames into writes on the kernel module's sysfs attributes.
///
/// Attributes are reopened on every write; sysfs consumes one write per open.
#[derive(Debug)]
pub struct SysfsWriter {
    base: PathBuf,
    layout: SysfsLayout,
}

impl SysfsWriter {
    pub fn new(base: impl AsRef<Path>) -> Self {
        Self::with_layout(base, SysfsLayout::default())
    }

    pub fn with_layout(base: impl AsRef<Path>, layout: SysfsLayout) -> Self {
        let base = base.as_ref().to_path_buf();
        info!(?base, ?layout, "sysfs writer created");
        Self { base, layout }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// The attribute name and text a frame translates to.
    pub fn translate(&self, frame: &Frame) -> Result<(&'static str, String)> {
        match self.layout {
            SysfsLayout::Split if frame.is_reset() => Ok((CTRL_ATTR, "reset".to_string())),
            SysfsLayout::Split => {
                let channel = frame
                    .channel()
                    .ok_or(TransportError::InvalidPin(frame.pin))?;
                Ok((TICKS_ATTR, format!("{channel}, {}", frame.value)))
            }
            SysfsLayout::Command => Ok((COMMAND_ATTR, format!("{}, {}", frame.pin, frame.value))),
        }
    }

    fn write_attr(&self, attr: &str, text: &str) -> Result<()> {
        let path = self.base.join(attr);
        let mut file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&path)
            .map_err(|e| TransportError::Open {
                path: path.clone(),
                source: e,
            })?;
        file.write_all(text.as_bytes())
            .map_err(|e| TransportError::Write { path, source: e })
    }
}

impl FrameSink for SysfsWriter {
    fn write_frame(&mut self, message: &Message) -> Result<()> {
        let frame = message.frame()?;
        let (attr, text) = self.translate(&frame)?;
        self.write_attr(attr, &text)
    }

    fn tag(&self) -> &'static str {
        "sysfsw"
    }
}
