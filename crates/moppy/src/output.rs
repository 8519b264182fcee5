use std::io::IsTerminal;

use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use moppy_frame::{Frame, TextFrame};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// One line of a recorded log, with its position on the playback timeline.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct FrameRecord {
    pub line: usize,
    pub delay_secs: f64,
    pub at_secs: f64,
    pub pin: u8,
    pub value: u16,
    pub channel: Option<u8>,
    pub reset: bool,
}

impl FrameRecord {
    pub fn new(line: usize, text: &TextFrame, at_secs: f64) -> Self {
        Self {
            line,
            delay_secs: text.delay.as_secs_f64(),
            at_secs,
            pin: text.frame.pin,
            value: text.frame.value,
            channel: text.frame.channel(),
            reset: text.frame.is_reset(),
        }
    }
}

pub fn print_records(records: &[FrameRecord], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for record in records {
                println!(
                    "{}",
                    serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["LINE", "AT", "DELAY", "PIN", "CHANNEL", "VALUE"]);
            for record in records {
                table.add_row(vec![
                    record.line.to_string(),
                    format!("{:.3}", record.at_secs),
                    format!("{:.3}", record.delay_secs),
                    record.pin.to_string(),
                    channel_label(record),
                    record.value.to_string(),
                ]);
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for record in records {
                println!(
                    "line={} at={:.3}s delay={:.3}s pin={} channel={} value={}",
                    record.line,
                    record.at_secs,
                    record.delay_secs,
                    record.pin,
                    channel_label(record),
                    record.value
                );
            }
        }
    }
}

#[derive(Serialize)]
struct SentOutput<'a> {
    destination: &'a str,
    pin: u8,
    value: u16,
    bytes: String,
}

pub fn print_sent(frame: &Frame, destination: &str, format: OutputFormat) {
    let bytes = moppy_frame::Message::from(*frame).hex();
    match format {
        OutputFormat::Json => {
            let out = SentOutput {
                destination,
                pin: frame.pin,
                value: frame.value,
                bytes,
            };
            println!(
                "{}",
                serde_json::to_string(&out).unwrap_or_else(|_| "{}".to_string())
            );
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(vec!["DESTINATION", "PIN", "VALUE", "BYTES"])
                .add_row(vec![
                    destination.to_string(),
                    frame.pin.to_string(),
                    frame.value.to_string(),
                    bytes,
                ]);
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "sent pin={} value={} bytes={} to {}",
                frame.pin, frame.value, bytes, destination
            );
        }
    }
}

fn channel_label(record: &FrameRecord) -> String {
    if record.reset {
        return "RESET".to_string();
    }
    match record.channel {
        Some(channel) => channel.to_string(),
        None => "-".to_string(),
    }
}
