use std::fs::File;
use std::io::{BufRead, BufReader};

use moppy_frame::decode_text_line;

use crate::cmd::InspectArgs;
use crate::exit::{frame_error, io_error, CliResult, SUCCESS};
use crate::output::{print_records, FrameRecord, OutputFormat};

pub fn run(args: InspectArgs, format: OutputFormat) -> CliResult<i32> {
    let file = File::open(&args.path)
        .map_err(|err| io_error(&format!("cannot open {}", args.path.display()), err))?;
    let records = read_records(BufReader::new(file), args.limit)?;
    print_records(&records, format);
    Ok(SUCCESS)
}

/// Decode a log up to its first blank line, which is where replay stops too.
fn read_records(input: impl BufRead, limit: Option<usize>) -> CliResult<Vec<FrameRecord>> {
    let mut records = Vec::new();
    let mut at_secs = 0.0;

    for (index, line) in input.lines().enumerate() {
        if limit.is_some_and(|limit| records.len() >= limit) {
            break;
        }
        let line = line.map_err(|err| io_error("read failed", err))?;
        if line.trim().is_empty() {
            break;
        }
        let text = decode_text_line(&line)
            .map_err(|err| frame_error(&format!("line {}", index + 1), err))?;
        at_secs += text.delay.as_secs_f64();
        records.push(FrameRecord::new(index + 1, &text, at_secs));
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::exit::DATA_INVALID;

    #[test]
    fn accumulates_playback_time() {
        let log = "0.000000, 100, 0\n0.250000, 2, 500\n0.5,4,300\n";
        let records = read_records(Cursor::new(log), None).unwrap();

        assert_eq!(records.len(), 3);
        assert!(records[0].reset);
        assert_eq!(records[1].channel, Some(0));
        assert_eq!(records[2].pin, 4);
        assert!((records[2].at_secs - 0.75).abs() < 1e-9);
    }

    #[test]
    fn stops_at_blank_line_and_limit() {
        let log = "0, 2, 1\n0, 2, 2\n\n0, 2, 3\n";
        assert_eq!(read_records(Cursor::new(log), None).unwrap().len(), 2);
        assert_eq!(read_records(Cursor::new(log), Some(1)).unwrap().len(), 1);
    }

    #[test]
    fn malformed_line_names_its_number() {
        let err = read_records(Cursor::new("0, 2, 1\nnot a frame\n"), None).unwrap_err();
        assert_eq!(err.code, DATA_INVALID);
        assert!(err.message.contains("line 2"), "{}", err.message);
    }
}
