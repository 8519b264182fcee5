use moppy_proxy::{ProxyConfig, ReaderConfig, StopReason, StopToken, WriterConfig};
use moppy_transport::PartialFramePolicy;
use tracing::info;

use crate::cmd::{parse_duration, ProxyArgs, ReaderKind, WriterKind};
use crate::exit::{proxy_error, CliError, CliResult, INTERNAL, SUCCESS};

pub fn run(args: ProxyArgs) -> CliResult<i32> {
    let config = resolve_config(&args)?;

    let stop = StopToken::new();
    install_ctrlc_handler(stop.clone())?;

    let mut proxy = config
        .build()
        .map_err(|err| proxy_error("startup failed", err))?;
    let result = proxy.run(&stop);
    let stats = proxy.stats();
    // Release the pty link and socket file before reporting.
    drop(proxy);

    let reason = result.map_err(|err| proxy_error("proxy stopped", err))?;
    match reason {
        StopReason::Cancelled => info!(forwarded = stats.forwarded, "interrupted, shutting down"),
        StopReason::EndOfStream => info!(forwarded = stats.forwarded, "input exhausted"),
        StopReason::IterationLimit => info!(forwarded = stats.forwarded, "iteration limit reached"),
    }
    Ok(SUCCESS)
}

fn resolve_config(args: &ProxyArgs) -> CliResult<ProxyConfig> {
    if let Some(path) = &args.config {
        return ProxyConfig::from_json_file(path).map_err(|err| proxy_error("config", err));
    }

    let reader = match args.reader {
        ReaderKind::Pty => ReaderConfig::Pty {
            link: args.pty_link.clone(),
        },
        ReaderKind::Serial => ReaderConfig::Serial {
            path: args.serial_port.clone(),
            baud: args.baud,
            partial: if args.discard_partial {
                PartialFramePolicy::Discard
            } else {
                PartialFramePolicy::Forward
            },
        },
        ReaderKind::Udp => ReaderConfig::Udp {
            host: args.udp_host.clone(),
            port: args.udp_port,
        },
        ReaderKind::File => ReaderConfig::File {
            path: args.file_in.clone(),
        },
        ReaderKind::Socket => ReaderConfig::Socket {
            path: args.socket_path.clone(),
        },
    };

    let writer = match args.writer {
        WriterKind::Serial => WriterConfig::Serial {
            path: args.serial_port.clone(),
            baud: args.baud,
        },
        WriterKind::Udp => WriterConfig::Udp {
            host: args.udp_host.clone(),
            port: args.udp_port,
        },
        WriterKind::Sysfs => WriterConfig::Sysfs {
            dir: args.sysfs_dir.clone(),
            layout: args.sysfs_layout.into(),
        },
        WriterKind::File => WriterConfig::File {
            path: args.file_out.clone(),
        },
    };

    let timeout = parse_duration(&args.timeout)?;
    Ok(ProxyConfig {
        reader,
        writer,
        read_timeout_ms: u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX),
    })
}

fn install_ctrlc_handler(stop: StopToken) -> CliResult<()> {
    ctrlc::set_handler(move || stop.stop()).map_err(|err| {
        CliError::new(INTERNAL, format!("signal handler setup failed: {err}"))
    })
}
