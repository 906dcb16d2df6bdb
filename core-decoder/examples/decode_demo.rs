//! Decode a FLAC file end to end
//!
//! Opens a local file, prints what the headers say, decodes to the end and
//! then seeks back to the middle.
//!
//! Run with:
//! ```bash
//! cargo run -p core-decoder --example decode_demo -- track.flac
//!
//! # Trace the engine and seek ladder
//! cargo run -p core-decoder --example decode_demo -- track.flac "core_decoder=trace"
//! ```

use std::env;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use bridge_desktop::LocalFileSource;
use bridge_traits::logging::LogLevel;
use bridge_traits::{DecoderHost, GainKind};
use core_decoder::FlacDecoder;
use core_runtime::logging::{init_logging, strip_path, LoggingConfig};
use tracing::info;

/// Prints every host notification.
struct PrintingHost;

impl DecoderHost for PrintingHost {
    fn set_length(&self, seconds: f64) {
        println!("host: length {:.3}s", seconds);
    }

    fn set_gain(&self, kind: GainKind, value: f32) {
        println!("host: {:?} gain {}", kind, value);
    }
}

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();
    let Some(path) = args.get(1) else {
        bail!("usage: decode_demo <file.flac> [filter]");
    };

    let mut config = LoggingConfig::default().with_level(LogLevel::Debug);
    if let Some(filter) = args.get(2) {
        config = config.with_filter(filter.clone());
    }
    init_logging(config).context("initializing logging")?;
    info!(file = %strip_path(path), "Decoding");

    let decoder = FlacDecoder::symphonia(Arc::new(PrintingHost));

    let info = decoder
        .file_info(Box::new(LocalFileSource::open(path)?))
        .context("reading file info")?;
    for (name, value) in &info.tags {
        println!("{}={}", name, value);
    }

    let mut session = decoder
        .open(Box::new(LocalFileSource::open(path)?))
        .context("opening session")?;
    let (rate, channels, bytes) = session.format();
    println!("{}", session.info_text());
    println!("{} hz, {} channels, {} bytes/sample", rate, channels, bytes);

    let mut block = vec![0.0f32; (rate * channels) as usize];
    let mut peak = 0.0f32;
    let mut seconds = 0usize;
    loop {
        let n = session.pull(&mut block);
        peak = block[..n].iter().fold(peak, |p, s| p.max(s.abs()));
        if n < block.len() {
            break;
        }
        seconds += 1;
    }
    info!(
        file = %strip_path(path),
        seconds,
        peak,
        position = session.position(),
        "Decoded to end"
    );

    let middle = (session.total_samples() * 1000 / rate as u64 / 2) as u32;
    let outcome = session.seek(middle);
    println!("seek to {}ms: {:?}", middle, outcome);

    let n = session.pull(&mut block);
    println!("pulled {} samples after seek", n);
    Ok(())
}
