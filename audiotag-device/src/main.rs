use std::{
    fs::{self, File},
    io::{self, BufReader, BufWriter, Read, Write},
    path::PathBuf,
    thread::{self, JoinHandle},
    time::Duration,
};

use anyhow::{anyhow, bail, Context, Result};
use audiotag_device::{
    audiotag::{
        AudioCapture, BlockForwarder, CaptureError, ConfigSequencer, Device, DoubleBuffer,
        GpsTimestamp, Handoff, RecordReader, SequencerReport, SharedState, TimestampCorrelator,
    },
    cli::{Command, CommandBuilder},
    split_port, ControlLine, HostDelay, IoWriter, PcmSource, SerialLink,
};
use chrono::SecondsFormat;
use clap::ArgMatches;
use futures::executor::block_on;

type HostDevice<'s> = Device<'s, SerialLink, ControlLine, HostDelay>;
type HostCorrelator<'s> = TimestampCorrelator<'s, ControlLine>;

fn main() -> Result<()> {
    env_logger::Builder::new()
        .format_timestamp(None)
        .format_target(false)
        .filter_level(log::LevelFilter::Info)
        .parse_env("AUDIOTAG_LOG")
        .init();

    let cli = CommandBuilder::default()
        .build()
        .version(clap::crate_version!())
        .get_matches();

    match cli.subcommand() {
        Some(("run", args)) => run(args),
        Some(("probe", args)) => probe(args),
        Some(("timestamps", args)) => timestamps(args),
        Some(("inspect", args)) => inspect(args),
        Some((other, _)) => bail!("Unknown command: {}", other),
        None => bail!("No command given"),
    }
}

/// Opens the port, parks EXTINT low and brings the receiver to the profile
fn configure<'s>(
    args: &ArgMatches,
    shared: &'s SharedState,
) -> Result<(HostDevice<'s>, HostCorrelator<'s>, SequencerReport)> {
    let profile = Command::profile(args)?;
    let port = Command::serialport(args)?;
    let (link, extint, reset) = split_port(port, Command::invert_lines(args))
        .context("Failed to open control lines of the serial port")?;

    let correlator = TimestampCorrelator::new(shared, extint).context("Failed to park EXTINT")?;
    let mut device = Device::new(link, reset, HostDelay, shared);
    let report = ConfigSequencer::new(&profile)
        .run(&mut device)
        .context("Receiver configuration failed")?;
    Ok((device, correlator, report))
}

fn spawn_receiver_loop(mut device: HostDevice<'static>) -> Result<JoinHandle<Result<()>>> {
    thread::Builder::new()
        .name("receiver".into())
        .spawn(move || match device.run() {
            Ok(never) => match never {},
            Err(e) => Err(e).context("Receiver link failed"),
        })
        .context("Failed to start the receiver loop")
}

/// Result of a context thread that is not supposed to stop
fn stopped(handle: JoinHandle<Result<()>>, name: &str) -> Result<()> {
    match handle.join() {
        Ok(Ok(())) => Err(anyhow!("{} stopped", name)),
        Ok(Err(e)) => Err(e.context(format!("{} stopped", name))),
        Err(_) => bail!("{} panicked", name),
    }
}

fn format_time(ts: GpsTimestamp, leap_seconds: i32) -> String {
    match ts.to_utc(leap_seconds) {
        Some(utc) => format!(
            "{} (week {} tow {:.6})",
            utc.to_rfc3339_opts(SecondsFormat::Micros, true),
            ts.week(),
            ts.time_of_week()
        ),
        None => "no time mark".to_string(),
    }
}

fn run(args: &ArgMatches) -> Result<()> {
    let sample_rate = Command::sample_rate(args);
    let audio = args
        .get_one::<PathBuf>("audio")
        .context("Audio input is required")?;
    let output = args
        .get_one::<PathBuf>("output")
        .context("Output is required")?;

    // Everything the three contexts share lives for the rest of the process
    let shared: &'static SharedState = Box::leak(Box::new(SharedState::new()));
    let handoff: &'static Handoff<'static> = Box::leak(Box::new(Handoff::new()));
    let first: &'static mut [i16] = Box::leak(vec![0i16; sample_rate].into_boxed_slice());
    let second: &'static mut [i16] = Box::leak(vec![0i16; sample_rate].into_boxed_slice());

    let input: Box<dyn Read> = if audio.as_os_str() == "-" {
        Box::new(io::stdin())
    } else {
        Box::new(
            File::open(audio)
                .with_context(|| format!("Failed to open audio input: {}", audio.display()))?,
        )
    };
    let transport: Box<dyn Write + Send> = if output.as_os_str() == "-" {
        Box::new(io::stdout())
    } else {
        Box::new(BufWriter::new(File::create(output).with_context(|| {
            format!("Failed to create output: {}", output.display())
        })?))
    };

    let (device, correlator, _) = configure(args, shared)?;
    let receiver = spawn_receiver_loop(device)?;

    let consumer = thread::Builder::new()
        .name("consumer".into())
        .spawn(move || {
            let mut forwarder = BlockForwarder::new(handoff, shared, IoWriter(transport));
            match block_on(forwarder.run()) {
                Ok(never) => match never {},
                Err(e) => Err(e).context("Failed to write record"),
            }
        })
        .context("Failed to start the consumer")?;

    let mut source = PcmSource::new(BufReader::new(input));
    if args.get_flag("realtime") {
        source = source.paced(Duration::from_secs(1));
    }
    let arena = DoubleBuffer::new(first, second);
    let mut capture = AudioCapture::new(source, arena, correlator, handoff);
    capture.start().context("Failed to toggle EXTINT")?;
    log::info!("Capturing blocks of {} samples", sample_rate);

    loop {
        if receiver.is_finished() {
            return stopped(receiver, "Receiver loop");
        }
        if consumer.is_finished() {
            return stopped(consumer, "Consumer");
        }
        match block_on(capture.capture_one()) {
            Ok(()) => {},
            Err(CaptureError::Source(e)) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e).context("Audio capture failed"),
        }
    }

    // let the consumer finish the block it has been handed
    while handoff.in_flight() > 0 && !consumer.is_finished() {
        thread::sleep(Duration::from_millis(10));
    }
    log::info!(
        "Audio input ended after {} blocks, {} written, {} dropped",
        capture.captured(),
        handoff.consumed(),
        handoff.dropped()
    );
    Ok(())
}

fn probe(args: &ArgMatches) -> Result<()> {
    let shared = SharedState::new();
    let (device, _, report) = configure(args, &shared)?;

    if let Some(version) = &report.version {
        println!("Software: {}", version.software_version);
        println!("Hardware: {}", version.hardware_version);
        for ext in &version.extensions {
            println!("  {}", ext);
        }
    }
    println!("Resets: {}", report.resets);
    println!("Corrections: {}", report.corrections);
    let stats = device.decoder_stats();
    println!(
        "Frames: {} ({} checksum failures, {} oversize)",
        stats.frames, stats.checksum_failures, stats.oversize
    );
    if device.interpreter().has_3d_fix() {
        let pos = shared.position();
        println!(
            "Position: {:.7} {:.7} {:.1} m",
            pos.lat, pos.lon, pos.height
        );
    }
    Ok(())
}

fn timestamps(args: &ArgMatches) -> Result<()> {
    let count = args.get_one::<u32>("count").copied().unwrap_or(10);
    let leap_seconds = Command::leap_seconds(args);
    let shared: &'static SharedState = Box::leak(Box::new(SharedState::new()));

    let (device, mut correlator, _) = configure(args, shared)?;
    let receiver = spawn_receiver_loop(device)?;

    // the first edge has nothing before it to report
    correlator
        .request_timestamp()
        .context("Failed to toggle EXTINT")?;
    let mut requested = 0;
    while count == 0 || requested < count {
        thread::sleep(Duration::from_secs(1));
        if receiver.is_finished() {
            return stopped(receiver, "Receiver loop");
        }
        let ts = correlator
            .request_timestamp()
            .context("Failed to toggle EXTINT")?;
        requested += 1;
        let pos = shared.position();
        println!(
            "{:>4} {} lat {:.7} lon {:.7} height {:.1}",
            requested,
            format_time(ts, leap_seconds),
            pos.lat,
            pos.lon,
            pos.height
        );
    }
    Ok(())
}

fn inspect(args: &ArgMatches) -> Result<()> {
    let path = args
        .get_one::<PathBuf>("input")
        .context("A record stream is required")?;
    let leap_seconds = Command::leap_seconds(args);
    let data = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;

    let mut reader = RecordReader::new(Command::sample_rate(args));
    let mut rest = &data[..];
    let mut records = 0;
    loop {
        let (record, consumed) = reader.next_record(rest);
        rest = &rest[consumed..];
        let Some(record) = record else {
            break;
        };
        records += 1;
        let peak = record
            .samples()
            .map(i16::unsigned_abs)
            .max()
            .unwrap_or(0);
        println!(
            "{:>6} {} lat {:.7} lon {:.7} height {:.1} peak {}",
            records,
            format_time(record.timestamp, leap_seconds),
            record.position.lat,
            record.position.lon,
            record.position.height,
            peak
        );
    }
    log::info!(
        "{} records, {} bytes skipped, {} trailing bytes",
        records,
        reader.skipped(),
        rest.len()
    );
    Ok(())
}
