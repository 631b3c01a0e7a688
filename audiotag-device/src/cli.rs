use std::{fs, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use audiotag::ReceiverProfile;
use clap::{value_parser, Arg, ArgAction, ArgMatches};
use serialport::{FlowControl as SerialFlowControl, SerialPort};

pub struct CommandBuilder {
    command: clap::Command,
}

pub struct Command;

impl Default for CommandBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl CommandBuilder {
    pub fn new() -> Self {
        let command = clap::Command::new("audiotag")
            .about("Tags audio blocks with GPS time and position from a u-blox receiver")
            .arg_required_else_help(true)
            .subcommand_required(true)
            .arg(
                Arg::new("port")
                    .value_name("port")
                    .short('p')
                    .long("port")
                    .global(true)
                    .help("Serial port the receiver UART1 is connected to"),
            )
            .arg(
                Arg::new("baud")
                    .value_name("baud")
                    .short('s')
                    .long("baud")
                    .required(false)
                    .global(true)
                    .default_value("38400")
                    .value_parser(value_parser!(u32))
                    .help("Baud rate for the selected port"),
            )
            .arg(
                Arg::new("timeout")
                    .value_name("ms")
                    .long("timeout")
                    .required(false)
                    .global(true)
                    .default_value("10")
                    .value_parser(value_parser!(u64))
                    .help("Serial read timeout in milliseconds"),
            )
            .arg(
                Arg::new("invert-lines")
                    .long("invert-lines")
                    .global(true)
                    .action(ArgAction::SetTrue)
                    .help("Drive DTR (EXTINT) and RTS (RESET) with inverted polarity"),
            )
            .arg(
                Arg::new("profile")
                    .value_name("file")
                    .long("profile")
                    .required(false)
                    .global(true)
                    .value_parser(value_parser!(PathBuf))
                    .help("Receiver profile as JSON, the built-in profile when omitted"),
            )
            .arg(
                Arg::new("leap-seconds")
                    .value_name("seconds")
                    .long("leap-seconds")
                    .required(false)
                    .global(true)
                    .default_value("18")
                    .value_parser(value_parser!(i32))
                    .help("GPS-UTC offset used when printing timestamps"),
            )
            .subcommand(
                clap::Command::new("run")
                    .about("Configure the receiver, then tag and record audio blocks")
                    .arg(
                        Arg::new("audio")
                            .value_name("file")
                            .short('a')
                            .long("audio")
                            .required(false)
                            .default_value("-")
                            .value_parser(value_parser!(PathBuf))
                            .help("Raw signed 16-bit little-endian mono PCM, '-' for stdin"),
                    )
                    .arg(
                        Arg::new("sample-rate")
                            .value_name("hz")
                            .short('r')
                            .long("sample-rate")
                            .required(false)
                            .default_value("48000")
                            .value_parser(value_parser!(u32).range(1..))
                            .help("Samples per second, one block holds one second"),
                    )
                    .arg(
                        Arg::new("output")
                            .value_name("file")
                            .short('o')
                            .long("output")
                            .required(false)
                            .default_value("-")
                            .value_parser(value_parser!(PathBuf))
                            .help("Where records are written, '-' for stdout"),
                    )
                    .arg(
                        Arg::new("realtime")
                            .long("realtime")
                            .action(ArgAction::SetTrue)
                            .help("Pace audio read from a file at the sample rate"),
                    ),
            )
            .subcommand(
                clap::Command::new("probe")
                    .about("Run the configuration handshake and print the receiver identification"),
            )
            .subcommand(
                clap::Command::new("timestamps")
                    .about("Request an edge timestamp every second and print it with the position")
                    .arg(
                        Arg::new("count")
                            .value_name("n")
                            .short('n')
                            .long("count")
                            .required(false)
                            .default_value("10")
                            .value_parser(value_parser!(u32))
                            .help("Number of timestamps to request, 0 to keep going"),
                    ),
            )
            .subcommand(
                clap::Command::new("inspect")
                    .about("Decode a recorded stream and print one line per record")
                    .arg(
                        Arg::new("input")
                            .value_name("file")
                            .required(true)
                            .value_parser(value_parser!(PathBuf))
                            .help("Record stream written by 'run'"),
                    )
                    .arg(
                        Arg::new("sample-rate")
                            .value_name("hz")
                            .short('r')
                            .long("sample-rate")
                            .required(false)
                            .default_value("48000")
                            .value_parser(value_parser!(u32).range(1..))
                            .help("Samples per record"),
                    ),
            );
        Self { command }
    }

    pub fn build(&self) -> clap::Command {
        self.command.clone()
    }
}

impl Command {
    pub fn serialport(args: &ArgMatches) -> Result<Box<dyn SerialPort>> {
        let port = args
            .get_one::<String>("port")
            .context("A serial port is required, pass --port")?;
        let baud = args.get_one::<u32>("baud").copied().unwrap_or(38400);
        let timeout = args.get_one::<u64>("timeout").copied().unwrap_or(10);

        let builder = serialport::new(port, baud)
            .timeout(Duration::from_millis(timeout))
            .flow_control(SerialFlowControl::None);

        log::debug!("{:?}", &builder);
        builder
            .open()
            .with_context(|| format!("Failed to open port: {}", port))
    }

    /// The profile from `--profile`, else the built-in one
    pub fn profile(args: &ArgMatches) -> Result<ReceiverProfile> {
        let Some(path) = args.get_one::<PathBuf>("profile") else {
            return Ok(ReceiverProfile::default());
        };
        let text = fs::read_to_string(path)
            .with_context(|| format!("Failed to read profile: {}", path.display()))?;
        let profile: ReceiverProfile = serde_json::from_str(&text)
            .with_context(|| format!("Failed to parse profile: {}", path.display()))?;
        profile
            .validate()
            .with_context(|| format!("Profile does not fit the receiver: {}", path.display()))?;
        Ok(profile)
    }

    pub fn leap_seconds(args: &ArgMatches) -> i32 {
        args.get_one::<i32>("leap-seconds")
            .copied()
            .unwrap_or(audiotag::GPS_UTC_LEAP_SECONDS)
    }

    pub fn invert_lines(args: &ArgMatches) -> bool {
        args.get_flag("invert-lines")
    }

    pub fn sample_rate(args: &ArgMatches) -> usize {
        args.get_one::<u32>("sample-rate").copied().unwrap_or(48000) as usize
    }
}
