//! Order-sensitive command-line driver.
//!
//! [`run`] scans the arguments left to right and applies each flag as it is
//! seen, so load origins, symbol ingestion, and reset addresses compose in
//! argument order (e.g. `-l` must precede a `-L` whose addresses are relative
//! to that load's origin). A host binary supplies its stepper and forwards
//! `std::env::args`:
//!
//! ```no_run
//! use z80_harness::cli;
//! use z80_harness::sim::Cpu;
//!
//! fn main_with(cpu: impl Cpu) {
//!     let args: Vec<String> = std::env::args().skip(1).collect();
//!     if let Err(err) = cli::run(cpu, &args) {
//!         eprintln!("{err}");
//!         eprintln!("{}", cli::USAGE);
//!         std::process::exit(1);
//!     }
//! }
//! ```

use std::fmt;
use std::fs;
use std::io::Write as _;

use crate::report;
use crate::sim::{Cpu, Harness, HarnessFlags, SimErr};
use crate::sym::{self, LabelEntry, Listing, ParseWarning};

/// The usage message a host binary prints alongside a [`CliErr`].
pub const USAGE: &str = "\
usage: [option ...]
  -h                -- help (print this message)
  -l addr file      -- load file at addr
  -R addr           -- run from this address
  -X addr           -- terminate emulation if PC reaches addr
  -L file           -- read `NAME = $ADDR` labels, relative to the last load
  -L2 file          -- read `ADDR NAME` labels, relative to the last load
  -Li file          -- read `ADDR SIZE NAME` inspection entries
  -u file           -- read an assembler listing, relative to the last load
  -O file           -- write the memory-state report here after the run
  -p file cycles    -- enable profiling, write the report here
  -t                -- enable instruction tracing
";

/// Errors from the command-line driver.
#[derive(Debug)]
pub enum CliErr {
    /// An argument starting with `-` was not a recognized flag.
    UnknownFlag(String),
    /// A flag appeared without the arguments it requires.
    MissingArg {
        /// The flag that was short of arguments.
        flag: &'static str,
    },
    /// A file named on the command line could not be read.
    File {
        /// The path as given on the command line.
        path: String,
        /// The underlying I/O error.
        err: std::io::Error,
    },
    /// The run itself failed.
    Sim(SimErr),
    /// Writing a report failed.
    Io(std::io::Error),
}

impl fmt::Display for CliErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliErr::UnknownFlag(flag)   => write!(f, "unknown option: {flag}"),
            CliErr::MissingArg { flag } => write!(f, "missing argument for {flag}"),
            CliErr::File { path, err }  => write!(f, "cannot read {path}: {err}"),
            CliErr::Sim(err)            => err.fmt(f),
            CliErr::Io(err)             => write!(f, "cannot write report: {err}"),
        }
    }
}
impl std::error::Error for CliErr {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliErr::File { err, .. } | CliErr::Io(err) => Some(err),
            CliErr::Sim(err) => Some(err),
            _ => None,
        }
    }
}
impl From<SimErr> for CliErr {
    fn from(err: SimErr) -> Self {
        CliErr::Sim(err)
    }
}
impl From<std::io::Error> for CliErr {
    fn from(err: std::io::Error) -> Self {
        CliErr::Io(err)
    }
}

/// Parses a hexadecimal command-line value, with an optional `$` sigil.
///
/// Unparsable text warns on stderr and resolves to zero, matching the
/// forgiving recovery of symbol ingestion.
fn parse_cli_hex(tok: &str) -> u16 {
    let digits = tok.strip_prefix('$').unwrap_or(tok);
    match u32::from_str_radix(digits, 16) {
        Ok(value) => value as u16,
        Err(_) => {
            eprintln!("bad hex number: {tok}");
            0
        }
    }
}

fn next_arg<'a>(
    args: &mut impl Iterator<Item = &'a String>,
    flag: &'static str,
) -> Result<&'a str, CliErr> {
    args.next().map(String::as_str).ok_or(CliErr::MissingArg { flag })
}

fn read_file(path: &str) -> Result<String, CliErr> {
    fs::read_to_string(path).map_err(|err| CliErr::File { path: path.to_string(), err })
}

fn print_warnings(path: &str, warnings: &[ParseWarning]) {
    for warning in warnings {
        eprintln!("{path}: {warning}");
    }
}

/// Applies the command-line arguments to a fresh harness around `cpu`, runs
/// the program, and writes the configured reports.
///
/// `args` excludes the program name. Arguments not starting with `-` are
/// ignored; `-h` prints [`USAGE`] to stdout and returns without running.
pub fn run<C: Cpu>(cpu: C, args: &[String]) -> Result<(), CliErr> {
    let mut harness = Harness::new(cpu, HarnessFlags::default());
    let mut labels: Vec<LabelEntry> = Vec::new();
    let mut inspections = Vec::new();
    let mut listing = Listing::new();
    let mut output_path: Option<String> = None;
    let mut profile_path: Option<String> = None;

    let mut args = args.iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" => {
                print!("{USAGE}");
                return Ok(());
            }
            "-l" => {
                let addr = parse_cli_hex(next_arg(&mut args, "-l")?);
                let path = next_arg(&mut args, "-l")?;
                let bytes = fs::read(path)
                    .map_err(|err| CliErr::File { path: path.to_string(), err })?;
                harness.mem.load(addr, &bytes);
            }
            "-R" => {
                let addr = parse_cli_hex(next_arg(&mut args, "-R")?);
                harness.reset_to(addr);
            }
            "-X" => {
                let addr = parse_cli_hex(next_arg(&mut args, "-X")?);
                harness.stop_address = Some(addr);
            }
            "-L" => {
                let path = next_arg(&mut args, "-L")?;
                let src = read_file(path)?;
                let (entries, warnings) = sym::parse_labels(&src, harness.mem.origin());
                print_warnings(path, &warnings);
                labels.extend(entries);
            }
            "-L2" => {
                let path = next_arg(&mut args, "-L2")?;
                let src = read_file(path)?;
                let (entries, warnings) = sym::parse_labels_flat(&src, harness.mem.origin());
                print_warnings(path, &warnings);
                labels.extend(entries);
            }
            "-Li" => {
                let path = next_arg(&mut args, "-Li")?;
                let src = read_file(path)?;
                let (entries, warnings) = sym::parse_inspections(&src);
                print_warnings(path, &warnings);
                inspections.extend(entries);
            }
            "-u" => {
                let path = next_arg(&mut args, "-u")?;
                let src = read_file(path)?;
                let (entries, warnings) = sym::parse_listing(&src, harness.mem.origin());
                print_warnings(path, &warnings);
                listing.merge(entries);
            }
            "-O" => {
                output_path = Some(next_arg(&mut args, "-O")?.to_string());
            }
            "-p" => {
                let path = next_arg(&mut args, "-p")?;
                let cycles = next_arg(&mut args, "-p")?;
                profile_path = Some(path.to_string());
                harness.enable_profiling(cycles.parse().unwrap_or(0));
            }
            "-t" => harness.cpu.set_trace(true),
            flag if flag.starts_with('-') => {
                return Err(CliErr::UnknownFlag(flag.to_string()));
            }
            // Bare arguments are ignored.
            _ => {}
        }
    }

    harness.run()?;

    if let (Some(path), Some(heatmap)) = (&profile_path, harness.heatmap()) {
        let mut file = fs::File::create(path)?;
        report::write_profile(&mut file, heatmap, &listing)?;
        file.flush()?;
    }

    if let Some(path) = &output_path {
        let mut file = fs::File::create(path)?;
        report::write_state(&mut file, &harness.registers(), &harness.mem, &labels, &inspections)?;
        file.flush()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use crate::sim::stub::StubCpu;

    use super::{parse_cli_hex, run, CliErr};

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    /// A scratch path that is removed when dropped.
    struct TempPath(PathBuf);
    impl TempPath {
        fn new(name: &str) -> Self {
            let mut path = std::env::temp_dir();
            path.push(format!("z80-harness-{}-{name}", std::process::id()));
            Self(path)
        }
        fn as_str(&self) -> &str {
            self.0.to_str().unwrap()
        }
    }
    impl Drop for TempPath {
        fn drop(&mut self) {
            let _ = fs::remove_file(&self.0);
        }
    }

    #[test]
    fn test_parse_cli_hex() {
        assert_eq!(parse_cli_hex("c000"), 0xC000);
        assert_eq!(parse_cli_hex("$c000"), 0xC000);
        assert_eq!(parse_cli_hex("zzz"), 0);
    }

    #[test]
    fn test_unknown_flag() {
        let err = run(StubCpu::default(), &args(&["-z"])).unwrap_err();
        assert!(matches!(err, CliErr::UnknownFlag(flag) if flag == "-z"));
    }

    #[test]
    fn test_missing_argument() {
        let err = run(StubCpu::default(), &args(&["-X"])).unwrap_err();
        assert!(matches!(err, CliErr::MissingArg { flag: "-X" }));
    }

    #[test]
    fn test_missing_file() {
        let err = run(
            StubCpu::default(),
            &args(&["-l", "100", "/nonexistent/program.bin"]),
        )
        .unwrap_err();
        assert!(matches!(err, CliErr::File { .. }));
    }

    #[test]
    fn test_help_short_circuits() {
        // No binary, no stop address: would loop forever if -h did not stop
        // before running.
        run(StubCpu::default(), &args(&["-h", "-R", "100"])).unwrap();
    }

    #[test]
    fn test_load_run_report() {
        let bin = TempPath::new("program.bin");
        let labels = TempPath::new("labels.txt");
        let out = TempPath::new("state.txt");

        // LD A,'A'; CALL service 2; HALT.
        fs::write(&bin.0, [0x3E, 0x41, 0xCD, 0x02, 0x00, 0x76]).unwrap();
        fs::write(&labels.0, "COUNTER = $2\n").unwrap();

        run(
            StubCpu::default(),
            &args(&[
                "-l", "100", bin.as_str(),
                "-L", labels.as_str(),
                "-R", "100",
                "-O", out.as_str(),
            ]),
        )
        .unwrap();

        let report = fs::read_to_string(&out.0).unwrap();
        let lines: Vec<&str> = report.lines().collect();
        // A holds 0x41 after the run.
        assert!(lines[0].starts_with("41 "));
        // COUNTER resolved against the load origin 0x0100.
        assert_eq!(lines[1], "COUNTER 0102 cd 02 00 76");
    }

    #[test]
    fn test_profile_report_written() {
        let prof = TempPath::new("profile.txt");
        let listing = TempPath::new("listing.txt");

        fs::write(&listing.0, "     10000 \tNOP ; L1\n").unwrap();

        // All-zero memory is no-ops; the budget stops the run.
        run(
            StubCpu::default(),
            &args(&[
                "-u", listing.as_str(),
                "-R", "0",
                "-p", prof.as_str(), "5",
            ]),
        )
        .unwrap();

        let report = fs::read_to_string(&prof.0).unwrap();
        assert_eq!(report, "0001 0000 1 NOP ; L1\n");
    }
}
