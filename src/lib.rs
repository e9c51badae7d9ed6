//! A debugging-oriented execution harness for Z80 memory images.
//!
//! This crate owns everything around the CPU, but not the CPU itself:
//! it loads raw binaries into a 64K memory image, ingests label, inspection
//! and assembler-listing files so that raw addresses can be reported with
//! human-meaningful names, drives an externally supplied instruction stepper
//! until a stop condition is reached, and renders symbol-aware reports of the
//! final machine state (plus an execution-frequency profile when enabled).
//!
//! The instruction-level emulation is an external collaborator behind the
//! [`Cpu`] trait; the harness only relies on a reset/step contract, a
//! program counter, a halted flag, and a byte-level register view.
//!
//! # Usage
//!
//! Binaries are placed into a [`MemoryImage`], whose origin is then used to
//! resolve relative addresses from symbol files:
//!
//! ```
//! use z80_harness::sim::mem::MemoryImage;
//! use z80_harness::sym::parse_labels;
//!
//! let mut mem = MemoryImage::default();
//! mem.load(0x0100, &[0x3e, 0x41, 0x76]);
//! assert_eq!(mem.origin(), 0x0100);
//!
//! // Label addresses are relative to the load origin:
//! let (labels, warnings) = parse_labels("START = $0002\n", mem.origin());
//! assert!(warnings.is_empty());
//! assert_eq!(labels[0].name, "START");
//! assert_eq!(labels[0].addr, 0x0102);
//! ```
//!
//! Execution is driven by a [`Harness`] wrapping a [`Cpu`] implementation:
//!
//! ```no_run
//! use z80_harness::sim::{Cpu, Harness, Stop};
//! # fn run(mut harness: Harness<impl Cpu>) {
//! harness.stop_address = Some(0xF000);
//! match harness.run() {
//!     Ok(Stop::Halted)          => { /* CPU reported a halt */ },
//!     Ok(Stop::StopAddress)     => { /* PC reached 0xF000 */ },
//!     Ok(Stop::BudgetExhausted) => { /* profiling cycle budget ran out */ },
//!     Err(e) => eprintln!("{e}"),
//! }
//! # }
//! ```
//!
//! A host binary that owns a concrete stepper can delegate its whole argument
//! handling to [`cli::run`], which implements an order-sensitive flag grammar
//! (`-l addr file`, `-R addr`, `-X addr`, label/listing ingestion, report
//! output, profiling).
//!
//! [`Cpu`]: sim::Cpu
//! [`MemoryImage`]: sim::mem::MemoryImage
//! [`Harness`]: sim::Harness
#![warn(missing_docs)]

pub mod cli;
pub mod report;
pub mod sim;
pub mod sym;
