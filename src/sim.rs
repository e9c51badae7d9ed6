//! Driving a program through an external CPU stepper.
//!
//! This module consists of:
//! - [`Harness`]: owns the memory image and the stepper, and runs the program
//!   to one of the [`Stop`] conditions.
//! - [`Cpu`]: the trait an external instruction stepper implements.
//! - [`Registers`]: the register view the stepper exposes to the host.
//!
//! The harness does not decode instructions itself. Each call to [`Cpu::step`]
//! hands the stepper the memory image and a [`io::Host`] for service calls;
//! the harness only inspects the program counter and halt flag between steps.

use std::fmt;

pub mod io;
pub mod mem;
pub mod profile;

use io::{Console, Host, StdoutConsole};
use mem::{FillStrategy, MemoryImage};
use profile::{Heatmap, Profiler};

/// The 8-bit register view the stepper exposes between steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Registers {
    /// The accumulator.
    pub a: u8,
    /// General-purpose register B.
    pub b: u8,
    /// General-purpose register C. Selects the service on a service call.
    pub c: u8,
    /// General-purpose register D.
    pub d: u8,
    /// General-purpose register E. Holds the character for service 2.
    pub e: u8,
    /// The flags register.
    pub f: u8,
    /// General-purpose register H.
    pub h: u8,
    /// General-purpose register L.
    pub l: u8,
}

impl Registers {
    /// The DE register pair as a 16-bit address (D is the high byte).
    pub fn de(&self) -> u16 {
        u16::from_be_bytes([self.d, self.e])
    }
}

/// Errors that can occur during simulation.
#[derive(Debug)]
pub enum SimErr {
    /// The stepper hit an opcode it cannot execute.
    IllegalOpcode,
    /// A string service call ran past the output length limit without
    /// finding its terminator.
    StringOverrun,
    /// The stepper failed for a reason of its own.
    Stepper(String),
}

impl fmt::Display for SimErr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimErr::IllegalOpcode => f.write_str("simulator executed illegal opcode"),
            SimErr::StringOverrun => f.write_str("string to print is too long"),
            SimErr::Stepper(msg)  => write!(f, "stepper error: {msg}"),
        }
    }
}
impl std::error::Error for SimErr {}

/// An external instruction stepper the harness can drive.
///
/// The stepper owns all instruction semantics. The harness supplies memory
/// and host services per step and reads back the program counter, halt flag
/// and register view.
pub trait Cpu {
    /// Resets the stepper to its power-on state.
    fn reset(&mut self);

    /// The current program counter.
    fn pc(&self) -> u16;

    /// Overrides the program counter.
    fn set_pc(&mut self, pc: u16);

    /// Whether the program has executed a halt.
    fn halted(&self) -> bool;

    /// The current register view.
    fn registers(&self) -> Registers;

    /// Enables or disables the stepper's own instruction tracing, if it has
    /// any. The default implementation ignores the request.
    fn set_trace(&mut self, _trace: bool) {}

    /// Executes one instruction.
    ///
    /// The stepper reads and writes `mem` freely and calls
    /// [`Host::service_call`] when the program requests a host service.
    fn step(&mut self, mem: &mut MemoryImage, host: &mut Host<'_>) -> Result<(), SimErr>;
}

/// The condition that ended a [`Harness::run`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stop {
    /// The program executed a halt instruction.
    Halted,
    /// The program counter reached the configured stop address.
    StopAddress,
    /// The profiling cycle budget ran out before the program ended.
    BudgetExhausted,
}

/// Configuration for [`Harness::new`].
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HarnessFlags {
    /// How unloaded memory gets its initial bytes.
    pub fill: FillStrategy,
    /// Whether the stepper's instruction tracing is enabled.
    pub trace: bool,
}

/// Executes a program in a memory image by driving a [`Cpu`] stepper.
pub struct Harness<C> {
    /// The memory image the program runs in.
    pub mem: MemoryImage,
    /// The stepper being driven.
    pub cpu: C,
    /// If set, [`Harness::run`] returns [`Stop::StopAddress`] when the
    /// program counter lands here after a step.
    pub stop_address: Option<u16>,

    profiler: Option<Profiler>,
    console: Box<dyn Console>,
    steps_run: u64,
}

impl<C: Cpu> Harness<C> {
    /// Creates a harness around the given stepper.
    ///
    /// Program output goes to stdout unless [`Harness::set_console`]
    /// replaces the sink.
    pub fn new(mut cpu: C, flags: HarnessFlags) -> Self {
        cpu.set_trace(flags.trace);
        Self {
            mem: MemoryImage::new(flags.fill),
            cpu,
            stop_address: None,
            profiler: None,
            console: Box::new(StdoutConsole),
            steps_run: 0,
        }
    }

    /// Replaces the console that receives program output.
    pub fn set_console(&mut self, console: impl Console + 'static) {
        self.console = Box::new(console);
    }

    /// Attaches a profiler with the given cycle budget.
    ///
    /// Each executed step costs one budget unit and records the program
    /// counter it started at. When the budget runs out, [`Harness::run`]
    /// stops before executing any further instruction.
    pub fn enable_profiling(&mut self, budget: u64) {
        self.profiler = Some(Profiler::new(budget));
    }

    /// The attached profiler, if profiling is enabled.
    pub fn profiler(&self) -> Option<&Profiler> {
        self.profiler.as_ref()
    }

    /// The accumulated heatmap, if profiling is enabled.
    pub fn heatmap(&self) -> Option<&Heatmap> {
        self.profiler.as_ref().map(Profiler::heatmap)
    }

    /// The number of steps executed so far across all runs.
    pub fn steps_run(&self) -> u64 {
        self.steps_run
    }

    /// Resets the stepper and points it at `addr`.
    pub fn reset_to(&mut self, addr: u16) {
        self.cpu.reset();
        self.cpu.set_pc(addr);
    }

    /// The stepper's current register view.
    pub fn registers(&self) -> Registers {
        self.cpu.registers()
    }

    /// Runs the program until it halts, reaches the stop address, or spends
    /// the profiling budget.
    ///
    /// Returns which of the three conditions ended the run, or the first
    /// error the stepper or a service call produced.
    pub fn run(&mut self) -> Result<Stop, SimErr> {
        loop {
            if let Some(prof) = &mut self.profiler {
                let pc = self.cpu.pc();
                if !prof.begin_step(pc) {
                    return Ok(Stop::BudgetExhausted);
                }
                self.console.put_str(&format!("{pc:04x}\n"));
            }

            let mut host = Host::new(&*self.console);
            self.cpu.step(&mut self.mem, &mut host)?;
            self.steps_run += 1;

            if self.cpu.halted() {
                return Ok(Stop::Halted);
            }
            if self.stop_address == Some(self.cpu.pc()) {
                return Ok(Stop::StopAddress);
            }
        }
    }
}

impl<C: fmt::Debug> fmt::Debug for Harness<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Harness")
            .field("cpu", &self.cpu)
            .field("mem", &self.mem)
            .field("stop_address", &self.stop_address)
            .field("profiler", &self.profiler)
            .field("steps_run", &self.steps_run)
            .finish_non_exhaustive()
    }
}
