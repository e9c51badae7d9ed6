//! Console output and the software-interrupt service trap.
//!
//! The emulated program can request two host-side text services through the
//! CP/M-style "BDOS call 5" convention. The external stepper detects the
//! convention and calls back into [`Host::service_call`]; the trap reads the
//! register view, pulls bytes from the memory image, and writes them to a
//! [`Console`].
//!
//! Two console implementations are provided:
//! - [`StdoutConsole`]: writes straight to the process stdout.
//! - [`BufferedConsole`]: writes to a shared memory buffer that tests (or an
//!   embedding UI) can inspect.

use std::sync::{Arc, RwLock};

use super::mem::MemoryImage;
use super::{Registers, SimErr};

/// Service number for "write the character in register E".
const SVC_PUTCHAR: u8 = 2;
/// Service number for "write the `$`-terminated string at address DE".
const SVC_PUTS: u8 = 9;
/// Longest string service 9 will emit before giving up.
const MAX_STRING_LENGTH: usize = 100;

/// A sink for bytes the emulated program prints.
pub trait Console {
    /// Writes one byte of program output.
    fn put_byte(&self, byte: u8);

    /// Writes a string of harness output (e.g. profiling trace lines).
    fn put_str(&self, s: &str) {
        for byte in s.bytes() {
            self.put_byte(byte);
        }
    }
}
impl dyn Console {} // assert Console is dyn safe

/// Console that writes to the process standard output, flushing per call so
/// interleaved diagnostics stay ordered.
pub struct StdoutConsole;
impl Console for StdoutConsole {
    fn put_byte(&self, byte: u8) {
        use std::io::Write;

        let mut out = std::io::stdout().lock();
        let _ = out.write_all(&[byte]);
        let _ = out.flush();
    }

    fn put_str(&self, s: &str) {
        use std::io::Write;

        let mut out = std::io::stdout().lock();
        let _ = out.write_all(s.as_bytes());
        let _ = out.flush();
    }
}

/// Console that appends to a shared byte buffer.
///
/// Cloning yields a handle to the same buffer, so a test can keep one handle
/// and hand the other to the harness.
///
/// # Example
/// ```
/// use z80_harness::sim::io::{BufferedConsole, Console};
///
/// let console = BufferedConsole::new();
/// let handle = console.clone();
/// console.put_byte(b'A');
/// assert_eq!(&**handle.get_output().read().unwrap(), b"A");
/// ```
#[derive(Clone, Default)]
pub struct BufferedConsole {
    output: Arc<RwLock<Vec<u8>>>,
}

impl BufferedConsole {
    /// Creates a console with an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets a reference to the output buffer.
    pub fn get_output(&self) -> &Arc<RwLock<Vec<u8>>> {
        &self.output
    }
}

impl Console for BufferedConsole {
    fn put_byte(&self, byte: u8) {
        self.output
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .push(byte);
    }
}

/// Host-side services the stepper may invoke synchronously during a step.
///
/// A fresh `Host` is constructed by the harness for every step; the stepper
/// receives it by `&mut` and calls [`Host::service_call`] when the emulated
/// program issues the modeled service-call convention.
pub struct Host<'a> {
    console: &'a dyn Console,
}

impl<'a> Host<'a> {
    pub(crate) fn new(console: &'a dyn Console) -> Self {
        Self { console }
    }

    /// Dispatches one service call based on register C.
    ///
    /// - C == 2: writes the character in register E.
    /// - C == 9: writes memory bytes starting at address DE until a `$`
    ///   terminator, wrapping modulo 65536. Emitting more than 100 bytes
    ///   without finding the terminator fails with [`SimErr::StringOverrun`].
    /// - anything else: no-op.
    pub fn service_call(&mut self, regs: &Registers, mem: &MemoryImage) -> Result<(), SimErr> {
        match regs.c {
            SVC_PUTCHAR => {
                self.console.put_byte(regs.e);
                Ok(())
            }
            SVC_PUTS => {
                let mut addr = regs.de();
                let mut emitted = 0;
                loop {
                    let byte = mem.get(addr);
                    if byte == b'$' {
                        break Ok(());
                    }
                    if emitted == MAX_STRING_LENGTH {
                        break Err(SimErr::StringOverrun);
                    }
                    self.console.put_byte(byte);
                    emitted += 1;
                    addr = addr.wrapping_add(1);
                }
            }
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::sim::mem::MemoryImage;
    use crate::sim::{Registers, SimErr};

    use super::{BufferedConsole, Console, Host};

    fn output(console: &BufferedConsole) -> Vec<u8> {
        console.get_output().read().unwrap().clone()
    }

    fn regs_for(c: u8, d: u8, e: u8) -> Registers {
        Registers { c, d, e, ..Default::default() }
    }

    #[test]
    fn test_service_putchar() {
        let console = BufferedConsole::new();
        let mem = MemoryImage::default();
        let mut host = Host::new(&console);

        host.service_call(&regs_for(2, 0, b'A'), &mem).unwrap();
        assert_eq!(output(&console), b"A");
    }

    #[test]
    fn test_service_puts_terminates_at_dollar() {
        let console = BufferedConsole::new();
        let mut mem = MemoryImage::default();
        mem.load(0x0200, b"OK$");
        let mut host = Host::new(&console);

        host.service_call(&regs_for(9, 0x02, 0x00), &mem).unwrap();
        // The terminator itself is not emitted.
        assert_eq!(output(&console), b"OK");
    }

    #[test]
    fn test_service_puts_wraps_address_space() {
        let console = BufferedConsole::new();
        let mut mem = MemoryImage::default();
        mem.set(0xFFFF, b'H');
        mem.set(0x0000, b'I');
        mem.set(0x0001, b'$');
        let mut host = Host::new(&console);

        host.service_call(&regs_for(9, 0xFF, 0xFF), &mem).unwrap();
        assert_eq!(output(&console), b"HI");
    }

    #[test]
    fn test_service_puts_overrun() {
        let console = BufferedConsole::new();
        let mut mem = MemoryImage::default();
        // 200 bytes with no terminator in reach.
        mem.load(0x0300, &[b'x'; 200]);
        let mut host = Host::new(&console);

        let err = host.service_call(&regs_for(9, 0x03, 0x00), &mem).unwrap_err();
        assert!(matches!(err, SimErr::StringOverrun));
    }

    #[test]
    fn test_unknown_service_is_noop() {
        let console = BufferedConsole::new();
        let mem = MemoryImage::default();
        let mut host = Host::new(&console);

        host.service_call(&regs_for(0, 0, b'A'), &mem).unwrap();
        host.service_call(&regs_for(255, 0, b'A'), &mem).unwrap();
        assert!(output(&console).is_empty());
    }
}
