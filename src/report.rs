//! Symbol-aware report generators.
//!
//! Two reports can be produced after a run:
//! - [`write_state`]: registers plus memory dumps around the ingested labels
//!   and inspection entries.
//! - [`write_profile`]: the execution heatmap joined against the ingested
//!   listing.
//!
//! Both take any [`Write`] sink; the CLI points them at files.

use std::io::Write;

use crate::sim::mem::MemoryImage;
use crate::sim::profile::Heatmap;
use crate::sim::Registers;
use crate::sym::{InspectionEntry, LabelEntry, Listing};

/// Label names with dedicated dump formats in the state report.
const RESERVED: [&str; 4] = ["WORKING", "TEMPORARY", "DESCRIPTORS", "USING"];

/// Bytes dumped for the `WORKING` and `TEMPORARY` regions.
const REGION_DUMP_LEN: usize = 1024;
/// Bytes dumped for the `DESCRIPTORS` table (255 four-byte descriptors).
const DESCRIPTOR_DUMP_LEN: usize = 4 * 255;

fn dump_bytes<W: Write>(w: &mut W, mem: &MemoryImage, addr: u16, len: usize) -> std::io::Result<()> {
    for byte in mem.bytes(addr, len) {
        write!(w, "{byte:02x} ")?;
    }
    writeln!(w)
}

/// Writes the memory-state report.
///
/// The layout is line-oriented:
/// 1. The eight registers (`a b c d e f h l`) as two hex digits each.
/// 2. The reserved labels, in the order they were ingested. `WORKING` and
///    `TEMPORARY` get a name line, then their address and a 1024-byte dump;
///    `DESCRIPTORS` gets a name line and a 1020-byte dump; `USING` gets a
///    name line and the single byte at its address.
/// 3. Every other label on one line with the four bytes at its address.
/// 4. The inspection entries, each a name line and a dump of `size` bytes.
///
/// All dumps read through [`MemoryImage::bytes`], so they wrap modulo 65536
/// rather than running out of bounds.
pub fn write_state<W: Write>(
    w: &mut W,
    regs: &Registers,
    mem: &MemoryImage,
    labels: &[LabelEntry],
    inspections: &[InspectionEntry],
) -> std::io::Result<()> {
    let Registers { a, b, c, d, e, f, h, l } = *regs;
    writeln!(w, "{a:02x} {b:02x} {c:02x} {d:02x} {e:02x} {f:02x} {h:02x} {l:02x}")?;

    for label in labels {
        match &*label.name {
            "WORKING" | "TEMPORARY" => {
                writeln!(w, "{}", label.name)?;
                write!(w, "{:04x} ", label.addr)?;
                dump_bytes(w, mem, label.addr, REGION_DUMP_LEN)?;
            }
            "DESCRIPTORS" => {
                writeln!(w, "{}", label.name)?;
                dump_bytes(w, mem, label.addr, DESCRIPTOR_DUMP_LEN)?;
            }
            "USING" => {
                writeln!(w, "{}", label.name)?;
                dump_bytes(w, mem, label.addr, 1)?;
            }
            _ => {}
        }
    }

    for label in labels {
        if RESERVED.contains(&&*label.name) {
            continue;
        }
        let mut bytes = mem.bytes(label.addr, 4);
        // The iterator yields exactly four items.
        let (b0, b1, b2, b3) = (
            bytes.next().unwrap_or(0),
            bytes.next().unwrap_or(0),
            bytes.next().unwrap_or(0),
            bytes.next().unwrap_or(0),
        );
        writeln!(
            w,
            "{} {:04x} {b0:02x} {b1:02x} {b2:02x} {b3:02x}",
            label.name, label.addr
        )?;
    }

    for entry in inspections {
        writeln!(w, "{}", entry.name)?;
        dump_bytes(w, mem, entry.addr, entry.size)?;
    }

    Ok(())
}

/// Writes the profile report.
///
/// One line per listing entry, in address order: the execution count and the
/// address as four hex digits, then the source line number in decimal and
/// the instruction text. Addresses without a listing entry are omitted even
/// if they were executed.
pub fn write_profile<W: Write>(
    w: &mut W,
    heatmap: &Heatmap,
    listing: &Listing,
) -> std::io::Result<()> {
    for (addr, line) in listing.iter() {
        writeln!(
            w,
            "{:04x} {addr:04x} {} {}",
            heatmap.count(addr),
            line.source_line,
            line.text
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use crate::sim::mem::MemoryImage;
    use crate::sim::profile::Heatmap;
    use crate::sim::Registers;
    use crate::sym::{InspectionEntry, LabelEntry, Listing, ListingLine};

    use super::{write_profile, write_state};

    fn label(name: &str, addr: u16) -> LabelEntry {
        LabelEntry { name: name.to_string(), addr }
    }

    fn state_report(
        regs: &Registers,
        mem: &MemoryImage,
        labels: &[LabelEntry],
        inspections: &[InspectionEntry],
    ) -> String {
        let mut out = Vec::new();
        write_state(&mut out, regs, mem, labels, inspections).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_register_line() {
        let regs = Registers { a: 0x41, b: 1, c: 2, d: 3, e: 4, f: 5, h: 6, l: 7 };
        let report = state_report(&regs, &MemoryImage::default(), &[], &[]);
        assert_eq!(report, "41 01 02 03 04 05 06 07\n");
    }

    #[test]
    fn test_working_region_dump() {
        let mut mem = MemoryImage::default();
        mem.set(0xC000, 0xAB);
        let report = state_report(
            &Registers::default(),
            &mem,
            &[label("WORKING", 0xC000)],
            &[],
        );

        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[1], "WORKING");
        // Address prefix plus 1024 byte fields.
        let fields: Vec<&str> = lines[2].split_whitespace().collect();
        assert_eq!(fields.len(), 1 + 1024);
        assert_eq!(fields[0], "c000");
        assert_eq!(fields[1], "ab");
        assert_eq!(fields[2], "00");
    }

    #[test]
    fn test_descriptors_dump_has_no_address_prefix() {
        let report = state_report(
            &Registers::default(),
            &MemoryImage::default(),
            &[label("DESCRIPTORS", 0x9000)],
            &[],
        );

        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[1], "DESCRIPTORS");
        assert_eq!(lines[2].split_whitespace().count(), 4 * 255);
    }

    #[test]
    fn test_using_dumps_single_byte() {
        let mut mem = MemoryImage::default();
        mem.set(0x8000, 0x42);
        let report = state_report(
            &Registers::default(),
            &mem,
            &[label("USING", 0x8000)],
            &[],
        );

        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[1], "USING");
        assert_eq!(lines[2], "42 ");
    }

    #[test]
    fn test_plain_label_line() {
        let mut mem = MemoryImage::default();
        mem.load(0x1234, &[0xDE, 0xAD, 0xBE, 0xEF]);
        let report = state_report(
            &Registers::default(),
            &mem,
            &[label("COUNTER", 0x1234)],
            &[],
        );

        assert_eq!(report.lines().nth(1), Some("COUNTER 1234 de ad be ef"));
    }

    #[test]
    fn test_inspection_dump() {
        let mut mem = MemoryImage::default();
        mem.load(0x2000, &[1, 2, 3]);
        let report = state_report(
            &Registers::default(),
            &MemoryImage::default(),
            &[],
            &[InspectionEntry { name: "BUFFER".to_string(), addr: 0x2000, size: 3 }],
        );
        // Zeroed image above on purpose: verify the entry shape, not values.
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines[1], "BUFFER");
        assert_eq!(lines[2].split_whitespace().count(), 3);

        let report = state_report(
            &Registers::default(),
            &mem,
            &[],
            &[InspectionEntry { name: "BUFFER".to_string(), addr: 0x2000, size: 3 }],
        );
        assert_eq!(report.lines().nth(2), Some("01 02 03 "));
    }

    #[test]
    fn test_reserved_labels_not_repeated_as_plain() {
        let report = state_report(
            &Registers::default(),
            &MemoryImage::default(),
            &[label("USING", 0x8000), label("COUNTER", 0x1000)],
            &[],
        );
        assert_eq!(report.matches("USING").count(), 1);
        assert!(report.contains("COUNTER 1000"));
    }

    #[test]
    fn test_profile_joins_listing_only() {
        let mut heatmap = Heatmap::new();
        heatmap.record(0x0100);
        heatmap.record(0x0100);
        heatmap.record(0x0500); // executed, but not in the listing

        let mut listing = Listing::new();
        listing.insert(0x0100, ListingLine { text: "LD A,$41".to_string(), source_line: 12 });
        listing.insert(0x0102, ListingLine { text: "HALT".to_string(), source_line: 13 });

        let mut out = Vec::new();
        write_profile(&mut out, &heatmap, &listing).unwrap();
        let report = String::from_utf8(out).unwrap();

        assert_eq!(
            report,
            "0002 0100 12 LD A,$41\n0000 0102 13 HALT\n"
        );
    }
}
