//! The 64K memory image owned by the harness.
//!
//! This module consists of:
//! - [`MemoryImage`]: the address space plus the load origin.
//! - [`FillStrategy`]: how bytes that were never loaded get their values.
//!
//! The image is exclusively owned by the harness; it is mutated by
//! [`MemoryImage::load`] when a binary is placed and by the external stepper
//! as the program executes. All addressing is `u16`, so every address
//! computation wraps modulo 65536 by construction.

use rand::rngs::StdRng;
use rand::Rng;

/// Number of addressable bytes in the image.
pub const MEM_SIZE: usize = 1 << 16;

/// Trait that describes types that can produce fill bytes for memory that
/// was never loaded.
///
/// This is the byte-level analogue of seeding a machine's RAM before use.
pub trait ByteFiller {
    /// Generates one fill byte.
    fn generate(&mut self) -> u8;
}
impl ByteFiller for () {
    /// This creates unseeded, non-deterministic values.
    fn generate(&mut self) -> u8 {
        rand::random()
    }
}
impl ByteFiller for u8 {
    /// Sets each byte to the given value.
    fn generate(&mut self) -> u8 {
        *self
    }
}
impl ByteFiller for StdRng {
    /// This creates values from the standard random number generator.
    ///
    /// This can be used to create deterministic, seeded values.
    fn generate(&mut self) -> u8 {
        self.gen()
    }
}

/// Strategy used to initialize the bytes of a [`MemoryImage`].
///
/// The default is `Known { value: 0 }`, which keeps memory dumps
/// reproducible; the random strategies are useful to flush out programs that
/// read memory they never wrote.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum FillStrategy {
    /// Initializes each byte randomly and non-deterministically.
    Unseeded,

    /// Initializes each byte randomly and deterministically.
    Seeded {
        /// The seed the RNG is initialized with.
        seed: u64,
    },

    /// Initializes each byte to a known value.
    Known {
        /// The value to initialize each byte to.
        value: u8,
    },
}

impl Default for FillStrategy {
    fn default() -> Self {
        FillStrategy::Known { value: 0 }
    }
}

impl FillStrategy {
    fn generator(self) -> Generator {
        use rand::SeedableRng;

        match self {
            FillStrategy::Unseeded        => Generator::Unseeded,
            FillStrategy::Seeded { seed } => Generator::Seeded(Box::new(StdRng::seed_from_u64(seed))),
            FillStrategy::Known { value } => Generator::Known(value),
        }
    }
}

enum Generator {
    Unseeded,
    Seeded(Box<StdRng>),
    Known(u8),
}
impl ByteFiller for Generator {
    fn generate(&mut self) -> u8 {
        match self {
            Generator::Unseeded  => ().generate(),
            Generator::Seeded(r) => r.generate(),
            Generator::Known(k)  => k.generate(),
        }
    }
}

/// The memory image.
///
/// This can be addressed with any `u16` (16-bit address). Besides the byte
/// array itself, the image remembers the **origin**: the load address of the
/// most recently placed binary, which symbol ingestion uses as the base for
/// relative addresses. When several binaries are loaded, only the last
/// origin is retained.
pub struct MemoryImage {
    data: Box<[u8; MEM_SIZE]>,
    origin: u16,
}

impl MemoryImage {
    /// Creates a memory image with the provided fill strategy and an origin
    /// of zero.
    pub fn new(fill: FillStrategy) -> Self {
        let mut filler = fill.generator();
        Self {
            data: std::iter::repeat_with(|| filler.generate())
                .take(MEM_SIZE)
                .collect::<Box<_>>()
                .try_into()
                .unwrap_or_else(|_| unreachable!("iterator should have had {MEM_SIZE} elements")),
            origin: 0,
        }
    }

    /// Copies a binary into the image starting at `addr` and records `addr`
    /// as the new origin.
    ///
    /// The copy truncates silently at the top of the address space: a binary
    /// never wraps around mid-copy. Any bytes previously loaded in the
    /// overlapping range are overwritten.
    pub fn load(&mut self, addr: u16, bytes: &[u8]) {
        let start = usize::from(addr);
        let len = bytes.len().min(MEM_SIZE - start);
        self.data[start..start + len].copy_from_slice(&bytes[..len]);
        self.origin = addr;
    }

    /// The load address of the most recently loaded binary.
    pub fn origin(&self) -> u16 {
        self.origin
    }

    /// Reads the byte at the given address.
    pub fn get(&self, addr: u16) -> u8 {
        self.data[usize::from(addr)]
    }

    /// Writes the byte at the given address.
    pub fn set(&mut self, addr: u16, value: u8) {
        self.data[usize::from(addr)] = value;
    }

    /// Iterates over `len` bytes starting at `addr`, wrapping modulo 65536.
    pub fn bytes(&self, addr: u16, len: usize) -> impl Iterator<Item = u8> + '_ {
        (0..len).map(move |i| self.get(addr.wrapping_add(i as u16)))
    }
}

impl Default for MemoryImage {
    fn default() -> Self {
        Self::new(FillStrategy::default())
    }
}

impl std::fmt::Debug for MemoryImage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The byte array is too large to be useful in debug output.
        f.debug_struct("MemoryImage")
            .field("origin", &Addr(self.origin))
            .finish_non_exhaustive()
    }
}

struct Addr(u16);
impl std::fmt::Debug for Addr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "${:04X}", self.0)
    }
}
