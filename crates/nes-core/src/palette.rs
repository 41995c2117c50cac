//! Master palette handling
//!
//! The PPU emits 6-bit colour indices; a 64-entry lookup turns them into
//! RGB. The table can be replaced from a raw `.pal` file of 64 sequential
//! RGB triples, the format the common palette editors produce. A built-in
//! NTSC table is the default.

use std::fs;
use std::path::Path;

use thiserror::Error;

/// Number of master palette entries.
pub const PALETTE_ENTRIES: usize = 64;

/// Expected `.pal` file length: 64 RGB triples.
pub const PALETTE_FILE_SIZE: usize = PALETTE_ENTRIES * 3;

/// Errors raised while loading a palette file.
#[derive(Debug, Error)]
pub enum PaletteError {
    #[error("failed to read palette file: {0}")]
    Io(#[from] std::io::Error),
    #[error("palette file must be exactly {PALETTE_FILE_SIZE} bytes, found {0}")]
    BadLength(usize),
}

/// 64-entry colour lookup used to resolve PPU palette indices.
#[derive(Debug, Clone)]
pub struct Palette {
    colors: [(u8, u8, u8); PALETTE_ENTRIES],
}

impl Palette {
    /// The canonical NTSC 2C02 palette.
    pub fn ntsc() -> Self {
        Self { colors: NTSC }
    }

    /// Build a palette from a raw 192-byte RGB dump.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PaletteError> {
        if bytes.len() != PALETTE_FILE_SIZE {
            return Err(PaletteError::BadLength(bytes.len()));
        }
        let mut colors = [(0, 0, 0); PALETTE_ENTRIES];
        for (i, rgb) in bytes.chunks_exact(3).enumerate() {
            colors[i] = (rgb[0], rgb[1], rgb[2]);
        }
        Ok(Self { colors })
    }

    /// Load a `.pal` file from disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, PaletteError> {
        let bytes = fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Resolve a 6-bit colour index; the top two bits are ignored the way
    /// the PPU ignores them.
    pub fn color(&self, index: u8) -> (u8, u8, u8) {
        self.colors[(index & 0x3F) as usize]
    }
}

impl Default for Palette {
    fn default() -> Self {
        Self::ntsc()
    }
}

#[rustfmt::skip]
const NTSC: [(u8, u8, u8); PALETTE_ENTRIES] = [
    (84, 84, 84),    (0, 30, 116),    (8, 16, 144),    (48, 0, 136),
    (68, 0, 100),    (92, 0, 48),     (84, 4, 0),      (60, 24, 0),
    (32, 42, 0),     (8, 58, 0),      (0, 64, 0),      (0, 60, 0),
    (0, 50, 60),     (0, 0, 0),       (0, 0, 0),       (0, 0, 0),
    (152, 150, 152), (8, 76, 196),    (48, 50, 236),   (92, 30, 228),
    (136, 20, 176),  (160, 20, 100),  (152, 34, 32),   (120, 60, 0),
    (84, 90, 0),     (40, 114, 0),    (8, 124, 0),     (0, 118, 40),
    (0, 102, 120),   (0, 0, 0),       (0, 0, 0),       (0, 0, 0),
    (236, 238, 236), (76, 154, 236),  (120, 124, 236), (176, 98, 236),
    (228, 84, 236),  (236, 88, 180),  (236, 106, 100), (212, 136, 32),
    (160, 170, 0),   (116, 196, 0),   (76, 208, 32),   (56, 204, 108),
    (56, 180, 204),  (60, 60, 60),    (0, 0, 0),       (0, 0, 0),
    (236, 238, 236), (168, 204, 236), (188, 188, 236), (212, 178, 236),
    (236, 174, 236), (236, 174, 212), (236, 180, 176), (228, 196, 144),
    (204, 210, 120), (180, 222, 120), (168, 226, 144), (152, 226, 180),
    (160, 214, 228), (160, 162, 160), (0, 0, 0),       (0, 0, 0),
];
