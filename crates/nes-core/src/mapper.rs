//! Mapper address translation
//!
//! Cartridge hardware sits between the console buses and the PRG/CHR chips;
//! the mapper decides how a bus address lands in cartridge-local storage.
//! The set of supported mappers is closed, so it is modelled as an enum with
//! one variant per mapper ID rather than trait objects. Mappers translate
//! addresses only; the [`Cartridge`](crate::cartridge::Cartridge) owns the
//! bytes.

/// Where a translated address lands inside the cartridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MapTarget {
    /// Offset into PRG ROM
    Prg(usize),
    /// Offset into PRG RAM (battery or work SRAM at $6000-$7FFF)
    PrgRam(usize),
    /// Offset into CHR ROM/RAM
    Chr(usize),
}

/// Mapper 000 (NROM) state.
///
/// 16 KiB carts mirror PRG across $8000-$BFFF and $C000-$FFFF; 32 KiB carts
/// map it flat. CHR is a direct window; writes only land when the cartridge
/// is CHR-RAM backed.
#[derive(Debug, Clone)]
pub struct Nrom {
    prg_banks: u8,
    chr_writable: bool,
}

/// One variant per supported mapper ID.
#[derive(Debug, Clone)]
pub enum Mapper {
    Nrom(Nrom),
}

impl Mapper {
    /// Build the mapper for an iNES mapper ID. Unknown IDs are refused by
    /// the caller ([`Cartridge::from_bytes`](crate::cartridge::Cartridge::from_bytes)),
    /// which owns the error type.
    pub fn new(id: u8, prg_banks: u8, chr_writable: bool) -> Option<Self> {
        match id {
            0 => Some(Mapper::Nrom(Nrom {
                prg_banks,
                chr_writable,
            })),
            _ => None,
        }
    }

    /// Translate a CPU-side read address.
    pub fn cpu_map_read(&self, addr: u16) -> Option<MapTarget> {
        match self {
            Mapper::Nrom(m) => m.cpu_map(addr),
        }
    }

    /// Translate a CPU-side write address. PRG ROM writes are unmapped on
    /// NROM; only the SRAM window accepts them.
    pub fn cpu_map_write(&mut self, addr: u16, _data: u8) -> Option<MapTarget> {
        match self {
            Mapper::Nrom(m) => match m.cpu_map(addr) {
                Some(MapTarget::Prg(_)) => None,
                other => other,
            },
        }
    }

    /// Translate a PPU-side read address (pattern table window).
    pub fn ppu_map_read(&self, addr: u16) -> Option<MapTarget> {
        match self {
            Mapper::Nrom(_) => match addr {
                0x0000..=0x1FFF => Some(MapTarget::Chr(addr as usize)),
                _ => None,
            },
        }
    }

    /// Translate a PPU-side write address. Only CHR-RAM carts accept these.
    pub fn ppu_map_write(&mut self, addr: u16) -> Option<MapTarget> {
        match self {
            Mapper::Nrom(m) => match addr {
                0x0000..=0x1FFF if m.chr_writable => Some(MapTarget::Chr(addr as usize)),
                _ => None,
            },
        }
    }
}

impl Nrom {
    fn cpu_map(&self, addr: u16) -> Option<MapTarget> {
        match addr {
            0x6000..=0x7FFF => Some(MapTarget::PrgRam((addr & 0x1FFF) as usize)),
            0x8000..=0xFFFF => {
                // 16KB carts see the same bank twice.
                let mask = if self.prg_banks > 1 { 0x7FFF } else { 0x3FFF };
                Some(MapTarget::Prg((addr & mask) as usize))
            }
            _ => None,
        }
    }
}
