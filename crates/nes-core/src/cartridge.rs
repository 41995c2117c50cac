//! Cartridge loading and the iNES container format
//!
//! A cartridge owns the PRG and CHR memory and the mapper that translates
//! bus addresses into it. ROM images are parsed from the 16-byte iNES
//! header; unsupported mappers are refused up front so the system never
//! starts on an image it cannot run.

use std::fs;
use std::path::Path;

use log::debug;
use thiserror::Error;

use crate::mapper::{MapTarget, Mapper};

/// iNES header size in bytes
pub const HEADER_SIZE: usize = 16;

/// iNES magic number: "NES\x1A"
pub const INES_MAGIC: [u8; 4] = [b'N', b'E', b'S', 0x1A];

const PRG_CHUNK: usize = 16 * 1024;
const CHR_CHUNK: usize = 8 * 1024;
const TRAINER_SIZE: usize = 512;
const PRG_RAM_SIZE: usize = 8 * 1024;

/// Errors raised while loading a ROM image.
#[derive(Debug, Error)]
pub enum CartridgeError {
    #[error("failed to read ROM file: {0}")]
    Io(#[from] std::io::Error),
    #[error("ROM image too short: {0} bytes")]
    TooShort(usize),
    #[error("bad iNES magic number")]
    BadMagic,
    #[error("ROM image truncated: expected {expected} bytes of {section}, found {found}")]
    Truncated {
        section: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("unsupported mapper {0}")]
    UnsupportedMapper(u8),
}

/// Nametable mirroring arrangements reported by the cartridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    SingleScreenLower,
    SingleScreenUpper,
    FourScreen,
}

/// Parsed iNES header.
#[derive(Debug, Clone, Copy)]
pub struct InesHeader {
    /// PRG ROM size in 16 KiB units
    pub prg_chunks: u8,
    /// CHR ROM size in 8 KiB units; 0 means the cart carries 8 KiB CHR RAM
    pub chr_chunks: u8,
    pub flags6: u8,
    pub flags7: u8,
}

impl InesHeader {
    /// Parse the leading 16 bytes of a ROM image.
    pub fn parse(bytes: &[u8]) -> Result<Self, CartridgeError> {
        if bytes.len() < HEADER_SIZE {
            return Err(CartridgeError::TooShort(bytes.len()));
        }
        if bytes[0..4] != INES_MAGIC {
            return Err(CartridgeError::BadMagic);
        }
        Ok(Self {
            prg_chunks: bytes[4],
            chr_chunks: bytes[5],
            flags6: bytes[6],
            flags7: bytes[7],
        })
    }

    /// Mapper ID assembled from the two flag nibbles.
    pub fn mapper_id(&self) -> u8 {
        (self.flags7 & 0xF0) | (self.flags6 >> 4)
    }

    /// 512-byte trainer between header and PRG data.
    pub fn has_trainer(&self) -> bool {
        self.flags6 & 0x04 != 0
    }

    /// Battery-backed SRAM at $6000-$7FFF.
    pub fn has_battery(&self) -> bool {
        self.flags6 & 0x02 != 0
    }

    /// Nametable arrangement from flags 6 bits 0 and 3.
    pub fn mirroring(&self) -> Mirroring {
        if self.flags6 & 0x08 != 0 {
            Mirroring::FourScreen
        } else if self.flags6 & 0x01 != 0 {
            Mirroring::Vertical
        } else {
            Mirroring::Horizontal
        }
    }
}

/// A loaded cartridge: PRG/CHR storage plus the mapper that addresses it.
#[derive(Debug, Clone)]
pub struct Cartridge {
    header: InesHeader,
    prg_rom: Vec<u8>,
    chr: Vec<u8>,
    prg_ram: Vec<u8>,
    chr_ram: bool,
    mirroring: Mirroring,
    mapper: Mapper,
}

impl Cartridge {
    /// Parse an iNES image from memory.
    pub fn from_bytes(rom: &[u8]) -> Result<Self, CartridgeError> {
        let header = InesHeader::parse(rom)?;

        let mut offset = HEADER_SIZE;
        if header.has_trainer() {
            offset += TRAINER_SIZE;
        }

        let prg_len = header.prg_chunks as usize * PRG_CHUNK;
        if rom.len() < offset + prg_len {
            return Err(CartridgeError::Truncated {
                section: "PRG ROM",
                expected: prg_len,
                found: rom.len().saturating_sub(offset),
            });
        }
        let prg_rom = rom[offset..offset + prg_len].to_vec();
        offset += prg_len;

        // CHR chunk count 0 means the board has 8 KiB of CHR RAM instead.
        let chr_ram = header.chr_chunks == 0;
        let chr = if chr_ram {
            vec![0; CHR_CHUNK]
        } else {
            let chr_len = header.chr_chunks as usize * CHR_CHUNK;
            if rom.len() < offset + chr_len {
                return Err(CartridgeError::Truncated {
                    section: "CHR ROM",
                    expected: chr_len,
                    found: rom.len().saturating_sub(offset),
                });
            }
            rom[offset..offset + chr_len].to_vec()
        };

        let mapper_id = header.mapper_id();
        let mapper = Mapper::new(mapper_id, header.prg_chunks, chr_ram)
            .ok_or(CartridgeError::UnsupportedMapper(mapper_id))?;

        debug!(
            "cartridge: mapper {}, {}x16K PRG, {}x8K CHR{}, {:?} mirroring",
            mapper_id,
            header.prg_chunks,
            header.chr_chunks,
            if chr_ram { " (RAM)" } else { "" },
            header.mirroring()
        );

        Ok(Self {
            mirroring: header.mirroring(),
            header,
            prg_rom,
            chr,
            prg_ram: vec![0; PRG_RAM_SIZE],
            chr_ram,
            mapper,
        })
    }

    /// Load an iNES image from disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CartridgeError> {
        let rom = fs::read(path)?;
        Self::from_bytes(&rom)
    }

    /// CPU-side read. `None` when the mapper leaves the address unmapped,
    /// so the bus can substitute its open value.
    pub fn cpu_read(&self, addr: u16) -> Option<u8> {
        match self.mapper.cpu_map_read(addr)? {
            MapTarget::Prg(offset) => self.prg_rom.get(offset).copied(),
            MapTarget::PrgRam(offset) => self.prg_ram.get(offset).copied(),
            MapTarget::Chr(offset) => self.chr.get(offset).copied(),
        }
    }

    /// CPU-side write. Ignored for ROM regions.
    pub fn cpu_write(&mut self, addr: u16, data: u8) {
        if let Some(target) = self.mapper.cpu_map_write(addr, data) {
            match target {
                MapTarget::PrgRam(offset) => {
                    if let Some(slot) = self.prg_ram.get_mut(offset) {
                        *slot = data;
                    }
                }
                MapTarget::Chr(offset) => {
                    if let Some(slot) = self.chr.get_mut(offset) {
                        *slot = data;
                    }
                }
                MapTarget::Prg(_) => {}
            }
        }
    }

    /// PPU-side read of the pattern table window.
    pub fn ppu_read(&self, addr: u16) -> Option<u8> {
        match self.mapper.ppu_map_read(addr)? {
            MapTarget::Chr(offset) => self.chr.get(offset).copied(),
            _ => None,
        }
    }

    /// PPU-side write; only lands on CHR-RAM carts.
    pub fn ppu_write(&mut self, addr: u16, data: u8) {
        if let Some(MapTarget::Chr(offset)) = self.mapper.ppu_map_write(addr) {
            if let Some(slot) = self.chr.get_mut(offset) {
                *slot = data;
            }
        }
    }

    /// Nametable arrangement for the PPU.
    pub fn mirroring(&self) -> Mirroring {
        self.mirroring
    }

    /// The parsed header.
    pub fn header(&self) -> &InesHeader {
        &self.header
    }

    /// True when CHR is RAM rather than ROM.
    pub fn has_chr_ram(&self) -> bool {
        self.chr_ram
    }
}
