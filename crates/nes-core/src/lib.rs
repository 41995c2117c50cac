//! NES Core - Pure Rust NES emulation library
//!
//! This crate provides the core emulation logic for a Nintendo Entertainment
//! System (NES): a cycle-interleaved 6502 interpreter, the PPU rendering
//! pipeline, the CPU-side bus with OAM DMA, cartridge loading with mapper
//! address translation, and the two controller latches. It contains no
//! windowing or wall-clock dependencies; front ends drive it through
//! [`system::Nes`] and read completed frames back out.

#![forbid(unsafe_code)]

/// CPU module containing the 2A03 (6502 variant) implementation
pub mod cpu;
/// Address-range disassembler used by the debug front end
pub mod disasm;
/// Memory bus, address dispatch and OAM DMA
pub mod bus;
/// PPU (Picture Processing Unit) implementation
pub mod ppu;
/// Master palette handling (64-entry colour lookup)
pub mod palette;
/// APU (Audio Processing Unit) stub with timing hooks
pub mod apu;
/// Cartridge loading and the iNES container format
pub mod cartridge;
/// Mapper address translation (one variant per mapper ID)
pub mod mapper;
/// Controller shift latches
pub mod controller;
/// Integration module for the complete NES system
pub mod system;

pub use cartridge::{Cartridge, CartridgeError, Mirroring};
pub use controller::Buttons;
pub use palette::{Palette, PaletteError};
pub use ppu::{FRAME_HEIGHT, FRAME_WIDTH};
pub use system::Nes;
