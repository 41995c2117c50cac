//! NES CLI - headless runner
//!
//! Runs a ROM for a number of frames or instructions without a window.
//! Instruction mode can emit the per-instruction trace, which is how the
//! nestest comparison is driven by hand.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use nes_core::{Cartridge, Nes, Palette};

/// Headless NES runner
#[derive(Parser, Debug)]
#[command(name = "nes-cli")]
#[command(about = "Headless NES runner", long_about = None)]
struct Args {
    /// Path to the iNES ROM file
    rom: PathBuf,

    /// Number of frames to run
    #[arg(short, long, default_value_t = 60)]
    frames: u64,

    /// Run a fixed number of instructions instead of frames
    #[arg(short, long)]
    instructions: Option<u64>,

    /// Force the program counter after reset (hex, e.g. C000)
    #[arg(long, value_parser = parse_hex_addr)]
    pc: Option<u16>,

    /// Log one line per executed instruction
    #[arg(short = 'l', long)]
    log_cpu: bool,

    /// Replace the built-in NTSC palette with a 192-byte .pal file
    #[arg(long)]
    palette: Option<PathBuf>,

    /// Dump CPU state after execution
    #[arg(short = 'c', long)]
    dump_cpu: bool,

    /// Dump PPU state after execution
    #[arg(short = 'p', long)]
    dump_ppu: bool,
}

fn parse_hex_addr(s: &str) -> Result<u16, String> {
    u16::from_str_radix(s.trim_start_matches("0x").trim_start_matches('$'), 16)
        .map_err(|e| format!("not a hex address: {e}"))
}

fn main() {
    env_logger::init();
    let args = Args::parse();

    let palette = match &args.palette {
        Some(path) => match Palette::from_file(path) {
            Ok(palette) => palette,
            Err(e) => {
                eprintln!("{e}");
                process::exit(1);
            }
        },
        None => Palette::ntsc(),
    };

    let cart = match Cartridge::from_file(&args.rom) {
        Ok(cart) => cart,
        Err(e) => {
            eprintln!("{e}");
            process::exit(1);
        }
    };

    println!("Loaded cartridge:");
    println!("  Mapper:    {}", cart.header().mapper_id());
    println!("  PRG ROM:   {} x 16K", cart.header().prg_chunks);
    println!(
        "  CHR:       {} x 8K{}",
        cart.header().chr_chunks,
        if cart.has_chr_ram() { " (RAM)" } else { "" }
    );
    println!("  Mirroring: {:?}", cart.mirroring());

    let mut nes = Nes::new(palette);
    nes.insert_cartridge(cart);
    nes.reset();
    nes.step_instruction(); // burn the 7-cycle reset sequence

    if let Some(pc) = args.pc {
        nes.cpu_mut().force_pc(pc);
    }

    if let Some(count) = args.instructions {
        for _ in 0..count {
            if args.log_cpu {
                println!("{}", nes.trace_line());
            }
            nes.step_instruction();
        }
        // The nestest ROM reports its verdict here.
        println!(
            "Result bytes: $02={:02X} $03={:02X}",
            nes.peek(0x0002),
            nes.peek(0x0003)
        );
    } else {
        let mut frames = 0;
        while frames < args.frames {
            if args.log_cpu {
                println!("{}", nes.trace_line());
                nes.step_instruction();
                if nes.frame_ready() {
                    frames += 1;
                }
            } else {
                nes.step_frame();
                frames += 1;
            }
        }
        println!("Completed {} frames.", nes.frame_count());
    }

    if args.dump_cpu {
        let cpu = nes.cpu();
        println!("\nCPU state:");
        println!("  PC: ${:04X}", cpu.pc);
        println!("  A:  ${:02X}", cpu.a);
        println!("  X:  ${:02X}", cpu.x);
        println!("  Y:  ${:02X}", cpu.y);
        println!("  SP: ${:02X}", cpu.sp);
        println!("  P:  {:08b}", cpu.status.bits());
        println!("  Cycles: {}", cpu.cycle_count());
    }

    if args.dump_ppu {
        let ppu = nes.ppu();
        println!("\nPPU state:");
        println!("  Scanline: {}", ppu.scanline());
        println!("  Cycle:    {}", ppu.cycle());
        println!("  VBLANK:   {}", ppu.cpu_peek(0x2002) & 0x80 != 0);
    }
}
