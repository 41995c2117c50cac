//! NES Desktop - windowed front end
//!
//! Hosts the emulation core behind a minifb window: frames are copied out
//! once per completed frame, the keyboard is sampled into the controller
//! latch between frames, and an optional debug panel shows the pattern
//! tables alongside the game with CPU state echoed to the terminal.

use std::path::PathBuf;
use std::process;

use clap::Parser;
use minifb::{Key, Window, WindowOptions};
use nes_core::disasm;
use nes_core::{Buttons, Cartridge, Nes, Palette, FRAME_HEIGHT, FRAME_WIDTH};

/// Desktop NES emulator
#[derive(Parser, Debug)]
#[command(name = "nes-desktop")]
#[command(about = "A NES emulator desktop app", long_about = None)]
struct Args {
    /// Path to the iNES ROM file
    rom: PathBuf,

    /// Show the debug panel (pattern tables, CPU state on the terminal)
    #[arg(short, long)]
    debug: bool,

    /// Log one line per executed instruction
    #[arg(short = 'l', long)]
    log_cpu: bool,

    /// Window scale factor (1-4)
    #[arg(short, long, default_value_t = 2)]
    scale: usize,

    /// Replace the built-in NTSC palette with a 192-byte .pal file
    #[arg(long)]
    palette: Option<PathBuf>,
}

/// Canvas layout: the game on the left, a lane for the two pattern
/// tables on the right when the debug panel is up.
const DEBUG_LANE: usize = 144;
const CANVAS_HEIGHT: usize = 280;

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

    let mut nes = Nes::new(palette);
    nes.insert_cartridge(cart);
    nes.reset();

    let (canvas_w, canvas_h) = if args.debug {
        (FRAME_WIDTH + DEBUG_LANE, CANVAS_HEIGHT)
    } else {
        (FRAME_WIDTH, FRAME_HEIGHT)
    };
    let scale = args.scale.clamp(1, 4);

    let mut window = match Window::new(
        "NES",
        canvas_w * scale,
        canvas_h * scale,
        WindowOptions::default(),
    ) {
        Ok(window) => window,
        Err(e) => {
            eprintln!("failed to create window: {e}");
            process::exit(1);
        }
    };
    window.set_target_fps(60);

    let mut canvas = vec![0u32; canvas_w * canvas_h];

    while window.is_open() && !window.is_key_down(Key::Escape) {
        nes.set_buttons(0, sample_buttons(&window));

        if args.log_cpu {
            loop {
                println!("{}", nes.trace_line());
                nes.step_instruction();
                if nes.frame_ready() {
                    break;
                }
            }
        } else {
            nes.step_frame();
        }

        blit_rgb(
            &mut canvas,
            canvas_w,
            0,
            0,
            nes.frame().as_bytes(),
            FRAME_WIDTH,
            FRAME_HEIGHT,
        );

        if args.debug {
            for (slot, table) in [(0u8, 0usize), (1, 1)] {
                if let Some(image) = nes.pattern_table(slot, 0) {
                    let y = 8 + table * 136;
                    blit_rgb(&mut canvas, canvas_w, FRAME_WIDTH + 8, y, &image, 128, 128);
                }
            }
            if nes.frame_count() % 60 == 0 {
                print_cpu_state(&nes);
            }
        }

        if let Err(e) = window.update_with_buffer(&canvas, canvas_w, canvas_h) {
            eprintln!("failed to update window: {e}");
            process::exit(1);
        }
    }
}

/// Sample the keyboard into the canonical button order.
///
/// J=A, K=B, Right Shift=Select, Enter=Start, WASD=D-pad.
fn sample_buttons(window: &Window) -> Buttons {
    let mut buttons = Buttons::empty();
    for (key, button) in [
        (Key::J, Buttons::A),
        (Key::K, Buttons::B),
        (Key::RightShift, Buttons::SELECT),
        (Key::Enter, Buttons::START),
        (Key::W, Buttons::UP),
        (Key::S, Buttons::DOWN),
        (Key::A, Buttons::LEFT),
        (Key::D, Buttons::RIGHT),
    ] {
        if window.is_key_down(key) {
            buttons.insert(button);
        }
    }
    buttons
}

/// Copy an RGB byte image into the 0RGB canvas at (x, y).
fn blit_rgb(canvas: &mut [u32], canvas_w: usize, x: usize, y: usize, rgb: &[u8], w: usize, h: usize) {
    for row in 0..h {
        for col in 0..w {
            let src = (row * w + col) * 3;
            let pixel = ((rgb[src] as u32) << 16) | ((rgb[src + 1] as u32) << 8) | rgb[src + 2] as u32;
            canvas[(y + row) * canvas_w + (x + col)] = pixel;
        }
    }
}

fn print_cpu_state(nes: &Nes) {
    let cpu = nes.cpu();
    println!(
        "PC:${:04X} A:${:02X} X:${:02X} Y:${:02X} SP:${:02X} P:{:08b} CYC:{}",
        cpu.pc,
        cpu.a,
        cpu.x,
        cpu.y,
        cpu.sp,
        cpu.status.bits(),
        cpu.cycle_count()
    );
    for (_, line) in disasm::disassemble(nes.bus(), cpu.pc, cpu.pc.saturating_add(16)) {
        println!("  {line}");
    }
}
