//! rasterm - Show images in the terminal
//!
//! Decodes an image file and writes it as SIXEL, Kitty or iTerm2 graphics.

mod quantize;

use clap::{Parser, Subcommand, ValueEnum};
use rasterm::{
    iterm_copy_file_inline, kitty_copy_png_inline, write_image, Capabilities, KittyImgOpts,
    Protocol, RasterImage, Settings,
};
use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "rasterm")]
#[command(version)]
#[command(about = "Display images in the terminal using SIXEL, Kitty or iTerm2 graphics", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum ProtocolArg {
    /// Pick from the environment (Kitty, then iTerm2, then SIXEL)
    Auto,
    Sixel,
    Kitty,
    Iterm,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum TmuxArg {
    /// Escape when TERM/TMUX indicate tmux or screen
    Auto,
    Always,
    Never,
}

#[derive(clap::Args)]
struct EncodeArgs {
    /// Input image file (PNG, JPEG, GIF, WebP)
    input: PathBuf,

    /// Graphics protocol
    #[arg(short, long, value_enum, default_value = "auto")]
    protocol: ProtocolArg,

    /// Maximum number of colors for SIXEL output (2-256)
    #[arg(short, long, default_value = "256")]
    colors: u16,

    /// Wrap escape sequences for tmux/screen pass-through
    #[arg(long, value_enum, default_value = "auto")]
    tmux: TmuxArg,
}

#[derive(Subcommand)]
enum Commands {
    /// Display an image in the terminal
    Show {
        #[command(flatten)]
        args: EncodeArgs,
    },

    /// Write the escape sequences for an image to a file
    Encode {
        #[command(flatten)]
        args: EncodeArgs,

        /// Output file
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Show { args } => {
            let mut out = BufWriter::new(io::stdout().lock());
            render(&args, &mut out)?;
            out.flush()?;
        }

        Commands::Encode { args, output } => {
            let file = File::create(&output)
                .map_err(|e| format!("Failed to create '{}': {}", output.display(), e))?;
            let mut out = BufWriter::new(file);
            render(&args, &mut out)?;
            out.flush()?;
            eprintln!("Written to '{}'", output.display());
        }
    }

    Ok(())
}

fn render<W: Write>(args: &EncodeArgs, out: &mut W) -> Result<(), Box<dyn std::error::Error>> {
    let caps = Capabilities::from_env();
    let settings = Settings {
        escape_tmux: match args.tmux {
            TmuxArg::Auto => caps.multiplexer,
            TmuxArg::Always => true,
            TmuxArg::Never => false,
        },
    };
    let protocol = match args.protocol {
        ProtocolArg::Auto => caps.preferred_protocol(),
        ProtocolArg::Sixel => Protocol::Sixel,
        ProtocolArg::Kitty => Protocol::Kitty,
        ProtocolArg::Iterm => Protocol::Iterm,
    };
    log::info!("{}: {:?} output, {:?}", args.input.display(), protocol, settings);

    // Files the terminal can decode itself are passed through untouched
    match protocol {
        Protocol::Iterm => {
            return copy_file(&args.input, out, |out, file, len| {
                iterm_copy_file_inline(out, file, len, &settings)
            });
        }
        Protocol::Kitty if is_png(&args.input) => {
            return copy_file(&args.input, out, |out, file, _| {
                kitty_copy_png_inline(out, file, None, &KittyImgOpts::default(), &settings)
            });
        }
        _ => {}
    }

    let img = image::open(&args.input)
        .map_err(|e| format!("Failed to open '{}': {}", args.input.display(), e))?;
    let rgba = img.to_rgba8();
    eprintln!("{} ({}x{})", args.input.display(), rgba.width(), rgba.height());

    let raster = match protocol {
        Protocol::Sixel => RasterImage::Paletted(quantize::to_paletted(&rgba, args.colors)?),
        _ => RasterImage::Rgba(rgba),
    };
    write_image(out, &raster, protocol, &settings)?;
    writeln!(out)?;
    Ok(())
}

fn copy_file<W, F>(path: &Path, out: &mut W, send: F) -> Result<(), Box<dyn std::error::Error>>
where
    W: Write,
    F: FnOnce(&mut W, &mut File, u64) -> rasterm::Result<()>,
{
    let mut file =
        File::open(path).map_err(|e| format!("Failed to open '{}': {}", path.display(), e))?;
    let len = fs::metadata(path)?.len();
    send(out, &mut file, len)?;
    writeln!(out)?;
    Ok(())
}

fn is_png(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("png"))
}
