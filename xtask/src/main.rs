// Licensed under the Apache-2.0 license

use clap::{Parser, Subcommand};
use clap_num::maybe_hex;
use log::LevelFilter;
use simple_logger::SimpleLogger;
use std::path::PathBuf;

mod boot;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Xtask {
    /// Log every scan and install decision
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    xtask: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Commands related to firmware images
    FlashImage {
        #[command(subcommand)]
        subcommand: FlashImageCommands,
    },
    /// Write a flash file with firmware images placed according to a layout
    FlashLayout {
        /// Path to the layout TOML file. Default: reference board layout
        #[arg(long, value_name = "LAYOUT")]
        layout: Option<PathBuf>,

        /// Firmware image to place in the active region
        #[arg(long, value_name = "ACTIVE")]
        active: Option<String>,

        /// Candidate images with format: <slot>,<path>
        /// Example: --candidate 0,/tmp/a.bin --candidate 2,/tmp/b.bin
        #[arg(long = "candidate", value_name = "SLOT,IMAGE", value_parser = parse_candidate)]
        candidates: Vec<(usize, String)>,

        /// Path to the output flash file
        #[arg(long, value_name = "OUTPUT", required = true)]
        output: String,
    },
    /// Run boot image selection against a flash file, updating it in place
    Boot {
        /// Path to the flash file
        #[arg(long, value_name = "FLASH", required = true)]
        flash: PathBuf,

        /// Path to the layout TOML file. Default: reference board layout
        #[arg(long, value_name = "LAYOUT")]
        layout: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
enum FlashImageCommands {
    /// Seal a payload into a firmware image
    Create {
        /// Path to the firmware payload
        #[arg(long, value_name = "PAYLOAD", required = true)]
        payload: String,

        /// Firmware version written to the header
        #[arg(long, value_parser = maybe_hex::<u64>, required = true)]
        version: u64,

        /// Path to the output image file
        #[arg(long, value_name = "OUTPUT", required = true)]
        output: String,
    },
    /// Verify an existing firmware image
    Verify {
        /// Path to the firmware image file
        #[arg(value_name = "FILE")]
        file: String,

        /// Offset of the firmware image in the file
        #[arg(long, value_parser = maybe_hex::<usize>, default_value_t = 0)]
        offset: usize,
    },
}

fn parse_candidate(arg: &str) -> Result<(usize, String), String> {
    let (slot, path) = arg
        .split_once(',')
        .ok_or_else(|| format!("expected <slot>,<path>, got '{}'", arg))?;
    let slot = maybe_hex::<usize>(slot.trim())?;
    if path.is_empty() {
        return Err(format!("missing image path in '{}'", arg));
    }
    Ok((slot, path.to_string()))
}

fn main() {
    let cli = Xtask::parse();
    let level = if cli.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    let _ = SimpleLogger::new().with_level(level).init();

    let result = match &cli.xtask {
        Commands::FlashImage { subcommand } => match subcommand {
            FlashImageCommands::Create {
                payload,
                version,
                output,
            } => image_builder::firmware_image_create(payload, *version, output),
            FlashImageCommands::Verify { file, offset } => {
                image_builder::firmware_image_verify(file, *offset).map(|_| ())
            }
        },
        Commands::FlashLayout {
            layout,
            active,
            candidates,
            output,
        } => image_builder::load_layout(layout.as_deref()).and_then(|layout| {
            image_builder::flash_layout_create(&layout, active.as_deref(), candidates, output)
        }),
        Commands::Boot { flash, layout } => boot::boot(flash, layout.as_deref()),
    };
    result.unwrap_or_else(|e| {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    });
}
