mod input;

use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use libredid::{DecodeConfig, Decoder, Edid, Field, checksum, structs::RECORD_BYTES};
use std::path::{Path, PathBuf};

const NAME_DESCRIPTOR_TAG: u64 = 0xfc;

#[derive(Parser)]
#[command(name = "edid-ctl")]
#[command(about = "EDID structural decoder", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode an EDID blob and print the annotated field tree
    Decode {
        /// Raw or gzip-compressed EDID file
        #[arg(short, long)]
        input: PathBuf,

        /// Optional decode configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Show bit ranges and statistics
        #[arg(short, long)]
        detailed: bool,
    },
    /// Decode every EDID matching a glob and print one line per display
    Scan {
        /// Glob pattern for EDID files
        #[arg(short, long, default_value = "/sys/class/drm/*/edid")]
        pattern: String,

        /// Optional decode configuration (TOML)
        #[arg(short, long)]
        config: Option<PathBuf>,
    },
    /// Print stored and expected checksum of every 128-byte record
    Checksum {
        /// Raw or gzip-compressed EDID file
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Generate example configuration file
    GenConfig {
        /// Output path for the configuration file
        #[arg(short, long, default_value = "edid-config.toml")]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Decode {
            input,
            config,
            detailed,
        } => {
            decode_file(&input, config.as_deref(), detailed)?;
        }
        Commands::Scan { pattern, config } => {
            scan(&pattern, config.as_deref())?;
        }
        Commands::Checksum { input } => {
            print_checksums(&input)?;
        }
        Commands::GenConfig { output } => {
            generate_config_file(&output)?;
        }
    }

    Ok(())
}

fn load_decoder(config: Option<&Path>) -> Result<Decoder> {
    let config = match config {
        Some(path) => {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            DecodeConfig::from_toml_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?
        }
        None => DecodeConfig::default(),
    };
    Ok(Decoder::with_config(config))
}

fn decode_file(input: &Path, config: Option<&Path>, detailed: bool) -> Result<()> {
    let decoder = load_decoder(config)?;
    let data = input::read_edid(input)?;
    let edid = decoder
        .decode(&data)
        .with_context(|| format!("Failed to decode {}", input.display()))?;

    if detailed {
        print!("{}", edid.display_detailed());
    } else {
        print!("{}", edid.display_compact());
    }

    let modes = edid.timing_modes();
    if !modes.is_empty() {
        println!();
        println!("Timing modes ({}):", modes.len());
        for mode in modes {
            println!("  {:<28} {:?}", mode.to_string(), mode.source);
        }
    }

    let failures = edid.failures();
    if !failures.is_empty() {
        println!();
        println!("Validation failures ({}):", failures.len());
        for (path, validation) in failures {
            println!("  {}: {}", path, validation);
        }
    }

    Ok(())
}

fn scan(pattern: &str, config: Option<&Path>) -> Result<()> {
    let decoder = load_decoder(config)?;
    let entries = glob::glob(pattern).with_context(|| format!("Invalid glob pattern: {}", pattern))?;

    let mut found = 0;
    for entry in entries {
        let path = entry.context("Failed to read glob entry")?;
        let data = match input::read_edid(&path) {
            Ok(data) => data,
            Err(e) => {
                tracing::warn!(path = %path.display(), "{:#}", e);
                continue;
            }
        };
        // disconnected connectors expose an empty file
        if data.is_empty() {
            continue;
        }
        found += 1;

        match decoder.decode(&data) {
            Ok(edid) => println!("{}: {}", path.display(), summary(&edid)),
            Err(e) => println!("{}: fatal: {}", path.display(), e),
        }
    }

    if found == 0 {
        return Err(anyhow!("No EDID found matching {}", pattern));
    }
    Ok(())
}

fn summary(edid: &Edid) -> String {
    let manufacturer = edid
        .field("header/manufacturer_id")
        .and_then(Field::sym_str)
        .unwrap_or("???");
    let product = edid
        .field("header/product_code")
        .and_then(Field::uint)
        .unwrap_or_default();
    let name = display_name(edid).unwrap_or("-");
    let status = if edid.is_valid() {
        "ok".to_string()
    } else {
        format!("{} validation failure(s)", edid.failures().len())
    };
    format!(
        "{} 0x{:04x} \"{}\" ({} extension(s), {})",
        manufacturer,
        product,
        name,
        edid.extensions().count(),
        status
    )
}

fn display_name(edid: &Edid) -> Option<&str> {
    edid.group("detailed_timings")?
        .groups()
        .find(|g| g.field("tag").and_then(Field::uint) == Some(NAME_DESCRIPTOR_TAG))?
        .field("value")?
        .str()
}

fn print_checksums(input: &Path) -> Result<()> {
    let data = input::read_edid(input)?;
    if data.len() < RECORD_BYTES {
        return Err(anyhow!(
            "{} holds {} bytes, less than one record",
            input.display(),
            data.len()
        ));
    }

    println!("{:<8} {:<8} {:<8} {}", "record", "stored", "expected", "status");
    for (index, (stored, expected)) in checksum::records(&data).into_iter().enumerate() {
        let status = if stored == expected { "ok" } else { "MISMATCH" };
        println!(
            "{:<8} 0x{:02x}     0x{:02x}     {}",
            index, stored, expected, status
        );
    }

    let trailing = data.len() % RECORD_BYTES;
    if trailing > 0 {
        println!("{} trailing byte(s) ignored", trailing);
    }
    Ok(())
}

fn generate_config_file(output_path: &Path) -> Result<()> {
    println!(
        "Generating example configuration file: {}",
        output_path.display()
    );

    std::fs::write(output_path, DecodeConfig::example_toml())
        .context("Failed to save configuration file")?;

    println!("Configuration file generated successfully!");
    Ok(())
}
