//! VM Simulator - Main Entry Point
//!
//! Usage: vmsim [OPTIONS] <script_file> <output_file>
//!
//! Arguments:
//!   script_file - Commands to run (spawn / access / release / check / reset)
//!   output_file - One result line per command
//!
//! Options:
//!   --page-size <N>    Page size in bytes
//!   --frames <N>       Number of RAM frames
//!   --disk-blocks <N>  Number of swap blocks (0 disables swapping)
//!   -v, --verbose      Log allocations and translations, dump maps at the end
//!   -vv                Also log page faults and clock sweeps
//!   -h, --help         Print help information

use std::env;
use std::process;

use anyhow::{bail, Context, Result};
use log::{LevelFilter, Log, Metadata, Record};

use vmsim::io::{write_results, Script};
use vmsim::{MemoryConfig, MemoryManager, Occupant, Simulation};

/// Command-line configuration
struct Config {
    script_file: String,
    output_file: String,
    memory: MemoryConfig,
    verbosity: u8,
}

/// Writes log records to stderr.
struct StderrLogger;

impl Log for StderrLogger {
    fn enabled(&self, metadata: &Metadata) -> bool {
        metadata.level() <= log::max_level()
    }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            eprintln!("[{:<5}] {}", record.level(), record.args());
        }
    }

    fn flush(&self) {}
}

static LOGGER: StderrLogger = StderrLogger;

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Trace,
    };
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

fn main() {
    let config = match parse_args() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{:#}", e);
            process::exit(1);
        }
    };

    init_logging(config.verbosity);

    if let Err(e) = run(&config) {
        eprintln!("Error: {:#}", e);
        process::exit(1);
    }
}

fn print_help(program: &str) {
    let defaults = MemoryConfig::default();
    eprintln!("VM Simulator - demand paging with second-chance (clock) eviction");
    eprintln!();
    eprintln!("Usage: {} [OPTIONS] <script_file> <output_file>", program);
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  script_file - Commands, one per line:");
    eprintln!("                  spawn <name> <bytes> | access <pid> <va> | release <pid> | check | reset");
    eprintln!("  output_file - Output file, one result line per command");
    eprintln!();
    eprintln!("Options:");
    eprintln!("  --page-size <N>    Page size in bytes (default {})", defaults.page_size);
    eprintln!("  --frames <N>       Number of RAM frames (default {})", defaults.num_frames);
    eprintln!("  --disk-blocks <N>  Number of swap blocks (default {})", defaults.num_disk_blocks);
    eprintln!("  -v, --verbose      Print allocations, translations and final maps");
    eprintln!("  -vv                Also print page faults and clock sweeps");
    eprintln!("  -h, --help         Print this help message");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  {} script.txt output.txt", program);
    eprintln!("  {} -v --page-size 4 --frames 4 --disk-blocks 2 script.txt output.txt", program);
}

fn parse_args() -> Result<Config> {
    let args: Vec<String> = env::args().collect();
    let program = args.first().map(String::as_str).unwrap_or("vmsim");

    let mut memory = MemoryConfig::default();
    let mut verbosity: u8 = 0;
    let mut positional: Vec<&String> = Vec::new();

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-h" | "--help" => {
                print_help(program);
                process::exit(0);
            }
            "-v" | "--verbose" => verbosity = verbosity.max(1),
            "-vv" => verbosity = 2,
            "--page-size" => memory.page_size = option_value(&mut iter, arg)?,
            "--frames" => memory.num_frames = option_value(&mut iter, arg)?,
            "--disk-blocks" => memory.num_disk_blocks = option_value(&mut iter, arg)?,
            _ if arg.starts_with('-') => {
                bail!("Unknown option: {}\nUse --help for usage information.", arg);
            }
            _ => positional.push(arg),
        }
    }

    if positional.len() != 2 {
        print_help(program);
        bail!("\nError: Expected 2 arguments, got {}", positional.len());
    }

    memory.validate().context("invalid memory geometry")?;

    Ok(Config {
        script_file: positional[0].clone(),
        output_file: positional[1].clone(),
        memory,
        verbosity,
    })
}

fn option_value<'a>(iter: &mut impl Iterator<Item = &'a String>, option: &str) -> Result<u32> {
    let value = iter
        .next()
        .with_context(|| format!("{} requires a value", option))?;
    value
        .parse()
        .with_context(|| format!("invalid value for {}: {}", option, value))
}

/// Main logic separated from main() for cleaner error handling
fn run(config: &Config) -> Result<()> {
    let script = Script::from_file(&config.script_file)
        .with_context(|| format!("failed to load script {}", config.script_file))?;

    log::info!(
        "page size {} bytes, {} frames, {} disk blocks, {} commands",
        config.memory.page_size,
        config.memory.num_frames,
        config.memory.num_disk_blocks,
        script.commands.len()
    );

    let mut sim = Simulation::new(config.memory)?;
    let results = script.run(&mut sim);

    if config.verbosity > 0 {
        print_summary(sim.memory());
    }

    write_results(&config.output_file, &results)
        .with_context(|| format!("failed to write output file {}", config.output_file))?;

    log::info!("results written to {}", config.output_file);
    Ok(())
}

fn render_map(map: &[Option<Occupant>]) -> String {
    map.iter()
        .enumerate()
        .map(|(i, slot)| match slot {
            Some(occupant) => format!("{}={}", i, occupant),
            None => format!("{}=free", i),
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn print_summary(memory: &MemoryManager) {
    let stats = memory.stats();
    eprintln!();
    eprintln!("=== Summary ===");
    eprintln!(
        "RAM frames:  {} total, {} free",
        memory.num_frames(),
        memory.free_frame_count()
    );
    eprintln!("  {}", render_map(memory.frame_map()));
    eprintln!(
        "Disk blocks: {} total, {} free",
        memory.num_disk_blocks(),
        memory.free_disk_block_count()
    );
    eprintln!("  {}", render_map(memory.disk_map()));
    eprintln!("Clock hand:  frame {}", memory.clock_hand());
    for process in memory.processes() {
        eprintln!(
            "  {} - {} resident, {} swapped",
            process,
            process.resident_pages(),
            process.swapped_pages()
        );
    }
    eprintln!(
        "Hits: {}, page faults: {}, swap ins: {}, swap outs: {}",
        stats.hits, stats.page_faults, stats.swap_ins, stats.swap_outs
    );
}
