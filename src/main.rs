//! MMU simulator - Main Entry Point
//!
//! Usage: mmu-sim -a <fifo|mru|sc|rnd> [-f <trace> | -p <P> -n <N>] [OPTIONS]
//!
//! Runs the trace through an optimal benchmark MMU and an MMU driven by the
//! chosen policy, then prints both machines' statistics side by side.
//!
//! Set `LOG=ERROR|WARN|INFO|DEBUG|TRACE` to control diagnostics on stderr.

use std::env;
use std::process;
use std::str::FromStr;

use clap::{App, Arg, ArgMatches};
use log::{info, Level, LevelFilter, Log, Metadata, Record};

use mmu_sim::{
    generate, MmuConfig, MmuStats, PolicyKind, SimError, SimResult, Simulation, SimulationData,
    DEFAULT_SEED,
};

/// Writes `LEVEL [target] message` lines to stderr.
struct SimpleLogger;

impl Log for SimpleLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        if !self.enabled(record.metadata()) {
            return;
        }
        let color = match record.level() {
            Level::Error => 31,
            Level::Warn => 93,
            Level::Info => 34,
            Level::Debug => 32,
            Level::Trace => 90,
        };
        eprintln!(
            "\u{1B}[{}m{:>5} [{}] {}\u{1B}[0m",
            color,
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {}
}

fn init_logger(verbose: bool) {
    static LOGGER: SimpleLogger = SimpleLogger;

    let level = match env::var("LOG").as_deref() {
        Ok("ERROR") => LevelFilter::Error,
        Ok("WARN") => LevelFilter::Warn,
        Ok("INFO") => LevelFilter::Info,
        Ok("DEBUG") => LevelFilter::Debug,
        Ok("TRACE") => LevelFilter::Trace,
        _ if verbose => LevelFilter::Debug,
        _ => LevelFilter::Warn,
    };
    // a second init only happens in tests; keep the first logger
    if log::set_logger(&LOGGER).is_ok() {
        log::set_max_level(level);
    }
}

/// Where the instruction stream comes from.
#[derive(Debug)]
enum Source {
    File(String),
    Generate { processes: usize, operations: usize },
}

/// Command-line configuration
#[derive(Debug)]
struct Config {
    policy: PolicyKind,
    seed: u64,
    source: Source,
    output: Option<String>,
    mmu: MmuConfig,
    verbose: bool,
}

fn main() {
    let config = match parse_args(env::args()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    init_logger(config.verbose);

    if let Err(e) = run(&config) {
        eprintln!("Error: {}", e);
        process::exit(1);
    }
}

fn app() -> App<'static, 'static> {
    App::new("mmu-sim")
        .about("Compares a page replacement policy against the optimal one")
        .arg(
            Arg::with_name("algorithm")
                .short("a")
                .long("algorithm")
                .required(true)
                .takes_value(true)
                .possible_values(&["fifo", "mru", "sc", "rnd"])
                .help("replacement policy under test"),
        )
        .arg(
            Arg::with_name("seed")
                .short("s")
                .long("seed")
                .takes_value(true)
                .help("seed for trace generation and the random policy [default: 42]"),
        )
        .arg(
            Arg::with_name("file")
                .short("f")
                .long("file")
                .takes_value(true)
                .conflicts_with_all(&["processes", "operations"])
                .required_unless_all(&["processes", "operations"])
                .help("trace file to run"),
        )
        .arg(
            Arg::with_name("processes")
                .short("p")
                .long("processes")
                .takes_value(true)
                .requires("operations")
                .help("number of processes to generate"),
        )
        .arg(
            Arg::with_name("operations")
                .short("n")
                .long("operations")
                .takes_value(true)
                .requires("processes")
                .help("number of instructions to generate"),
        )
        .arg(
            Arg::with_name("output")
                .short("o")
                .long("output")
                .takes_value(true)
                .help("save the trace to this file"),
        )
        .arg(
            Arg::with_name("ram-kb")
                .long("ram-kb")
                .takes_value(true)
                .help("RAM size in KiB [default: 400]"),
        )
        .arg(
            Arg::with_name("page-kb")
                .long("page-kb")
                .takes_value(true)
                .help("page size in KiB [default: 4]"),
        )
        .arg(
            Arg::with_name("verbose")
                .short("v")
                .long("verbose")
                .help("log every instruction"),
        )
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> SimResult<Config> {
    let matches = app()
        .get_matches_from_safe(args)
        .unwrap_or_else(|e| e.exit());

    let policy = PolicyKind::from_str(matches.value_of("algorithm").unwrap_or_default())
        .map_err(SimError::Config)?;
    let seed = parse_value(&matches, "seed")?.unwrap_or(DEFAULT_SEED);

    let source = match matches.value_of("file") {
        Some(path) => Source::File(path.to_string()),
        None => Source::Generate {
            processes: parse_value(&matches, "processes")?.unwrap_or(0),
            operations: parse_value(&matches, "operations")?.unwrap_or(0),
        },
    };

    let mut mmu = MmuConfig::default();
    if let Some(kb) = parse_value::<usize>(&matches, "ram-kb")? {
        mmu.ram_bytes = kb * 1024;
    }
    if let Some(kb) = parse_value::<usize>(&matches, "page-kb")? {
        mmu.page_size = kb * 1024;
    }
    mmu.validate()?;

    Ok(Config {
        policy,
        seed,
        source,
        output: matches.value_of("output").map(str::to_string),
        mmu,
        verbose: matches.is_present("verbose"),
    })
}

fn parse_value<T: FromStr>(matches: &ArgMatches, name: &str) -> SimResult<Option<T>> {
    match matches.value_of(name) {
        None => Ok(None),
        Some(raw) => raw
            .parse()
            .map(Some)
            .map_err(|_| SimError::Config(format!("invalid value for --{}: {}", name, raw))),
    }
}

/// Main logic separated from main() for cleaner error handling
fn run(config: &Config) -> SimResult<()> {
    let data = match &config.source {
        Source::File(path) => {
            info!("loading trace from {}", path);
            SimulationData::from_file(path)?
        }
        Source::Generate { processes, operations } => generate(*processes, *operations, config.seed)?,
    };

    if let Some(path) = &config.output {
        data.save(path)?;
        info!("trace written to {}", path);
    }

    let mut sim = Simulation::new(config.mmu, data, config.policy, config.seed)?;
    let steps = sim.run();

    println!(
        "{} instructions, {} frames of {} bytes, seed {}",
        steps,
        config.mmu.frame_count(),
        config.mmu.page_size,
        config.seed
    );
    println!();
    print_summary(&sim.optimal().stats(), &sim.user().stats(), sim.policy_kind());

    let warnings = sim.optimal().diagnostics().len() + sim.user().diagnostics().len();
    if warnings > 0 {
        eprintln!("{} instructions were skipped, run with LOG=WARN for details", warnings);
    }
    Ok(())
}

fn print_summary(opt: &MmuStats, user: &MmuStats, kind: PolicyKind) {
    println!("{:<22}{:>16}{:>16}", "", "OPT", kind.label());
    let row = |label: &str, a: String, b: String| println!("{:<22}{:>16}{:>16}", label, a, b);

    row("total time", opt.total_time.to_string(), user.total_time.to_string());
    row(
        "thrashing time",
        format!("{} ({:.1}%)", opt.thrashing_time, opt.thrashing_pct),
        format!("{} ({:.1}%)", user.thrashing_time, user.thrashing_pct),
    );
    row("hits", opt.hits.to_string(), user.hits.to_string());
    row("faults", opt.faults.to_string(), user.faults.to_string());
    row(
        "RAM used",
        format!("{} ({:.1}%)", opt.ram_used, opt.ram_pct),
        format!("{} ({:.1}%)", user.ram_used, user.ram_pct),
    );
    row(
        "virtual memory used",
        format!("{} ({:.1}%)", opt.vram_used, opt.vram_pct),
        format!("{} ({:.1}%)", user.vram_used, user.vram_pct),
    );
    row("fragmentation", opt.fragmentation.to_string(), user.fragmentation.to_string());
    row(
        "active processes",
        opt.active_processes.to_string(),
        user.active_processes.to_string(),
    );
}
