use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::Write;
use std::time::Duration;
use tidydock::report::{render_clean, render_scan};
use tidydock::{
    format_bytes, parse_duration, parse_size_limit, CleanOptions, Cleaner, CliRuntime,
    ResourceKind, Runtime, ScanOptions, ScanReport, Scanner, SizeSelection,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    author,
    version,
    about = "Find and optionally remove unused containers, images, volumes, networks and build cache",
    long_about = None
)]
struct Args {
    /// Container runtime executable
    #[arg(long, env = "TIDYDOCK_RUNTIME", default_value = "docker")]
    runtime: String,

    /// Include stopped containers
    #[arg(long)]
    containers: bool,

    /// Include dangling images (all unused images with --all-images)
    #[arg(long)]
    images: bool,

    /// Include unused volumes
    #[arg(long)]
    volumes: bool,

    /// Include unused networks
    #[arg(long)]
    networks: bool,

    /// Include build cache
    #[arg(long)]
    cache: bool,

    /// Treat every unused image as removable, not just dangling ones
    #[arg(long, short = 'a')]
    all_images: bool,

    /// Age threshold (e.g. 48h, 7d, 2w, 3m; plain numbers are days)
    #[arg(long, value_name = "DURATION")]
    older_than: Option<String>,

    /// Only clean the N largest items of each kind
    #[arg(long, value_name = "N")]
    top: Option<usize>,

    /// Only clean the largest items of each kind until this much space is covered (e.g. 10GB)
    #[arg(long, value_name = "SIZE")]
    limit: Option<String>,

    /// Show what would be removed, but don't remove anything
    #[arg(long)]
    dry_run: bool,

    /// Skip the confirmation prompt
    #[arg(long, short)]
    yes: bool,

    /// Print a JSON report instead of text
    #[arg(long)]
    json: bool,

    /// Show detailed information and debug logs
    #[arg(long, short)]
    verbose: bool,
}

impl Args {
    fn kinds(&self) -> Vec<ResourceKind> {
        let flags = [
            (ResourceKind::Containers, self.containers),
            (ResourceKind::Images, self.images),
            (ResourceKind::Volumes, self.volumes),
            (ResourceKind::Networks, self.networks),
            (ResourceKind::Cache, self.cache),
        ];
        let chosen: Vec<ResourceKind> = flags
            .iter()
            .filter(|(_, on)| *on)
            .map(|(kind, _)| *kind)
            .collect();
        if chosen.is_empty() {
            ResourceKind::ALL.to_vec()
        } else {
            chosen
        }
    }

    /// Validate every selection argument before the runtime is touched.
    fn scan_options(&self) -> tidydock::Result<ScanOptions> {
        let limit = self.limit.as_deref().map(parse_size_limit).transpose()?;
        let selection = SizeSelection::from_options(self.top, limit)?;
        let older_than: Option<Duration> =
            self.older_than.as_deref().map(parse_duration).transpose()?;

        Ok(ScanOptions {
            kinds: self.kinds(),
            all_images: self.all_images,
            older_than,
            selection,
        })
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn confirm(prompt: &str) -> Result<bool> {
    print!("{} [y/N] ", prompt);
    std::io::stdout().flush()?;

    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().eq_ignore_ascii_case("y"))
}

fn run(args: &Args) -> Result<()> {
    let options = args.scan_options()?;

    let runtime = CliRuntime::new(&args.runtime);
    runtime.check()?;

    let progress = if args.json {
        ProgressBar::hidden()
    } else {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed_precise}] {msg}")
                .context("Invalid progress template")?,
        );
        spinner.enable_steady_tick(Duration::from_millis(100));
        spinner
    };
    progress.set_message(format!("Scanning {} resources...", runtime.binary()));

    let scan = Scanner::new(&runtime).scan(&options);
    progress.finish_and_clear();
    let scan = scan?;

    if !args.json {
        print!("{}", render_scan(&scan, args.verbose));
    }

    if scan.is_empty() {
        if args.json {
            println!("{}", ScanReport::new(&scan, None).to_json()?);
        } else {
            println!("Nothing to clean.");
        }
        return Ok(());
    }

    let proceed = if args.dry_run || args.yes {
        true
    } else if args.json {
        false
    } else {
        confirm(&format!(
            "Remove these resources and reclaim about {}?",
            format_bytes(scan.total_reclaimable_bytes)
        ))?
    };

    if !proceed {
        if args.json {
            println!("{}", ScanReport::new(&scan, None).to_json()?);
        } else {
            println!("{}", "Operation cancelled".yellow());
        }
        return Ok(());
    }

    let mut clean_options = CleanOptions::from_scan(
        &scan,
        options.older_than,
        options.all_images,
        options.selection.is_active(),
    );
    clean_options.dry_run = args.dry_run;

    let result = Cleaner::new(&runtime).clean(&clean_options);

    if args.json {
        println!("{}", ScanReport::new(&scan, Some(&result)).to_json()?);
    } else {
        print!("{}", render_clean(&result, args.dry_run));
        if result.has_failures() {
            eprintln!(
                "{}",
                "Some resources could not be removed; see the errors above.".yellow()
            );
        }
    }

    Ok(())
}

fn main() {
    let args = Args::parse();
    init_logging(args.verbose);

    if let Err(err) = run(&args) {
        eprintln!("{} {:#}", "Error:".red().bold(), err);
        let code = err
            .downcast_ref::<tidydock::Error>()
            .map(tidydock::Error::exit_code)
            .unwrap_or(1);
        std::process::exit(code);
    }
}
