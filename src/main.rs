use clap::{Parser, Subcommand};
use minty::{build, config, output};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "minty")]
#[command(about = "Data-driven static site generator")]
#[command(long_about = "\
Data-driven static site generator

Templates plus one JSON data document in, rendered files out.

Site structure:

  site/
  ├── index.template.html          # Template: rendered with data[\"index\"] → index.html
  ├── header.partial.html          # Partial: included via <!-- @header.partial.html -->
  ├── shop/
  │   └── product.template.html    # Wildcard: data[\"product*\"] → product.<sub>.html
  └── logo.svg                     # Everything else is copied as-is

Data precedence (last wins, shallow):
  $database → common → \"<partial>_\" (partials only) → page data

Run 'minty gen-config' to generate a documented minty.toml.")]
#[command(version)]
struct Cli {
    /// Config file (a missing file means stock defaults)
    #[arg(long, default_value = "minty.toml", global = true)]
    config: PathBuf,

    /// Root directory with templates, partials and static assets
    #[arg(long, global = true)]
    root: Option<PathBuf>,

    /// Output directory (cleared on every build)
    #[arg(long, global = true)]
    dist: Option<PathBuf>,

    /// JSON data file path or http(s) URL
    #[arg(long, global = true)]
    data: Option<String>,

    /// Template extension to recognize; repeat for several (replaces config list)
    #[arg(long = "ext", global = true)]
    extensions: Vec<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Clean dist, copy static assets and render every template
    Build,
    /// Render everything without writing, reporting the same errors
    Check,
    /// Print a stock minty.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let command = match &cli.command {
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
            return Ok(());
        }
        Command::Build => build::build,
        Command::Check => build::check,
    };

    let site_config = resolve_site_config(&cli)?;
    println!("==> Minty");
    println!("    Root: {}", site_config.root_dir.display());
    println!("    Dist: {}", site_config.dist_dir.display());
    println!("    Data: {}", site_config.data_source);

    init_thread_pool(&site_config.processing);
    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            output::print_build_event(&event);
        }
    });
    let result = command(&site_config, Some(tx));
    let _ = printer.join();
    let report = result?;

    println!();
    output::print_build_report(&report);
    if !report.is_success() {
        std::process::exit(1);
    }
    Ok(())
}

/// Read the config file, apply CLI overrides on top, then validate once.
fn resolve_site_config(cli: &Cli) -> Result<config::SiteConfig, config::ConfigError> {
    let overrides = config::Overrides {
        root_dir: cli.root.clone(),
        dist_dir: cli.dist.clone(),
        data_source: cli.data.clone(),
        extensions: cli.extensions.clone(),
    };
    let site_config = config::read_config(&cli.config)?.with_overrides(&overrides);
    site_config.validate()?;
    Ok(site_config)
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores; user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
