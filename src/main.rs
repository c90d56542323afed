use clap::{Parser, Subcommand};
use isolay::imaging::{RustCodec, has_supported_extension};
use isolay::registry::SharedRegistry;
use isolay::settings::{OptimizeSettings, SettingsHandle};
use isolay::wire::RenditionRequest;
use isolay::{config, export, orchestrate, output, plan, source, wire};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use walkdir::WalkDir;

#[derive(Parser)]
#[command(name = "isolay")]
#[command(about = "Batch multi-rendition image optimizer")]
#[command(long_about = "\
Batch multi-rendition image optimizer

Every input image is resized to each selected width and encoded in one
output format. Files are written as <name>-<width>w-<suffix>.<ext>:

  photo.jpg  --width 400 --width 800 --format webp
    → optimized/photo-400w-isolay.webp
    → optimized/photo-800w-isolay.webp

Accepted inputs: JPEG, PNG, WebP, GIF.
Outputs: jpeg, png, webp, avif, gif, tiff.

Defaults come from ./isolay.toml (or --config); flags override them.
Run 'isolay gen-config' to generate a documented isolay.toml.")]
#[command(version)]
struct Cli {
    /// Config file (default: ./isolay.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// More log output on stderr (-v info, -vv debug). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

/// Flags that override the `[settings]` and `[output]` config sections.
#[derive(clap::Args, Clone, Default)]
struct SettingsArgs {
    /// Output format: jpeg, png, webp, avif, gif, tiff
    #[arg(long)]
    format: Option<String>,

    /// Rendition width in pixels (repeatable, replaces the configured list)
    #[arg(long = "width")]
    widths: Vec<u32>,

    /// One extra width on top of --width
    #[arg(long)]
    custom_width: Option<u32>,

    /// Encoding quality, 1-100
    #[arg(long)]
    quality: Option<u32>,

    /// Fix only the width instead of fitting inside it
    #[arg(long)]
    no_aspect: bool,

    /// Allow renditions wider than the source
    #[arg(long)]
    allow_upscale: bool,

    /// Carry EXIF, XMP, ICC and comments into the renditions
    #[arg(long)]
    keep_metadata: bool,

    /// File name suffix for renditions
    #[arg(long)]
    suffix: Option<String>,
}

impl SettingsArgs {
    fn apply(&self, settings: &mut OptimizeSettings) {
        if let Some(format) = &self.format {
            settings.set_format(isolay::imaging::OutputFormat::parse(format));
        }
        if !self.widths.is_empty() {
            settings.widths = self.widths.iter().copied().filter(|&w| w > 0).collect();
        }
        if self.custom_width.is_some() {
            settings.set_custom_width(self.custom_width);
        }
        if let Some(quality) = self.quality {
            settings.set_quality(quality);
        }
        if self.no_aspect {
            settings.set_preserve_aspect_ratio(false);
        }
        if self.allow_upscale {
            settings.set_prevent_upscaling(false);
        }
        if self.keep_metadata {
            settings.set_preserve_metadata(true);
        }
    }
}

#[derive(Subcommand)]
enum Command {
    /// Optimize images (files or directories) into every selected width
    Optimize {
        /// Image files or directories to walk
        #[arg(required = true)]
        paths: Vec<PathBuf>,

        #[command(flatten)]
        settings: SettingsArgs,

        /// Output directory
        #[arg(long)]
        out: Option<PathBuf>,

        /// Images encoded at the same time (clamped to CPU cores)
        #[arg(long)]
        jobs: Option<usize>,

        /// Also write each untouched original as <name>-<suffix>.<ext>
        #[arg(long)]
        keep_original: bool,
    },
    /// Show the renditions a file would get, without encoding
    Plan {
        file: PathBuf,

        #[command(flatten)]
        settings: SettingsArgs,
    },
    /// Run one single-rendition request and print the JSON response
    Render {
        file: PathBuf,
        #[arg(long)]
        width: Option<String>,
        #[arg(long)]
        quality: Option<String>,
        #[arg(long)]
        format: Option<String>,
        #[arg(long)]
        preserve_aspect_ratio: Option<String>,
        #[arg(long)]
        prevent_upscaling: Option<String>,
        #[arg(long)]
        remove_metadata: Option<String>,
    },
    /// Print a stock isolay.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Optimize {
            paths,
            settings,
            out,
            jobs,
            keep_original,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            settings.apply(&mut config.settings);
            if let Some(suffix) = settings.suffix {
                config.output.suffix = suffix;
            }
            if let Some(out) = out {
                config.output.dir = out;
            }
            if let Some(jobs) = jobs {
                config.processing.max_parallel_jobs = jobs;
            }
            if keep_original {
                config.output.keep_originals = true;
            }
            config.validate()?;
            optimize(&paths, &config)?;
        }
        Command::Plan { file, settings } => {
            let mut config = load_config(cli.config.as_deref())?;
            settings.apply(&mut config.settings);
            let suffix = settings.suffix.unwrap_or(config.output.suffix);
            let source = source::SourceImage::from_bytes(display_name(&file), std::fs::read(&file)?)?;
            let specs = plan::plan(&config.settings, &source)?;
            output::print_plan(&source, &specs, &suffix);
        }
        Command::Render {
            file,
            width,
            quality,
            format,
            preserve_aspect_ratio,
            prevent_upscaling,
            remove_metadata,
        } => {
            let request = RenditionRequest {
                file: Some(std::fs::read(&file)?),
                width,
                quality,
                format,
                preserve_aspect_ratio,
                prevent_upscaling,
                remove_metadata,
            };
            let response = wire::handle(&RustCodec::new(), request);
            println!("{}", response.to_json()?);
            if response.status != 200 {
                return Err(format!("request failed with status {}", response.status).into());
            }
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

/// Submit, run the batch with live progress, write every rendition, summarize.
fn optimize(paths: &[PathBuf], config: &config::IsolayConfig) -> Result<(), Box<dyn std::error::Error>> {
    let files = collect_inputs(paths)?;
    let registry = SharedRegistry::default();
    let report = source::submit_images(&registry, files);
    output::print_rejections(&report.rejected);
    if report.accepted.is_empty() {
        return Err("no usable images to optimize".into());
    }

    let settings = SettingsHandle::new(config.settings.clone());
    let codec = RustCodec::new();
    let threads = init_thread_pool(&config.processing);

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_batch_event(&event) {
                println!("{}", line);
            }
        }
    });
    let summary = if threads > 1 {
        orchestrate::run_batch_parallel(&registry, &settings, &codec, Some(tx))
    } else {
        orchestrate::run_batch(&registry, &settings, &codec, Some(tx))
    };
    printer.join().map_err(|_| "progress printer panicked")?;

    let jobs = registry.snapshot();
    let downloads = export::downloads(&jobs, &config.output.suffix, config.output.keep_originals);
    export::write_downloads(&config.output.dir, &downloads)?;

    println!();
    output::print_summary(&jobs, &summary, &downloads);
    println!("==> Written to {}", config.output.dir.display());
    Ok(())
}

/// Read every input: files as given, directories walked for image extensions.
fn collect_inputs(paths: &[PathBuf]) -> Result<Vec<(String, Vec<u8>)>, std::io::Error> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path)
                .sort_by_file_name()
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file() && has_supported_extension(e.path()))
            {
                files.push((display_name(entry.path()), std::fs::read(entry.path())?));
            }
        } else {
            files.push((display_name(path), std::fs::read(path)?));
        }
    }
    Ok(files)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn load_config(path: Option<&Path>) -> Result<config::IsolayConfig, config::ConfigError> {
    match path {
        Some(path) => config::load_config_file(path),
        None => config::load_config(Path::new(".")),
    }
}

/// Log to stderr. `RUST_LOG` wins over `-v`.
fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on processing config.
///
/// Caps at the number of available CPU cores: the user can constrain down, not up.
fn init_thread_pool(processing: &config::ProcessingConfig) -> usize {
    let threads = config::effective_threads(processing);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
    threads
}
