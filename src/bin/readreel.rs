use std::path::PathBuf;

use anyhow::Context as _;
use clap::Parser;

/// Render a ruler frame, one frame per read and a coverage frame with `hgb vis`.
///
/// Renderer flags shared by every frame go after `--`, e.g.
/// `readreel --read-max 5 -- -a sample.bam -r chr1:100-2000`. Without them a built-in template
/// is used.
#[derive(Parser, Debug)]
#[command(name = "readreel", version)]
struct Cli {
    /// JSON options file; flags given on the command line override its values.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Highest read index to render (inclusive).
    #[arg(long)]
    read_max: Option<u32>,

    /// Thread count passed to the renderer as `-t<N>`.
    #[arg(long)]
    renderer_threads: Option<u32>,

    /// Directory receiving `<slot>.png` frames.
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Metadata record path (defaults to `<out-dir>/reads.json`).
    #[arg(long)]
    metadata: Option<PathBuf>,

    /// Renderer executable, tried before the debug and release build paths.
    #[arg(long)]
    renderer: Option<PathBuf>,

    /// Frames rendered concurrently (1 renders strictly in order).
    #[arg(long)]
    jobs: Option<usize>,

    /// Kill a renderer process after this many seconds.
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Extra attempts for a frame whose renderer process failed.
    #[arg(long)]
    retries: Option<u32>,

    /// Render every frame even after failures, then report all of them.
    #[arg(long)]
    best_effort: bool,

    /// Delete numbered frames left over from a previous run with a larger read max.
    #[arg(long)]
    purge_stale: bool,

    /// Create the output and metadata directories when missing.
    #[arg(long)]
    create_dirs: bool,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Renderer flags applied to every frame.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    template: Vec<String>,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let opts = build_options(cli)?;
    let report = readreel::render_reel(&opts, &readreel::ProcessLauncher::default())
        .context("render reel")?;

    if !report.purged.is_empty() {
        eprintln!("purged {} stale frame(s)", report.purged.len());
    }
    eprintln!(
        "wrote {} frames to {} ({} retries) and {}",
        report.stats.frames_rendered,
        opts.out_dir.display(),
        report.stats.retries,
        report.metadata_path.display()
    );
    Ok(())
}

fn build_options(cli: Cli) -> anyhow::Result<readreel::ReelOptions> {
    let mut opts = match &cli.config {
        Some(path) => readreel::ReelOptions::from_json_file(path)
            .with_context(|| format!("load options '{}'", path.display()))?,
        None => readreel::ReelOptions::default(),
    };

    if let Some(n) = cli.read_max {
        opts.read_max = n;
    }
    if let Some(n) = cli.renderer_threads {
        opts.renderer_threads = n;
    }
    if let Some(dir) = cli.out_dir {
        opts.out_dir = dir;
    }
    if let Some(path) = cli.metadata {
        opts.metadata_path = Some(path);
    }
    if let Some(path) = cli.renderer {
        opts.renderer = Some(path);
    }
    if let Some(jobs) = cli.jobs {
        opts.threading = readreel::FrameThreading {
            parallel: jobs > 1,
            threads: Some(jobs),
        };
    }
    if let Some(secs) = cli.timeout_secs {
        opts.timeout_secs = Some(secs);
    }
    if let Some(n) = cli.retries {
        opts.retries = n;
    }
    if cli.best_effort {
        opts.failure_policy = readreel::FailurePolicy::BestEffort;
    }
    if cli.purge_stale {
        opts.stale_policy = readreel::StalePolicy::Purge;
    }
    if cli.create_dirs {
        opts.create_dirs = true;
    }
    if !cli.template.is_empty() {
        opts.template = cli.template;
    }

    opts.validate().context("invalid options")?;
    Ok(opts)
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
