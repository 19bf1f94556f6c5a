// CLI binary: panicking on unrecoverable errors is standard for CLI tools.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::unreachable, clippy::indexing_slicing)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process;
use std::time::Instant;

use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;

use beat_lights::demo;
use beat_lights::engine::ChannelLights;
use beat_lights::error::PipelineError;
use beat_lights::model::{AudioAnalysis, AudioFeatures, LightRoster, RawAnalysis};
use beat_lights::pipeline::{self, GeneratedShow};
use beat_lights::settings::{self, PipelineConfig};
use beat_lights::state::SharedTimeline;

// ── CLI argument parsing ─────────────────────────────────────────

#[derive(Parser)]
#[command(name = "beatlights-cli", about = "Beat Lights headless CLI", version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Track analysis JSON. The built-in demo track is used when omitted.
    #[arg(long, global = true)]
    analysis: Option<PathBuf>,

    /// Track-level audio features JSON (energy, loudness, ...)
    #[arg(long, global = true)]
    features: Option<PathBuf>,

    /// Light roster JSON. The built-in demo roster is used when omitted.
    #[arg(long, global = true)]
    roster: Option<PathBuf>,

    /// Channel assignment JSON. Every light goes on every channel when omitted.
    #[arg(long, global = true)]
    channels: Option<PathBuf>,

    /// Pipeline config JSON
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the config's rng seed
    #[arg(long, global = true)]
    seed: Option<u64>,

    /// Output raw JSON instead of formatted text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Sample light colors at the given times (seconds)
    Render {
        times: Vec<f64>,
        /// Sample every STEP seconds over the whole track instead
        #[arg(long, conflicts_with = "times")]
        step: Option<f64>,
    },
    /// Print per-section intensity and chosen effect
    Sections,
    /// Print detected bursts
    Bursts,
    /// Build the demo show and print a summary
    Demo {
        /// Write the demo roster and a default config here
        #[arg(long)]
        out_dir: Option<PathBuf>,
    },
    /// Benchmark timeline sampling
    Bench {
        /// Time to sample at
        #[arg(long, default_value = "10.0")]
        time: f64,
        /// Number of iterations
        #[arg(long, default_value = "1000")]
        iterations: usize,
    },
}

// ── Input loading ────────────────────────────────────────────────

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, PipelineError> {
    let data = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&data)?)
}

fn load_analysis(cli: &Cli) -> Result<AudioAnalysis, PipelineError> {
    let Some(path) = &cli.analysis else {
        return demo::create_demo_analysis();
    };
    let raw: RawAnalysis = read_json(path)?;
    let features: AudioFeatures = match &cli.features {
        Some(path) => read_json(path)?,
        None => AudioFeatures::default(),
    };
    AudioAnalysis::from_raw(raw, features)
}

fn load_roster(cli: &Cli) -> Result<LightRoster, PipelineError> {
    match &cli.roster {
        Some(path) => read_json(path),
        None => demo::create_demo_roster(),
    }
}

fn load_pipeline_config(cli: &Cli) -> Result<PipelineConfig, PipelineError> {
    let mut config = match &cli.config {
        Some(path) => settings::load_config(path)?,
        None => PipelineConfig::default(),
    };
    if cli.seed.is_some() {
        config.seed = cli.seed;
    }
    Ok(config)
}

fn build_show(cli: &Cli) -> Result<GeneratedShow, PipelineError> {
    let analysis = load_analysis(cli)?;
    let roster = load_roster(cli)?;
    let lights = match &cli.channels {
        Some(path) => read_json(path)?,
        None => ChannelLights::single_channel(&roster),
    };
    let config = load_pipeline_config(cli)?;
    pipeline::generate_show(&analysis, roster, &lights, &config)
}

// ── Output formatting ────────────────────────────────────────────

fn print_json<T: serde::Serialize>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

fn render(show: &GeneratedShow, times: &[f64], step: Option<f64>, raw_json: bool) {
    let duration = show.timeline.duration();
    let times: Vec<f64> = match step {
        Some(step) if step > 0.0 => (0..)
            .map(|i| f64::from(i) * step)
            .take_while(|t| *t < duration)
            .collect(),
        Some(_) => {
            eprintln!("Error: --step must be positive");
            process::exit(1);
        }
        None => times.to_vec(),
    };

    // Render through the shared holder the way a playback loop would.
    let shared = SharedTimeline::new();
    shared.swap(show.timeline.clone());

    let frames: Vec<_> = times
        .iter()
        .map(|t| (*t, shared.sample(*t).unwrap_or_default()))
        .collect();
    if raw_json {
        let json: Vec<_> = frames
            .iter()
            .map(|(t, colors)| serde_json::json!({ "time": t, "lights": colors }))
            .collect();
        print_json(&json);
        return;
    }
    for (t, colors) in frames {
        println!("t={t:.3}s");
        for (id, color) in colors {
            println!(
                "  {id:<10} x={:.4} y={:.4} bri={:.3}",
                color.x(),
                color.y(),
                color.brightness()
            );
        }
    }
}

fn print_sections(show: &GeneratedShow, raw_json: bool) {
    if raw_json {
        print_json(&show.sections);
        return;
    }
    for record in &show.sections {
        let effect = record
            .effect
            .map_or_else(|| "-".to_string(), |kind| kind.to_string());
        print!(
            "#{:<2} {:>7.2}s..{:>7.2}s  {:<9} {effect}",
            record.index,
            record.interval.start(),
            record.interval.end(),
            record.intensity.to_string()
        );
        match &record.error {
            Some(e) => println!("  (failed: {e})"),
            None => println!(),
        }
    }
}

fn print_bursts(show: &GeneratedShow, raw_json: bool) {
    if raw_json {
        print_json(&show.bursts);
        return;
    }
    if show.bursts.is_empty() {
        println!("No bursts detected");
        return;
    }
    for burst in &show.bursts {
        let section = burst
            .section
            .map_or_else(|| "-".to_string(), |i| format!("#{i}"));
        println!(
            "{:>7.2}s..{:>7.2}s  {:>2} segments  section {section:<3} {}",
            burst.interval.start(),
            burst.interval.end(),
            burst.members.len(),
            if burst.strobed { "strobed" } else { "skipped" }
        );
    }
}

fn print_summary(show: &GeneratedShow, raw_json: bool) {
    if raw_json {
        print_json(&serde_json::json!({
            "duration": show.timeline.duration(),
            "lights": show.timeline.roster().len(),
            "effects": show.timeline.effect_count(),
            "palette": show.palette,
            "sections": show.sections,
            "bursts": show.bursts,
        }));
        return;
    }
    println!(
        "Show: {:.1}s, {} lights, {} effects, {} palette colors",
        show.timeline.duration(),
        show.timeline.roster().len(),
        show.timeline.effect_count(),
        show.palette.len()
    );
    print_sections(show, false);
    print_bursts(show, false);
}

fn write_demo_files(dir: &Path) -> Result<(), PipelineError> {
    fs::create_dir_all(dir)?;
    let roster = demo::create_demo_roster()?;
    fs::write(
        dir.join("roster.json"),
        serde_json::to_string_pretty(&roster)?,
    )?;
    fs::write(
        dir.join("channels.json"),
        serde_json::to_string_pretty(&ChannelLights::single_channel(&roster))?,
    )?;
    settings::save_config(&dir.join("config.json"), &PipelineConfig::default())?;
    eprintln!("Wrote demo roster, channels and config to {}", dir.display());
    Ok(())
}

// ── Bench mode ──────────────────────────────────────────────────

fn run_bench(show: &GeneratedShow, time: f64, iterations: usize) {
    let iterations = iterations.max(1);
    eprintln!(
        "Timeline: {} lights, {} effects",
        show.timeline.roster().len(),
        show.timeline.effect_count()
    );

    // Warmup
    std::hint::black_box(show.timeline.sample(time));

    let mut times = Vec::with_capacity(iterations);
    for _ in 0..iterations {
        let start = Instant::now();
        let frame = show.timeline.sample(time);
        times.push(start.elapsed());
        std::hint::black_box(&frame);
    }

    times.sort();
    let total: std::time::Duration = times.iter().sum();
    let avg = total / iterations as u32;
    let median = times[iterations / 2];
    let min = times[0];
    let max = times[iterations - 1];
    let p95 = times[((iterations as f64 * 0.95) as usize).min(iterations - 1)];

    eprintln!("Results ({iterations} iterations at t={time}):");
    eprintln!("  avg:    {avg:>8.2?}");
    eprintln!("  median: {median:>8.2?}");
    eprintln!("  min:    {min:>8.2?}");
    eprintln!("  max:    {max:>8.2?}");
    eprintln!("  p95:    {p95:>8.2?}");
}

// ── Main ─────────────────────────────────────────────────────────

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    if let Commands::Demo {
        out_dir: Some(dir),
    } = &cli.command
    {
        if let Err(e) = write_demo_files(dir) {
            eprintln!("Error: {e}");
            process::exit(1);
        }
    }

    let show = build_show(&cli).unwrap_or_else(|e| {
        eprintln!("Error: {e}");
        process::exit(1);
    });

    match &cli.command {
        Commands::Render { times, step } => render(&show, times, *step, cli.json),
        Commands::Sections => print_sections(&show, cli.json),
        Commands::Bursts => print_bursts(&show, cli.json),
        Commands::Demo { .. } => print_summary(&show, cli.json),
        Commands::Bench { time, iterations } => run_bench(&show, *time, *iterations),
    }
}
