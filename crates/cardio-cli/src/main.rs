use anyhow::{bail, Context, Result};
use cardio_lib::{
    config::CardioConfig,
    cycle::{CycleModel, PulseParams, PulseSupport, WaveRanges},
    filters::FilterKind,
    io::text as text_io,
    plot::{
        figure_from_dominant, figure_from_portrait, figure_from_trace, Figure, PlotBackend, Series,
    },
    sequence::CycleSequence,
    PhaseAnalyzer, PhasePortrait, SampleGrid, SignalKind, Trace,
};
use clap::{Args, Parser, Subcommand, ValueEnum};
use env_logger::Env;
use log::info;
use plotters::prelude::*;
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;
use std::{
    io::{self, Read},
    path::{Path, PathBuf},
};

const MAX_PLOT_POINTS: usize = 4096;

#[derive(Parser)]
#[command(
    name = "cardio",
    version,
    about = "Synthetic cardiac cycles, sequences and phase-space analysis"
)]
struct Cli {
    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Clone)]
struct ModelArgs {
    /// TOML file with the cycle, sequence and analysis settings
    #[arg(long)]
    config: Option<PathBuf>,
    /// Heart rate (beats/min); the waves are rescaled from the configured rate
    #[arg(long)]
    heart_rate: Option<f64>,
}

#[derive(Args, Clone)]
struct SequenceArgs {
    #[command(flatten)]
    model: ModelArgs,
    #[arg(long)]
    cycles: Option<usize>,
    /// Extra T-wave height (mV) on alternate beats
    #[arg(long)]
    alternans: Option<f64>,
    /// Noise level as a fraction of the peak amplitude
    #[arg(long)]
    noise: Option<f64>,
    #[arg(long)]
    seed: Option<u64>,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum FilterMethod {
    #[value(name = "exponential")]
    Exponential,
    #[value(name = "moving-average")]
    MovingAverage,
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum KindArg {
    #[value(name = "cycle")]
    Cycle,
    #[value(name = "sequence")]
    Sequence,
}

impl From<KindArg> for SignalKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Cycle => SignalKind::Cycle,
            KindArg::Sequence => SignalKind::Sequence,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Synthesize one cycle and report every wave with its admissible ranges
    Cycle {
        #[command(flatten)]
        model: ModelArgs,
        #[arg(long)]
        plot: Option<PathBuf>,
    },
    /// Tile the cycle, then apply alternans and noise
    Sequence {
        #[command(flatten)]
        sequence: SequenceArgs,
        #[arg(long)]
        plot: Option<PathBuf>,
    },
    /// Smooth a generated sequence
    Filter {
        #[command(flatten)]
        sequence: SequenceArgs,
        #[arg(long, default_value = "exponential")]
        method: FilterMethod,
        #[arg(long, default_value_t = 0.1)]
        alpha: f64,
        #[arg(long, default_value_t = 10.0)]
        window_ms: f64,
        #[arg(long)]
        plot: Option<PathBuf>,
    },
    /// Phase and pseudophase portraits of whitespace-delimited samples (stdin or --input)
    Phase {
        #[arg(long)]
        input: Option<PathBuf>,
        /// Further candidate cycles appended after --input
        #[arg(long)]
        candidate: Vec<PathBuf>,
        #[arg(long, default_value = "cycle")]
        kind: KindArg,
        #[arg(long)]
        tau: Option<usize>,
        #[arg(long)]
        display_rate: Option<f64>,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        plot: Option<PathBuf>,
    },
    /// Pick the most representative of several candidate cycles
    Dominant {
        #[arg(long = "input", required = true)]
        inputs: Vec<PathBuf>,
        #[arg(long)]
        display_rate: Option<f64>,
        #[arg(long)]
        config: Option<PathBuf>,
        #[arg(long)]
        plot: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    env_logger::Builder::from_env(Env::default().default_filter_or(&cli.log_level)).init();
    match cli.command {
        Commands::Cycle { model, plot } => cmd_cycle(&model, plot.as_deref())?,
        Commands::Sequence { sequence, plot } => cmd_sequence(&sequence, plot.as_deref())?,
        Commands::Filter {
            sequence,
            method,
            alpha,
            window_ms,
            plot,
        } => {
            let kind = match method {
                FilterMethod::Exponential => FilterKind::Exponential { alpha },
                FilterMethod::MovingAverage => FilterKind::MovingAverage { window_ms },
            };
            cmd_filter(&sequence, kind, plot.as_deref())?
        }
        Commands::Phase {
            input,
            candidate,
            kind,
            tau,
            display_rate,
            config,
            plot,
        } => cmd_phase(
            input.as_deref(),
            &candidate,
            kind.into(),
            tau,
            display_rate,
            config.as_deref(),
            plot.as_deref(),
        )?,
        Commands::Dominant {
            inputs,
            display_rate,
            config,
            plot,
        } => cmd_dominant(&inputs, display_rate, config.as_deref(), plot.as_deref())?,
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<CardioConfig> {
    match path {
        Some(path) => CardioConfig::load(path),
        None => Ok(CardioConfig::default()),
    }
}

fn build_model(args: &ModelArgs) -> Result<(CardioConfig, CycleModel)> {
    let config = load_config(args.config.as_deref())?;
    let mut model = config.build_model()?;
    if let Some(heart_rate) = args.heart_rate {
        model.rescale_to_heart_rate(heart_rate)?;
    }
    Ok((config, model))
}

/// Returns the tiled cycle count with the sequence, since noise leaves a bare
/// sequence behind.
fn build_sequence(args: &SequenceArgs) -> Result<(usize, CycleSequence)> {
    let (config, model) = build_model(&args.model)?;
    let cycles = args.cycles.unwrap_or(config.sequence.cycles);
    let alternans = args.alternans.unwrap_or(config.sequence.alternans);
    let noise = args.noise.unwrap_or(config.sequence.noise);
    let seed = args.seed.or(config.sequence.seed);

    let mut sequence = CycleSequence::tile(&model, cycles)?;
    if alternans != 0.0 {
        sequence.inject_alternans(alternans)?;
    }
    if noise != 0.0 {
        let mut rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        let samples = sequence.generate_noise(noise, &mut rng)?;
        sequence = sequence.superimpose(&samples)?;
    }
    info!(
        "sequence of {} cycles, {} samples (alternans {}, noise {})",
        cycles,
        sequence.len(),
        alternans,
        noise
    );
    Ok((cycles, sequence))
}

fn read_samples(input: Option<&Path>) -> Result<Vec<f64>> {
    match input {
        Some(path) => text_io::read_scaled_samples(path),
        None => {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            text_io::parse_scaled_samples(&buf)
        }
    }
}

#[derive(Serialize)]
struct WaveReport {
    name: String,
    params: PulseParams,
    support: PulseSupport,
    ranges: WaveRanges,
}

#[derive(Serialize)]
struct CycleReport {
    heart_rate: f64,
    sample_rate: f64,
    cycle_duration_ms: f64,
    samples: usize,
    waves: Vec<WaveReport>,
    overlaps: Vec<(String, String)>,
    amplitude: Vec<f64>,
}

fn cmd_cycle(args: &ModelArgs, plot: Option<&Path>) -> Result<()> {
    let (_, model) = build_model(args)?;
    let waves = model
        .waves()
        .iter()
        .map(|wave| -> Result<WaveReport> {
            Ok(WaveReport {
                name: wave.name.clone(),
                params: wave.params,
                support: wave.support,
                ranges: model.wave_ranges(&wave.name)?,
            })
        })
        .collect::<Result<Vec<_>>>()?;
    let report = CycleReport {
        heart_rate: model.heart_rate(),
        sample_rate: model.grid().sample_rate(),
        cycle_duration_ms: model.cycle_duration(),
        samples: model.len(),
        waves,
        overlaps: model.overlapping_pairs(),
        amplitude: model.amplitude().to_vec(),
    };
    if let Some(path) = plot {
        let fig = figure_from_trace("Cardiac cycle", &model.trace(), MAX_PLOT_POINTS);
        PngBackend::new(path).draw(&fig)?;
    }
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

#[derive(Serialize)]
struct SequenceReport {
    cycles: usize,
    sample_rate: f64,
    samples: usize,
    duration_ms: f64,
    amplitude: Vec<f64>,
}

impl SequenceReport {
    fn new(cycles: usize, sequence: &CycleSequence, amplitude: Vec<f64>) -> Self {
        Self {
            cycles,
            sample_rate: sequence.grid().sample_rate(),
            samples: amplitude.len(),
            duration_ms: sequence.time().last().copied().unwrap_or(0.0),
            amplitude,
        }
    }
}

fn cmd_sequence(args: &SequenceArgs, plot: Option<&Path>) -> Result<()> {
    let (cycles, sequence) = build_sequence(args)?;
    if let Some(path) = plot {
        let fig = figure_from_trace("Cycle sequence", &sequence.trace(), MAX_PLOT_POINTS);
        PngBackend::new(path).draw(&fig)?;
    }
    let report = SequenceReport::new(cycles, &sequence, sequence.amplitude().to_vec());
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

#[derive(Serialize)]
struct FilterReport {
    filter: FilterKind,
    #[serde(flatten)]
    sequence: SequenceReport,
}

fn cmd_filter(args: &SequenceArgs, kind: FilterKind, plot: Option<&Path>) -> Result<()> {
    let (cycles, sequence) = build_sequence(args)?;
    let filtered = kind.apply(sequence.amplitude(), sequence.grid())?;
    let filtered = CycleSequence::from_samples(*sequence.grid(), filtered);
    if let Some(path) = plot {
        let fig = figure_from_trace("Filtered sequence", &filtered.trace(), MAX_PLOT_POINTS);
        PngBackend::new(path).draw(&fig)?;
    }
    let report = FilterReport {
        filter: kind,
        sequence: SequenceReport::new(cycles, &filtered, filtered.amplitude().to_vec()),
    };
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

#[derive(Serialize)]
struct PhaseReport {
    kind: SignalKind,
    display_rate: f64,
    candidates: usize,
    samples: usize,
    tau: usize,
    duration_ms: f64,
    time_domain: Trace,
    portrait: PhasePortrait,
    pseudophase: PhasePortrait,
}

fn display_grid(config: &CardioConfig, display_rate: Option<f64>) -> Result<SampleGrid> {
    match display_rate {
        Some(rate) => Ok(SampleGrid::new(rate)?),
        None => config.display_grid(),
    }
}

fn cmd_phase(
    input: Option<&Path>,
    candidates: &[PathBuf],
    kind: SignalKind,
    tau: Option<usize>,
    display_rate: Option<f64>,
    config: Option<&Path>,
    plot: Option<&Path>,
) -> Result<()> {
    let config = load_config(config)?;
    let grid = display_grid(&config, display_rate)?;
    let tau = tau.unwrap_or(config.analysis.tau);
    let mut analyzer = PhaseAnalyzer::new(kind, grid, read_samples(input)?);
    for path in candidates {
        analyzer.add_candidate(text_io::read_scaled_samples(path)?)?;
    }
    let portrait = analyzer.phase_portrait();
    let pseudophase = analyzer.pseudophase(tau)?;
    if let Some(path) = plot {
        let fig = figure_from_portrait("Phase portrait", &portrait, "z", "dz", MAX_PLOT_POINTS);
        PngBackend::new(path).draw(&fig)?;
    }
    let time_domain = analyzer.time_domain();
    let report = PhaseReport {
        kind: analyzer.kind(),
        display_rate: grid.sample_rate(),
        candidates: analyzer.candidates().len(),
        samples: portrait.len(),
        tau,
        duration_ms: time_domain.duration(),
        time_domain,
        portrait,
        pseudophase,
    };
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

#[derive(Serialize)]
struct DominantReport {
    index: usize,
    input: String,
    candidates: usize,
    distances: Vec<Vec<f64>>,
}

fn cmd_dominant(
    inputs: &[PathBuf],
    display_rate: Option<f64>,
    config: Option<&Path>,
    plot: Option<&Path>,
) -> Result<()> {
    let Some((first, rest)) = inputs.split_first() else {
        bail!("at least one --input is required");
    };
    let config = load_config(config)?;
    let grid = display_grid(&config, display_rate)?;
    let mut analyzer = PhaseAnalyzer::new(
        SignalKind::Cycle,
        grid,
        text_io::read_scaled_samples(first)?,
    );
    for path in rest {
        analyzer.add_candidate(text_io::read_scaled_samples(path)?)?;
    }
    let dominant = analyzer.dominant_cycle()?;
    if let Some(path) = plot {
        PngBackend::new(path).draw(&figure_from_dominant(&dominant, MAX_PLOT_POINTS))?;
    }
    let report = DominantReport {
        index: dominant.index,
        input: inputs[dominant.index].display().to_string(),
        candidates: inputs.len(),
        distances: dominant.distances.rows().map(|row| row.to_vec()).collect(),
    };
    println!("{}", serde_json::to_string(&report)?);
    Ok(())
}

/// Renders figures to an 800x480 PNG.
struct PngBackend<'a> {
    path: &'a Path,
}

impl<'a> PngBackend<'a> {
    fn new(path: &'a Path) -> Self {
        Self { path }
    }
}

/// Widen a degenerate axis so plotters gets a non-empty range.
fn padded(min: f64, max: f64) -> (f64, f64) {
    if max > min {
        (min, max)
    } else {
        (min - 0.5, max + 0.5)
    }
}

impl PlotBackend for PngBackend<'_> {
    fn draw(&mut self, fig: &Figure) -> Result<()> {
        let backend = BitMapBackend::new(self.path, (800, 480));
        let root = backend.into_drawing_area();
        root.fill(&WHITE)?;
        let (x_min, x_max, y_min, y_max) = fig.bounds().unwrap_or((0.0, 1.0, 0.0, 1.0));
        let (x_min, x_max) = padded(x_min, x_max);
        let (y_min, y_max) = padded(y_min, y_max);
        let mut chart = ChartBuilder::on(&root)
            .margin(10)
            .caption(
                fig.title.clone().unwrap_or_else(|| "Plot".into()),
                ("sans-serif", 24),
            )
            .x_label_area_size(30)
            .y_label_area_size(40)
            .build_cartesian_2d(x_min..x_max, y_min..y_max)?;
        chart
            .configure_mesh()
            .x_desc(fig.x.label.clone().unwrap_or_default())
            .y_desc(fig.y.label.clone().unwrap_or_default())
            .draw()?;
        for series in &fig.series {
            match series {
                Series::Line(line) => {
                    let (r, g, b) = line.style.color.rgb();
                    chart.draw_series(LineSeries::new(
                        line.points
                            .iter()
                            .filter(|p| p[0].is_finite() && p[1].is_finite())
                            .map(|p| (p[0], p[1])),
                        RGBColor(r, g, b).stroke_width(line.style.width.round().max(1.0) as u32),
                    ))?;
                }
            }
        }
        root.present()
            .with_context(|| format!("writing plot {}", self.path.display()))?;
        info!("wrote plot {}", self.path.display());
        Ok(())
    }
}
