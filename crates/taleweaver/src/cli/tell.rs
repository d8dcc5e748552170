//! The `taleweaver tell` command: one image in, caption + story + audio out.

use std::path::PathBuf;
use std::time::Duration;

use clap::{Args, ValueEnum};
use console::Style;
use indicatif::{ProgressBar, ProgressStyle};
use taleweaver_core::{Config, SamplingParameters, Secrets, StoryOutcome, StoryPipeline};

/// Arguments for the `tell` command.
#[derive(Args, Debug)]
pub struct TellArgs {
    /// JPEG or PNG image to tell a story about
    pub image: PathBuf,

    /// Top-K sampling (1-100); defaults to `story.top_k`
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..=100))]
    pub top_k: Option<u32>,

    /// Top-P sampling (0.0-1.0); defaults to `story.top_p`
    #[arg(long, value_parser = parse_top_p)]
    pub top_p: Option<f32>,

    /// Sampling temperature (0.1-2.0); defaults to `story.temperature`
    #[arg(long, value_parser = parse_temperature)]
    pub temperature: Option<f32>,

    /// Directory to create the session in (overrides `workspace.dir`)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "text")]
    pub format: OutputFormat,
}

/// Supported output formats.
#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum OutputFormat {
    /// Caption, story and audio path for humans
    Text,
    /// The full outcome as a JSON object
    Json,
}

fn parse_bounded(raw: &str, (min, max): (f32, f32)) -> Result<f32, String> {
    let value: f32 = raw.parse().map_err(|e| format!("{e}"))?;
    if value >= min && value <= max {
        Ok(value)
    } else {
        Err(format!("{value} is not in {min}..={max}"))
    }
}

fn parse_top_p(raw: &str) -> Result<f32, String> {
    parse_bounded(raw, SamplingParameters::TOP_P_RANGE)
}

fn parse_temperature(raw: &str) -> Result<f32, String> {
    parse_bounded(raw, SamplingParameters::TEMPERATURE_RANGE)
}

impl TellArgs {
    /// Command-line values over configured defaults.
    fn sampling(&self, config: &Config) -> anyhow::Result<SamplingParameters> {
        Ok(SamplingParameters::new(
            self.top_k.unwrap_or(config.story.top_k),
            self.top_p.unwrap_or(config.story.top_p),
            self.temperature.unwrap_or(config.story.temperature),
        )?)
    }
}

/// Execute the tell command.
pub async fn execute(args: TellArgs, mut config: Config) -> anyhow::Result<()> {
    if let Some(dir) = &args.output_dir {
        let expanded = shellexpand::tilde(&dir.to_string_lossy()).into_owned();
        config.workspace.dir = PathBuf::from(expanded);
    }
    let sampling = args.sampling(&config)?;
    let secrets = Secrets::resolve(&config)?;

    let spinner = spinner()?;
    spinner.set_message("Loading captioning model...");
    let pipeline = StoryPipeline::from_config(&config, &secrets);
    let pipeline = match pipeline {
        Ok(pipeline) => pipeline,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };

    spinner.set_message("AI is at Work!");
    let result = pipeline.run_file(&args.image, sampling).await;
    spinner.finish_and_clear();
    let outcome = result?;

    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&outcome)?),
        OutputFormat::Text => print_text(&outcome),
    }
    Ok(())
}

fn spinner() -> anyhow::Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg}")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    Ok(pb)
}

fn print_text(outcome: &StoryOutcome) {
    let heading = Style::new().bold().cyan();
    let dim = Style::new().dim();

    println!("{}", heading.apply_to("Image Caption"));
    println!("{}\n", outcome.caption);
    println!("{}", heading.apply_to("Story"));
    println!("{}\n", outcome.story);
    println!("{}", heading.apply_to("Audio Story"));
    println!("{}", outcome.audio.path.display());
    println!(
        "{}",
        dim.apply_to(format!(
            "session {} · caption {}ms · story {}ms · speech {}ms",
            outcome.session_id,
            outcome.timings.caption_ms,
            outcome.timings.story_ms,
            outcome.timings.speech_ms
        ))
    );
}
