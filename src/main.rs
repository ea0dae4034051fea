use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use clap::{Parser, Subcommand};
use faceprint::{build_encoding, config, matcher, similarity, FaceEncoding, Pipeline};
use log::info;

#[derive(Parser)]
#[command(name = "faceprint")]
#[command(
    version,
    about = "Face quality scoring, descriptor extraction, and enrollment encoding"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Score face quality of an image
    Quality {
        /// Image file (PNG, JPEG, ...)
        image: PathBuf,
    },
    /// Extract the 64-value face descriptor from an image
    Features {
        /// Image file (PNG, JPEG, ...)
        image: PathBuf,
    },
    /// Compare the faces in two images
    Compare {
        first: PathBuf,
        second: PathBuf,
    },
    /// Build an enrollment encoding from candidate frames
    Enroll {
        /// Subject identifier
        #[arg(long)]
        id: String,
        /// Subject display name
        #[arg(long)]
        name: String,
        /// Candidate frame image files, in capture order
        frames: Vec<PathBuf>,
    },
    /// Verify an image against a packed enrollment encoding
    Verify {
        /// Probe image file
        image: PathBuf,
        /// Packed encoding artifact (base64 text)
        #[arg(long)]
        encoding: String,
    },
}

fn main() -> Result<()> {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .format_target(false)
        .format_timestamp(None)
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(None)?;
    let pipeline = Pipeline::new();

    match cli.command {
        Commands::Quality { image } => quality(&pipeline, &image),
        Commands::Features { image } => features(&pipeline, &image),
        Commands::Compare { first, second } => compare(&pipeline, &first, &second),
        Commands::Enroll { id, name, frames } => enroll(&pipeline, &cfg, &id, &name, &frames),
        Commands::Verify { image, encoding } => verify(&pipeline, &cfg, &image, &encoding),
    }
}

fn read_payload(path: &Path) -> Result<String> {
    let bytes =
        std::fs::read(path).with_context(|| format!("reading image {}", path.display()))?;
    Ok(BASE64.encode(bytes))
}

fn quality(pipeline: &Pipeline, image: &Path) -> Result<()> {
    let score = pipeline.score_quality(&read_payload(image)?)?;
    match score.subscores {
        Some(subs) => {
            println!("size:      {:.3}", subs.size);
            println!("position:  {:.3}", subs.position);
            println!("sharpness: {:.3}", subs.sharpness);
            println!("contrast:  {:.3}", subs.contrast);
            println!("overall:   {:.3}", score.overall);
        }
        None => println!("no face detected (quality 0.000)"),
    }
    Ok(())
}

fn features(pipeline: &Pipeline, image: &Path) -> Result<()> {
    let descriptor = pipeline.extract_features(&read_payload(image)?)?;
    if descriptor.is_empty() {
        anyhow::bail!("no face detected in {}", image.display());
    }
    for (index, value) in descriptor.iter().enumerate() {
        println!("{index:2}: {value:.6}");
    }
    Ok(())
}

fn compare(pipeline: &Pipeline, first: &Path, second: &Path) -> Result<()> {
    let a = pipeline.extract_features(&read_payload(first)?)?;
    let b = pipeline.extract_features(&read_payload(second)?)?;
    if a.is_empty() || b.is_empty() {
        anyhow::bail!("both images must contain a detectable face");
    }
    let score = similarity::compare(&a, &b)?;
    println!("similarity: {score:.3}");
    Ok(())
}

fn enroll(
    pipeline: &Pipeline,
    cfg: &config::Config,
    id: &str,
    name: &str,
    frames: &[PathBuf],
) -> Result<()> {
    info!("enrolling {name} ({id}) from {} frame(s)", frames.len());

    let payloads: Vec<String> = frames
        .iter()
        .map(|p| read_payload(p))
        .collect::<Result<_>>()?;

    let encoding = build_encoding(pipeline, id, name, &payloads)
        .with_context(|| format!("building encoding for {name}"))?;

    if encoding.quality < cfg.quality_threshold {
        info!(
            "quality {:.3} is below the acceptance threshold {:.3}",
            encoding.quality, cfg.quality_threshold
        );
    }

    println!("{}", encoding.pack());
    Ok(())
}

fn verify(
    pipeline: &Pipeline,
    cfg: &config::Config,
    image: &Path,
    artifact: &str,
) -> Result<()> {
    let stored = FaceEncoding::unpack(artifact).context("unpacking encoding artifact")?;
    info!(
        "verifying against {} ({}, quality {:.3})",
        stored.subject_name, stored.subject_id, stored.quality
    );

    let probe = pipeline.extract_features(&read_payload(image)?)?;
    if probe.is_empty() {
        anyhow::bail!("no face detected in {}", image.display());
    }

    let score = matcher::best_score(std::slice::from_ref(&stored), &probe)
        .unwrap_or(0.0);
    println!(
        "score: {score:.3} (threshold {:.3})",
        cfg.match_threshold
    );

    if score >= cfg.match_threshold {
        info!("match");
        Ok(())
    } else {
        anyhow::bail!("no match: {score:.3} below threshold {:.3}", cfg.match_threshold)
    }
}
