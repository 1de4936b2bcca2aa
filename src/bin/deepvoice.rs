use clap::{Parser, Subcommand};
use deep_voice_detector::{
    ensure_models, status, write_audio, AccessList, DefaultFetcher, DetectProgress, Detector,
    DetectorConfig, Device, Models, PredictResponse, Progress, Service, Verdict,
};
use std::{
    path::{Path, PathBuf},
    process,
};

#[derive(Parser)]
#[command(name = "deepvoice")]
#[command(about = "Synthetic speech detection for audio recordings", long_about = None)]
#[command(version)]
struct Cli {
    /// JSON config file (defaults to the platform config dir)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a local audio file and print the verdict as JSON
    Analyze {
        #[arg(short, long)]
        input: PathBuf,

        /// Also write the isolated vocal track to this WAV file
        #[arg(long)]
        save_vocals: Option<PathBuf>,

        #[arg(short, long)]
        quiet: bool,
    },

    /// Handle a request body exactly as a transport would
    Request {
        /// File holding the JSON request body
        #[arg(short, long)]
        body: PathBuf,

        /// Caller address checked against the allowlist
        #[arg(long, default_value = "127.0.0.1")]
        caller: String,
    },

    /// Print the health-check response
    Status,

    /// Report the execution device that would be used
    Device,
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Analyze {
            input,
            save_vocals,
            quiet,
        } => handle_analyze(cli.config.as_deref(), &input, save_vocals.as_deref(), quiet),
        Commands::Request { body, caller } => handle_request(cli.config.as_deref(), &body, &caller),
        Commands::Status => {
            println!("{}", status().body);
            Ok(())
        }
        Commands::Device => handle_device(cli.config.as_deref()),
    };

    match result {
        Ok(()) => process::exit(0),
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    }
}

fn load_detector(cfg: &DetectorConfig, progress: Progress) -> Result<Detector, Box<dyn std::error::Error>> {
    let files = ensure_models(&cfg.model_dir, &progress)?;
    let device = Device::detect(cfg.device);
    let models = Models::load(&files, device)?;
    Ok(Detector::from_models(&models, cfg.policy)?.with_progress(progress))
}

fn handle_analyze(
    config: Option<&Path>,
    input: &Path,
    save_vocals: Option<&Path>,
    quiet: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    if !input.exists() {
        return Err(format!("Input file not found: {}", input.display()).into());
    }

    let cfg = DetectorConfig::load(config)?;
    let progress = if quiet { Progress::none() } else { terminal_progress() };
    let detector = load_detector(&cfg, progress)?;

    let verdict: Verdict = match save_vocals {
        Some(out) => {
            let wave = deep_voice_detector::load_waveform(input)?;
            let vocals = detector.isolate_vocals(&wave)?;
            write_audio(out, &vocals)?;
            if !quiet {
                eprintln!("Vocals: {}", out.display());
            }
            detector.analyze_vocals(&vocals.downmix_to_mono())?
        }
        None => detector.analyze_file(input)?,
    };

    let ratio = verdict.ratio;
    let response = PredictResponse::from(verdict);
    if !quiet {
        eprintln!(
            "Result: {} ({} fake / {} real, ratio {:.2})",
            response.analysis_result, response.fake_count, response.real_count, ratio
        );
    }
    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

fn handle_request(config: Option<&Path>, body: &Path, caller: &str) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = DetectorConfig::load(config)?;
    let access = match &cfg.allowlist {
        Some(p) => AccessList::load(p)?,
        None => AccessList::open(),
    };
    let detector = load_detector(&cfg, Progress::none())?;
    let fetcher = DefaultFetcher::new()?.with_yt_dlp(cfg.yt_dlp.clone());
    let service = Service::new(detector, Box::new(fetcher), access, cfg.work_dir.clone());

    let bytes = std::fs::read(body)?;
    let response = service.handle_predict(caller, &bytes);
    eprintln!("HTTP {}", response.status);
    println!("{}", serde_json::to_string_pretty(&response.body)?);
    if response.status != 200 {
        process::exit(1);
    }
    Ok(())
}

fn handle_device(config: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let cfg = DetectorConfig::load(config)?;
    for d in Device::by_priority() {
        let marker = if d.is_available() { "available" } else { "unavailable" };
        eprintln!("  {:<7} {}", d.name(), marker);
    }
    println!("{}", Device::detect(cfg.device));
    Ok(())
}

fn terminal_progress() -> Progress {
    Progress::new(|event| match event {
        DetectProgress::Stage(stage) => {
            let stage_name = match stage {
                "decode" => "Reading audio file",
                "separate" => "Separating vocals",
                "classify" => "Classifying segments",
                _ => stage,
            };
            eprintln!("{}", stage_name);
        }
        DetectProgress::Tiles { done, total } => {
            eprint!("\rSeparating: {}/{} tiles", done, total);
            if done >= total {
                eprintln!();
            }
        }
        DetectProgress::Segments { done, total } => {
            eprint!("\rClassifying: {}/{} segments", done, total);
            if done >= total {
                eprintln!();
            }
        }
        DetectProgress::Download { done, total } => {
            if total > 0 {
                let percent = (done as f64 / total as f64 * 100.0).round() as u64;
                eprint!(
                    "\rDownloading: {:>3}% ({:.2} MB / {:.2} MB)",
                    percent,
                    done as f64 / 1_000_000.0,
                    total as f64 / 1_000_000.0
                );
                if done >= total {
                    eprintln!();
                }
            } else {
                eprint!("\rDownloading: {:.2} MB", done as f64 / 1_000_000.0);
            }
        }
    })
}
