use std::path::{Path, PathBuf};
use std::process::ExitCode;

use chrono::Local;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use aura_voice::actions::{self, SystemLauncher, UrlLauncher};
use aura_voice::intent::IntentSource;
use aura_voice::intent::rules::RuleResolver;
use aura_voice::voice::{SpeechToText, TextToSpeech};
use aura_voice::{ApiServerBuilder, Config, Orchestrator, Synthesizer, Transcriber};

/// Aura - a voice-command assistant
#[derive(Parser)]
#[command(name = "aura", version, about)]
struct Cli {
    /// Port to listen on (overrides the config file)
    #[arg(long, env = "AURA_PORT")]
    port: Option<u16>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Never open URLs on this host (headless servers)
    #[arg(long, env = "AURA_NO_BROWSER")]
    no_browser: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Resolve a phrase to an intent and show the planned reply
    Resolve {
        /// Phrase to resolve
        text: String,
        /// Skip the generative classifier
        #[arg(long)]
        rules_only: bool,
    },
    /// Transcribe an audio file
    TestStt {
        /// WAV or WebM file
        file: PathBuf,
    },
    /// Synthesize text to an audio file
    TestTts {
        /// Text to speak
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
        /// Output path (defaults to response.<ext>)
        #[arg(short, long)]
        out: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity; RUST_LOG wins when set
    let filter = match cli.verbose {
        0 => "info,aura_voice=info",
        1 => "info,aura_voice=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load()?;
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    if cli.no_browser {
        config.server.open_urls = false;
    }

    if let Some(cmd) = cli.command {
        return match cmd {
            Command::Resolve { text, rules_only } => resolve(&config, &text, rules_only).await,
            Command::TestStt { file } => test_stt(&config, &file).await,
            Command::TestTts { text, out } => test_tts(&config, &text, out).await,
        };
    }

    tracing::info!(
        host = %config.server.host,
        port = config.server.port,
        stt = ?config.voice.stt_provider,
        tts = ?config.voice.tts_provider,
        classifier = %config.classifier.model,
        "starting aura"
    );

    let server = ApiServerBuilder::from_config(&config).build();
    let handle = server.spawn();

    if config.server.open_urls && config.server.static_dir.is_some() {
        match SystemLauncher::detect() {
            Some(launcher) => launcher.launch(&format!("http://localhost:{}", config.server.port)),
            None => tracing::debug!("no browser launcher found"),
        }
    }

    handle.await??;
    Ok(())
}

async fn resolve(config: &Config, text: &str, rules_only: bool) -> anyhow::Result<()> {
    let resolved = if rules_only {
        RuleResolver::new(&config.assistant_name)
            .resolve(text)
            .map(|intent| (intent, IntentSource::Rules))
    } else {
        let orchestrator = Orchestrator::from_config(config);
        Some(orchestrator.resolve_intent(text).await)
    };

    let Some((intent, source)) = resolved else {
        println!("no rule matched");
        return Ok(());
    };

    let action = actions::plan(&intent, Local::now().naive_local());
    println!("{}", serde_json::to_string_pretty(&intent)?);
    println!("source: {}", source.as_str());
    println!("response: {}", action.response);
    if let Some(actions::Effect::OpenUrl(url)) = action.effect {
        println!("would open: {url}");
    }
    Ok(())
}

async fn test_stt(config: &Config, file: &Path) -> anyhow::Result<()> {
    let stt = SpeechToText::from_config(config)?;
    tracing::info!(path = %file.display(), provider = ?config.voice.stt_provider, "transcribing");

    let text = stt.transcribe(file).await?;
    if text.is_empty() {
        println!("(no speech detected)");
    } else {
        println!("{text}");
    }
    Ok(())
}

async fn test_tts(config: &Config, text: &str, out: Option<PathBuf>) -> anyhow::Result<()> {
    let tts = TextToSpeech::from_config(config)?;
    tracing::info!(provider = ?config.voice.tts_provider, "synthesizing");

    let audio = tts.synthesize(text).await?;
    let out = out.unwrap_or_else(|| PathBuf::from(format!("response.{}", tts.format().extension())));
    tokio::fs::write(&out, &audio).await?;

    println!("wrote {} bytes to {}", audio.len(), out.display());
    Ok(())
}
