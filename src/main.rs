use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use friday_assistant::voice::{
    AudioCapture, AudioPlayback, PLAYBACK_SAMPLE_RATE, SAMPLE_RATE, SpeechToText, TextToSpeech,
    decode_mp3, rms, samples_to_wav, select_voice,
};
use friday_assistant::{Config, Daemon, Error};

/// FRIDAY - voice assistant with a wake word and local commands
#[derive(Parser)]
#[command(name = "friday", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Config file (defaults to ~/.config/friday/config.toml)
    #[arg(short, long, env = "FRIDAY_CONFIG")]
    config: Option<PathBuf>,

    /// Turn the assistant on at startup
    #[arg(long)]
    active: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
#[allow(clippy::enum_variant_names)]
enum Command {
    /// Run the assistant (default)
    Run,
    /// Resolve a typed command and print the reply
    Ask {
        /// What to ask, with or without the wake word
        #[arg(required = true)]
        text: Vec<String>,
    },
    /// List configured voices and the one that would be used
    Voices,
    /// Test microphone input
    TestMic {
        /// Duration in seconds
        #[arg(short, long, default_value = "5")]
        duration: u64,
    },
    /// Test speaker output
    TestSpeaker,
    /// Test TTS output
    TestTts {
        /// Text to speak
        #[arg(default_value = "System Online. Main ready hoon Sir.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,friday_assistant=info",
        1 => "info,friday_assistant=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(Error::Unsupported(reason)) = e.downcast_ref::<Error>() {
                eprintln!("FRIDAY cannot run here: {reason}");
                eprintln!("Connect a microphone and try again.");
            } else {
                tracing::error!("fatal: {e}");
            }
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let mut config = Config::load(cli.config.as_deref())?;
    if cli.active {
        config.start_active = true;
    }
    tracing::debug!(?config, "loaded configuration");

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => {
            tracing::info!(persona = %config.persona.name, "starting FRIDAY");
            Daemon::new(config).run().await?;
            Ok(())
        }
        Command::Ask { text } => ask(config, &text.join(" ")).await,
        Command::Voices => {
            voices(&config);
            Ok(())
        }
        Command::TestMic { duration } => test_mic(&config, duration).await,
        Command::TestSpeaker => test_speaker().await,
        Command::TestTts { text } => test_tts(&config, &text).await,
    }
}

/// Resolve a typed command
async fn ask(config: Config, text: &str) -> anyhow::Result<()> {
    let resolution = Daemon::new(config).ask(text).await?;

    println!("{}", resolution.text);
    for action in &resolution.actions {
        println!("  -> {action}");
    }

    Ok(())
}

/// List configured voices
fn voices(config: &Config) {
    let available = &config.voice.voices;

    if available.is_empty() {
        println!("No voices configured; using \"{}\"", config.voice.tts_voice);
        return;
    }

    let selected = select_voice(available);
    for voice in available {
        let marker = if Some(voice) == selected { "*" } else { " " };
        println!("{marker} {} ({})", voice.name, voice.lang);
    }

    if selected.is_none() {
        println!("No preferred voice found; using \"{}\"", config.voice.tts_voice);
    }
}

/// Test microphone input
async fn test_mic(config: &Config, duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");
    println!("Sample rate: {SAMPLE_RATE} Hz");
    println!("---");

    let recorded = tokio::task::spawn_blocking(move || -> friday_assistant::Result<Vec<f32>> {
        let mut capture = AudioCapture::open()?;
        capture.start()?;

        let mut recorded = Vec::new();
        for i in 0..duration {
            std::thread::sleep(Duration::from_secs(1));

            let samples = capture.take_buffer();
            let energy = rms(&samples);
            let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

            // Visual meter
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let meter_len = (energy * 100.0).min(50.0) as usize;
            let meter: String = "█".repeat(meter_len) + &" ".repeat(50 - meter_len);

            println!("[{:2}s] RMS: {energy:.4} | Peak: {peak:.4} | [{meter}]", i + 1);
            recorded.extend(samples);
        }

        capture.stop();
        Ok(recorded)
    })
    .await??;

    println!("\n---");
    println!("Transcribing...");

    let wav = samples_to_wav(&recorded, SAMPLE_RATE)?;
    match SpeechToText::new(&config.voice).transcribe(&wav).await {
        Ok(text) if text.is_empty() => println!("Heard nothing."),
        Ok(text) => println!("Heard: \"{text}\""),
        Err(e) => println!("Transcription failed: {e}"),
    }

    println!("\nIf RMS stayed near 0, check:");
    println!("  1. Is your mic plugged in?");
    println!("  2. Run: pactl info | grep 'Default Source'");
    println!("  3. Run: arecord -l (to list devices)");

    Ok(())
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let frequency = 440.0_f32;
    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..PLAYBACK_SAMPLE_RATE * 2)
        .map(|i| {
            let t = i as f32 / PLAYBACK_SAMPLE_RATE as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    println!("Playing {} samples at {PLAYBACK_SAMPLE_RATE} Hz...", samples.len());
    play(samples, 1.0).await?;

    println!("\n---");
    println!("If you didn't hear anything, check:");
    println!("  1. Run: pactl info | grep 'Default Sink'");
    println!("  2. Run: pactl list sinks short");

    Ok(())
}

/// Test TTS output
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let voice = select_voice(&config.voice.voices).map(|v| v.name.as_str());
    let prosody = config.voice.prosody;

    println!("Synthesizing speech...");
    let mp3 = TextToSpeech::new(&config.voice)
        .synthesize(text, voice, prosody.rate)
        .await?;
    println!("Got {} bytes of audio data", mp3.len());

    println!("Playing audio...");
    play(decode_mp3(&mp3)?, prosody.volume).await?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}

async fn play(samples: Vec<f32>, volume: f32) -> anyhow::Result<()> {
    tokio::task::spawn_blocking(move || {
        let cancel = AtomicBool::new(false);
        AudioPlayback::open()?.play_blocking(samples, volume, &cancel)
    })
    .await??;
    Ok(())
}
