use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use voxcall::Config;
use voxcall::recognizer::{AudioCapture, MicRecognizer, Transcriber};
use voxcall::responder::HttpResponder;
use voxcall::session::SessionController;
use voxcall::speech::{AudioPlayback, SpeechPlayer, SpeechSynth};

/// voxcall - hands-free voice conversation client
#[derive(Parser)]
#[command(name = "voxcall", version, about)]
struct Cli {
    /// Chat endpoint URL
    #[arg(long, env = "VOXCALL_CHAT_URL")]
    chat_url: Option<String>,

    /// TTS endpoint URL
    #[arg(long, env = "VOXCALL_TTS_URL")]
    tts_url: Option<String>,

    /// STT endpoint URL
    #[arg(long, env = "VOXCALL_STT_URL")]
    stt_url: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
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
        #[arg(default_value = "Hello! This is a test of the text to speech system.")]
        text: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,voxcall=info",
        1 => "info,voxcall=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
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
    let mut config = Config::load();
    if let Some(url) = cli.chat_url {
        config.endpoints.chat_url = url;
    }
    if let Some(url) = cli.tts_url {
        config.endpoints.tts_url = url;
    }
    if let Some(url) = cli.stt_url {
        config.endpoints.stt_url = url;
    }

    if let Some(command) = cli.command {
        return match command {
            Command::TestMic { duration } => test_mic(duration).await,
            Command::TestSpeaker => test_speaker().await,
            Command::TestTts { text } => test_tts(&config, &text).await,
        };
    }

    run_session(config).await
}

/// Wire the production backends into a session controller and run until
/// interrupted
async fn run_session(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        chat_url = %config.endpoints.chat_url,
        tts_url = %config.endpoints.tts_url,
        stt_url = %config.endpoints.stt_url,
        "starting voxcall"
    );

    let timeout = config.endpoints.request_timeout;

    let transcriber = Transcriber::new(&config.endpoints.stt_url, timeout)?;
    let (recognizer, recognizer_events) = MicRecognizer::with_events(transcriber);

    let responder = Arc::new(HttpResponder::new(&config.endpoints.chat_url, timeout)?);

    let synth = SpeechSynth::new(&config.endpoints.tts_url, timeout)?;
    let playback = AudioPlayback::new()?;
    let speaker = Arc::new(SpeechPlayer::spawn(synth, playback));

    let (controller, handle) = SessionController::new(
        Box::new(recognizer),
        recognizer_events,
        responder,
        speaker,
        &config,
    );
    let controller_task = tokio::spawn(controller.run());

    handle.start().await;
    tracing::info!("voxcall ready - speak when you're ready");

    // Surface the session-limit notice the moment the flag flips; the
    // controller never clears it.
    let mut limit = handle.limit_signal();
    tokio::spawn(async move {
        if limit.changed().await.is_ok() && *limit.borrow() {
            tracing::warn!(
                "session limit reached - replies are disabled until the service resets the session"
            );
        }
    });

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");

    handle.stop().await;
    drop(handle);
    let _ = controller_task.await;

    Ok(())
}

/// Test microphone input
async fn test_mic(duration: u64) -> anyhow::Result<()> {
    println!("Testing microphone for {duration} seconds...");
    println!("Speak into your microphone!\n");

    let mut capture = AudioCapture::new()?;
    capture.start()?;

    println!("Sample rate: {} Hz", capture.sample_rate());
    println!("---");

    for i in 0..duration {
        tokio::time::sleep(Duration::from_secs(1)).await;

        let samples = capture.take_buffer();
        let energy = calculate_rms(&samples);
        let peak = samples.iter().map(|s| s.abs()).fold(0.0f32, f32::max);

        // Visual meter
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let meter_len = (energy * 100.0).min(50.0) as usize;
        let meter: String = "#".repeat(meter_len) + &" ".repeat(50 - meter_len);

        println!(
            "[{:2}s] RMS: {:.4} | Peak: {:.4} | [{}]",
            i + 1,
            energy,
            peak,
            meter
        );
    }

    capture.stop();

    println!("\n---");
    println!("If you saw movement in the meter, your mic is working!");
    println!("If RMS stayed near 0, check your input device and levels.");

    Ok(())
}

/// Calculate RMS energy
#[allow(clippy::cast_precision_loss)]
fn calculate_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_squares: f32 = samples.iter().map(|s| s * s).sum();
    (sum_squares / samples.len() as f32).sqrt()
}

/// Test speaker output with a sine wave
async fn test_speaker() -> anyhow::Result<()> {
    println!("Testing speaker output...");
    println!("You should hear a 440Hz tone for 2 seconds\n");

    let playback = AudioPlayback::new()?;

    let sample_rate = 24000u32;
    let frequency = 440.0f32;
    #[allow(clippy::cast_precision_loss)]
    let samples: Vec<f32> = (0..sample_rate * 2)
        .map(|i| {
            let t = i as f32 / sample_rate as f32;
            (2.0 * std::f32::consts::PI * frequency * t).sin() * 0.3
        })
        .collect();

    println!("Playing {} samples at {sample_rate} Hz...", samples.len());
    playback.play(samples, sample_rate).await?;

    println!("\n---");
    println!("If you heard the tone, your speakers are working!");

    Ok(())
}

/// Test TTS output against the configured endpoint
async fn test_tts(config: &Config, text: &str) -> anyhow::Result<()> {
    println!("Testing TTS with text: \"{text}\"\n");

    let synth = SpeechSynth::new(&config.endpoints.tts_url, config.endpoints.request_timeout)?;

    println!("Synthesizing speech...");
    let audio = synth.synthesize(text).await?;
    println!("Got {} bytes of audio data", audio.len());

    println!("Playing audio...");
    let playback = AudioPlayback::new()?;
    playback.play_mp3(&audio).await?;

    println!("\n---");
    println!("If you heard the speech, TTS is working!");

    Ok(())
}
