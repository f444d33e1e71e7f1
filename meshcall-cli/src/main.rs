use anyhow::{Context, Result};
use bytes::Bytes;
use clap::{Parser, Subcommand};
use colored::*;
use meshcall_core::{ConnectionState, IceServerConfig, MediaKind};
use meshcall_peer::{
    ChannelObserver, LocalCapture, LocalMediaSource, LocalTrack, LoopbackHub, MeshConfig,
    MeshEvent, Orchestrator, TransportConfig, decode_signal, static_sample_track,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use webrtc::media::Sample;
use webrtc::track::track_local::TrackLocal;
use webrtc::track::track_local::track_local_static_sample::TrackLocalStaticSample;

#[derive(Parser)]
#[command(name = "meshcall")]
#[command(about = "Mesh WebRTC peer-connection orchestrator tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run several participants in one process over an in-memory signaling hub.
    Loopback {
        #[arg(short, long, default_value_t = 3)]
        participants: usize,

        /// How long to keep the mesh running.
        #[arg(short, long, default_value_t = 10)]
        seconds: u64,

        /// STUN server; repeat for several. Local host candidates only if omitted.
        #[arg(long)]
        stun: Vec<String>,

        /// Switch every participant to a second camera track halfway through.
        #[arg(long)]
        swap_camera: bool,
    },

    /// Validate a signaling message and pretty-print it.
    Codec { json: String },
}

struct Participant {
    orchestrator: Orchestrator,
    media: LocalMediaSource,
    spare_camera: Arc<TrackLocalStaticSample>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .init();

    match Cli::parse().command {
        Commands::Loopback {
            participants,
            seconds,
            stun,
            swap_camera,
        } => run_loopback(participants, seconds, stun, swap_camera).await,
        Commands::Codec { json } => run_codec(&json),
    }
}

async fn run_loopback(count: usize, seconds: u64, stun: Vec<String>, swap_camera: bool) -> Result<()> {
    if count < 2 {
        anyhow::bail!("A mesh needs at least 2 participants");
    }

    let transport = stun
        .into_iter()
        .fold(TransportConfig::local_machine(), |config, url| {
            config.with_ice_server(IceServerConfig::stun(url))
        });

    let banner = format!("🚀 Starting loopback mesh with {} participants...", count);
    println!("{}", banner.as_str().green().bold());

    let hub = LoopbackHub::new();
    let mut participants = Vec::with_capacity(count);

    for i in 1..=count {
        let id = format!("peer-{:02}", i);
        let camera = static_sample_track(MediaKind::Video, format!("{id}-camera"), id.clone());
        let spare_camera =
            static_sample_track(MediaKind::Video, format!("{id}-camera-2"), id.clone());
        spawn_sample_pump(Arc::clone(&camera));
        spawn_sample_pump(Arc::clone(&spare_camera));

        let media = LocalMediaSource::new(LocalCapture::new(vec![camera as LocalTrack]));
        let connection = hub.attach(id.as_str());

        let config = MeshConfig::new(id.as_str()).with_transport(transport.clone());
        let orchestrator =
            Orchestrator::start(config, Arc::new(connection.signaling), media.subscribe());

        let (observer, events) = ChannelObserver::new();
        orchestrator
            .set_observer(Arc::new(observer))
            .await
            .context("Orchestrator stopped before it could be observed")?;
        tokio::spawn(print_events(id.clone(), events));

        orchestrator.signaling_adapter().forward_from(connection.inbox);

        println!("   🔌 {} attached at {}", id.as_str().cyan(), connection.address);
        participants.push(Participant {
            orchestrator,
            media,
            spare_camera,
        });
    }

    let run_for = Duration::from_secs(seconds);
    if swap_camera {
        tokio::time::sleep(run_for / 2).await;
        println!("{}", "🎥 Switching every participant to its second camera".cyan());
        for p in &participants {
            p.media
                .publish(LocalCapture::new(vec![Arc::clone(&p.spare_camera) as LocalTrack]));
        }
        tokio::time::sleep(run_for - run_for / 2).await;
    } else {
        tokio::time::sleep(run_for).await;
    }

    println!("{}", "📊 Mesh summary".green().bold());
    let mut healthy = true;
    for p in &participants {
        let sessions = p.orchestrator.sessions().await?;
        let connected = sessions
            .iter()
            .filter(|s| s.state == meshcall_peer::SessionState::Connected)
            .count();
        let streams = p.orchestrator.remote_streams().len();
        healthy &= connected == count - 1;

        let line = format!(
            "   {}: {}/{} connected, {} remote stream(s)",
            p.orchestrator.local_id(),
            connected,
            count - 1,
            streams
        );
        if connected == count - 1 {
            println!("{}", line.as_str().green());
        } else {
            println!("{}", line.as_str().yellow());
        }
    }

    futures::future::join_all(participants.iter().map(|p| p.orchestrator.shutdown())).await;

    if healthy {
        println!("{}", "✨ Full mesh established".green().bold());
        Ok(())
    } else {
        anyhow::bail!("Mesh incomplete after {}s", seconds)
    }
}

/// Feeds dummy VP8 frames so remote sides see RTP and fire their track handlers.
fn spawn_sample_pump(track: Arc<TrackLocalStaticSample>) {
    tokio::spawn(async move {
        let frame = Bytes::from_static(&[0x10, 0x02, 0x00, 0x9d, 0x01, 0x2a]);
        let mut ticker = tokio::time::interval(Duration::from_millis(33));
        loop {
            ticker.tick().await;
            let sample = Sample {
                data: frame.clone(),
                duration: Duration::from_millis(33),
                ..Default::default()
            };
            if let Err(e) = track.write_sample(&sample).await {
                tracing::debug!("Sample pump for {} stopped: {}", track.id(), e);
                break;
            }
        }
    });
}

async fn print_events(id: String, mut events: mpsc::UnboundedReceiver<MeshEvent>) {
    while let Some(event) = events.recv().await {
        let prefix = format!("[{id}]");
        let prefix = prefix.as_str().dimmed();
        match event {
            MeshEvent::StateChanged {
                participant_id,
                state,
            } => {
                let state_text = format!("{:?}", state);
                let state_text = match state {
                    ConnectionState::Connected => state_text.as_str().green(),
                    ConnectionState::Failed => state_text.as_str().red(),
                    ConnectionState::Recovering | ConnectionState::Disconnected => {
                        state_text.as_str().yellow()
                    }
                    _ => state_text.as_str().normal(),
                };
                println!("{} {} → {}", prefix, participant_id, state_text);
            }
            MeshEvent::StreamAdded {
                participant_id,
                stream,
            } => {
                println!(
                    "{} {} stream from {} ({} track(s))",
                    prefix,
                    "▶".green(),
                    participant_id,
                    stream.track_count()
                );
            }
            MeshEvent::StreamRemoved { participant_id } => {
                println!("{} {} stream from {}", prefix, "■".red(), participant_id);
            }
        }
    }
}

fn run_codec(json: &str) -> Result<()> {
    let msg = decode_signal(json).context("Invalid signaling message")?;
    println!(
        "{} {} from {}",
        "✔".green(),
        msg.event_name().cyan().bold(),
        msg.participant_id()
    );
    println!("{}", serde_json::to_string_pretty(&msg)?);
    Ok(())
}
