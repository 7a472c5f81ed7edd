use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use silhouette_relay::protocol::SilhouetteArea;
use silhouette_relay::scene::{SceneUpdate, Side};
use silhouette_relay::{demo, logging, server, Producer, RelayConfig, SceneState, SubscriberClient};

#[derive(Parser)]
#[command(name = "silhouette-relay")]
#[command(about = "Relay binary mesh and silhouette updates from a producer to live WebSocket subscribers", version)]
#[command(after_help = "Ingestion routes (POST, raw binary body):
   /silhouette/init_object
   /silhouette/update_object
   /silhouette/init_silhouette_area
   /silhouette/update_top_silhouette
   /silhouette/update_bottom_silhouette

Environment (also read from .env):
   RELAY_INGEST_ADDR, RELAY_SUBSCRIBE_ADDR, RELAY_QUEUE_CAPACITY, RELAY_STALL_TIMEOUT_MS,
   RELAY_LOG_DIR, RUST_LOG")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the relay (default)
    Serve {
        /// Address producers post payloads to
        #[arg(long, value_name = "ADDR")]
        ingest_addr: Option<SocketAddr>,

        /// Address subscribers connect to over WebSocket
        #[arg(long, value_name = "ADDR")]
        subscribe_addr: Option<SocketAddr>,

        /// Frames a subscriber may fall behind before its stall clock starts
        #[arg(long)]
        queue_capacity: Option<usize>,

        /// Drop a subscriber that stays more than --queue-capacity frames
        /// behind for this long
        #[arg(long, value_name = "MS")]
        stall_timeout_ms: Option<u64>,

        /// Also write logs to daily files in this directory
        #[arg(long)]
        log_dir: Option<PathBuf>,
    },

    /// Subscribe to a relay and print every scene update
    Watch {
        #[arg(short, long, default_value = "ws://127.0.0.1:8081/")]
        url: String,
    },

    /// Push a sample mesh and animated silhouettes through a relay
    Demo {
        #[arg(short, long, default_value = "http://127.0.0.1:8080")]
        url: String,

        /// Number of animation steps to send
        #[arg(short, long, default_value = "100")]
        frames: u32,

        /// Delay between steps in milliseconds
        #[arg(long, default_value = "50")]
        interval_ms: u64,

        /// Silhouette canvas width and height
        #[arg(long, default_value = "128")]
        size: i32,
    },
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let command = cli.command.unwrap_or(Commands::Serve {
        ingest_addr: None,
        subscribe_addr: None,
        queue_capacity: None,
        stall_timeout_ms: None,
        log_dir: None,
    });

    match command {
        Commands::Serve {
            ingest_addr,
            subscribe_addr,
            queue_capacity,
            stall_timeout_ms,
            log_dir,
        } => {
            let mut config = RelayConfig::from_env()?;
            if let Some(addr) = ingest_addr {
                config.ingest_addr = addr;
            }
            if let Some(addr) = subscribe_addr {
                config.subscribe_addr = addr;
            }
            if let Some(capacity) = queue_capacity {
                config.queue_capacity = capacity;
            }
            if let Some(millis) = stall_timeout_ms {
                config.stall_timeout = Duration::from_millis(millis);
            }
            if log_dir.is_some() {
                config.log_dir = log_dir;
            }

            let _guard = logging::init(config.log_dir.as_deref())?;

            println!("{}", "🌐 Starting silhouette relay...".cyan().bold());
            tokio::select! {
                result = server::start(config) => result?,
                _ = tokio::signal::ctrl_c() => {
                    println!("\n{}", "Shutting down".yellow());
                }
            }
        }

        Commands::Watch { url } => {
            let _guard = logging::init(None)?;
            watch(&url).await?;
        }

        Commands::Demo {
            url,
            frames,
            interval_ms,
            size,
        } => {
            let _guard = logging::init(None)?;
            run_demo(&url, frames, Duration::from_millis(interval_ms), size).await?;
        }
    }

    Ok(())
}

async fn watch(url: &str) -> Result<()> {
    let mut client = SubscriberClient::connect(url)
        .await
        .with_context(|| format!("Failed to connect to {url}"))?;
    println!("{} Subscribed to {}", "↔".bright_blue(), url.bright_yellow());

    let mut scene = SceneState::new();
    while let Some(frame) = client.next_frame().await {
        let frame = frame?;
        match scene.apply_frame(&frame) {
            Ok(update) => println!("{} {}", "→".bright_blue(), describe(update)),
            Err(err) => println!(
                "{} {} ({} bytes): {}",
                "⚠".yellow(),
                frame
                    .kind()
                    .map(|k| k.to_string())
                    .unwrap_or_else(|_| format!("tag {:#04x}", frame.tag())),
                frame.len(),
                err.to_string().yellow()
            ),
        }
    }

    println!("{}", "Connection closed".bright_black());
    Ok(())
}

fn describe(update: SceneUpdate) -> String {
    match update {
        SceneUpdate::MeshInitialized { vertices, faces } => format!(
            "{} {} vertices, {} faces",
            "mesh".green().bold(),
            vertices,
            faces
        ),
        SceneUpdate::MeshUpdated { vertices } => {
            format!("{} {} vertices", "update".cyan(), vertices)
        }
        SceneUpdate::AreaResized { width, height } => {
            format!("{} {}x{}", "area".bright_magenta(), width, height)
        }
        SceneUpdate::SilhouetteUpdated {
            side,
            width,
            height,
        } => {
            let side = match side {
                Side::Top => "top",
                Side::Bottom => "bottom",
            };
            format!("{} {}x{}", format!("{side} silhouette").bright_white(), width, height)
        }
    }
}

async fn run_demo(url: &str, frames: u32, interval: Duration, size: i32) -> Result<()> {
    let producer = Producer::new(url)?;
    let mesh = demo::octahedron();

    producer
        .init_object(&mesh)
        .await
        .with_context(|| format!("Failed to reach relay at {url}"))?;
    producer
        .init_silhouette_area(SilhouetteArea::new(size, size))
        .await?;
    println!(
        "{} Sent mesh with {} vertices to {}",
        "✓".green(),
        mesh.vertices.len(),
        url.bright_blue()
    );

    let half = size as f32 / 2.0;
    for step in 0..frames {
        let t = step as f32 * 0.2;
        producer.update_object(&demo::pulse(&mesh, t)).await?;
        producer
            .update_top_silhouette(&demo::disc(size, half * (0.6 + 0.3 * t.sin())))
            .await?;
        producer
            .update_bottom_silhouette(&demo::disc(size, half * (0.6 + 0.3 * t.cos())))
            .await?;
        tokio::time::sleep(interval).await;
    }

    println!("{} Sent {} animation steps", "✓".green(), frames);
    Ok(())
}
