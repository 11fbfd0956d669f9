//! `airwave`: command-line client for the Airwave rating API.
//!
//! # Usage
//!
//! ```text
//! airwave hash --artist "Daft Punk" --title "One More Time"
//! airwave ratings 1k3x9a
//! airwave rate 1k3x9a --user me --up --title "One More Time" --artist "Daft Punk"
//! airwave my-rating 1k3x9a me
//! ```

mod client;

use airwave_core::{hash, rating::Thumb};
use anyhow::Result;
use clap::{ArgGroup, Parser, Subcommand};
use client::{ApiClient, RateRequest};
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser, Debug)]
#[command(name = "airwave", about = "Command-line client for Airwave song ratings")]
struct Args {
  /// Base URL of the airwave server.
  #[arg(long, env = "AIRWAVE_URL", default_value = "http://localhost:3000")]
  url: String,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print the song hash of a track (computed locally).
  Hash {
    #[arg(long)]
    artist: String,
    #[arg(long)]
    title:  String,
    #[arg(long)]
    album:  Option<String>,
  },
  /// Show the vote counts for a song.
  Ratings { song_hash: String },
  /// Submit a thumbs up or down.
  #[command(group(ArgGroup::new("vote").required(true).args(["up", "down"])))]
  Rate {
    song_hash: String,
    #[arg(long)]
    user:      String,
    #[arg(long)]
    up:        bool,
    #[arg(long)]
    down:      bool,
    #[arg(long)]
    title:     String,
    #[arg(long)]
    artist:    String,
    #[arg(long)]
    album:     Option<String>,
  },
  /// Show one user's vote on a song.
  MyRating { song_hash: String, user: String },
  /// Show the address the server sees for this client.
  Ip,
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::WARN.into())
        .from_env_lossy(),
    )
    .init();

  let args = Args::parse();
  let api = ApiClient::new(&args.url)?;

  match args.command {
    Command::Hash { artist, title, album } => {
      println!("{}", hash::song_hash(&artist, &title, album.as_deref()));
    }
    Command::Ratings { song_hash } => {
      let agg = api.ratings(&song_hash).await?;
      println!("👍 {}  👎 {}", agg.thumbs_up, agg.thumbs_down);
    }
    Command::Rate { song_hash, user, up, title, artist, album, .. } => {
      let body = RateRequest {
        rating: if up { Thumb::Up } else { Thumb::Down },
        user_id: user,
        title,
        artist,
        album,
      };
      let resp = api.rate(&song_hash, &body).await?;
      println!(
        "{}: 👍 {}  👎 {}",
        resp.message, resp.aggregate.thumbs_up, resp.aggregate.thumbs_down
      );
    }
    Command::MyRating { song_hash, user } => {
      match api.user_rating(&song_hash, &user).await? {
        Some(Thumb::Up) => println!("👍"),
        Some(Thumb::Down) => println!("👎"),
        None => println!("not rated"),
      }
    }
    Command::Ip => println!("{}", api.client_ip().await?),
  }

  Ok(())
}
