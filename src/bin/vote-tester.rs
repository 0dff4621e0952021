//! Vote Tester CLI Tool
//!
//! Drives a running clout-rank server over HTTP, in either wire format.
//!
//! Usage:
//!   cargo run --bin vote-tester -- --help
//!   cargo run --bin vote-tester health
//!   cargo run --bin vote-tester matchup --category ai
//!   cargo run --bin vote-tester vote --winner 1 --loser 2
//!   cargo run --bin vote-tester --binary simulate --rounds 200
//!   cargo run --bin vote-tester leaderboard --page 1 --page-size 10

use std::time::{Duration, Instant};

use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use clout_rank::codec::{decode, encode, WireEntity, WireFormat};
use clout_rank::types::{
    ErrorBody, HealthReport, LeaderboardPage, Matchup, PlatformStats, UserLeaderboardPage,
    VoteOutcome, VoteRequest,
};
use rand::Rng;
use reqwest::header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use uuid::Uuid;

#[derive(Parser)]
#[command(name = "vote-tester")]
#[command(about = "Exercise a running clout-rank server with matchups and votes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Base URL of the server
    #[arg(long, default_value = "http://localhost:8080")]
    base_url: String,

    /// Use the binary wire format instead of JSON
    #[arg(long)]
    binary: bool,

    /// Bearer token attached to votes
    #[arg(long)]
    token: Option<String>,

    /// Request timeout in seconds
    #[arg(long, default_value = "10")]
    timeout: u64,
}

#[derive(Subcommand)]
enum Commands {
    /// Check server health
    Health,
    /// Fetch one matchup
    Matchup {
        /// Category filter
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Submit a single vote
    Vote {
        #[arg(short, long)]
        winner: i32,
        #[arg(short, long)]
        loser: i32,
    },
    /// Fetch matchups and vote on them in a loop
    Simulate {
        /// Number of matchup/vote rounds
        #[arg(short, long, default_value = "50")]
        rounds: u32,
        /// Category filter
        #[arg(short, long)]
        category: Option<String>,
        /// Probability that the left company wins
        #[arg(long, default_value = "0.5")]
        left_bias: f64,
    },
    /// Print a leaderboard page
    Leaderboard {
        #[arg(short, long)]
        category: Option<String>,
        #[arg(short, long, default_value = "1")]
        page: u32,
        #[arg(long, default_value = "25")]
        page_size: u32,
    },
    /// Print the voter leaderboard
    Voters {
        #[arg(short, long, default_value = "1")]
        page: u32,
    },
    /// Show platform statistics
    Stats,
}

/// HTTP client speaking the server's negotiated wire formats
struct VoteTester {
    client: reqwest::Client,
    base_url: String,
    format: WireFormat,
    token: Option<String>,
    session_id: String,
}

impl VoteTester {
    fn new(base_url: &str, format: WireFormat, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            format,
            token,
            session_id: Uuid::new_v4().to_string(),
        })
    }

    async fn get<T: WireEntity>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .query(query)
            .header(ACCEPT, self.format.content_type())
            .send()
            .await
            .with_context(|| format!("GET {} failed", path))?;
        self.read(path, response).await
    }

    async fn post<B: WireEntity, T: WireEntity>(&self, path: &str, body: &B) -> Result<T> {
        let mut request = self
            .client
            .post(format!("{}{}", self.base_url, path))
            .header(CONTENT_TYPE, self.format.content_type())
            .header(ACCEPT, self.format.content_type())
            .body(encode(self.format, body)?);
        if let Some(token) = &self.token {
            request = request.header(AUTHORIZATION, format!("Bearer {}", token));
        }

        let response = request
            .send()
            .await
            .with_context(|| format!("POST {} failed", path))?;
        self.read(path, response).await
    }

    async fn read<T: WireEntity>(&self, path: &str, response: reqwest::Response) -> Result<T> {
        let status = response.status();
        let bytes = response.bytes().await?;

        if !status.is_success() {
            let message = decode::<ErrorBody>(self.format, &bytes)
                .map(|body| body.error)
                .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).into_owned());
            bail!("{} returned {}: {}", path, status, message);
        }

        decode(self.format, &bytes).map_err(|e| anyhow!("Failed to decode {} response: {}", path, e))
    }

    async fn health(&self) -> Result<HealthReport> {
        self.get("/health", &[]).await
    }

    async fn matchup(&self, category: Option<&str>) -> Result<Matchup> {
        let query: Vec<(&str, String)> = category
            .map(|c| vec![("category", c.to_string())])
            .unwrap_or_default();
        self.get("/api/vote/matchup", &query).await
    }

    async fn vote(&self, winner_id: i32, loser_id: i32) -> Result<VoteOutcome> {
        let request = VoteRequest {
            winner_id,
            loser_id,
            session_id: Some(self.session_id.clone()),
        };
        self.post("/api/vote", &request).await
    }

    async fn leaderboard(
        &self,
        category: Option<&str>,
        page: u32,
        page_size: u32,
    ) -> Result<LeaderboardPage> {
        let mut query = vec![("page", page.to_string()), ("page_size", page_size.to_string())];
        if let Some(category) = category {
            query.push(("category", category.to_string()));
        }
        self.get("/api/leaderboard", &query).await
    }

    async fn voters(&self, page: u32) -> Result<UserLeaderboardPage> {
        self.get("/api/leaderboard/users", &[("page", page.to_string())])
            .await
    }

    async fn stats(&self) -> Result<PlatformStats> {
        self.get("/api/stats", &[]).await
    }
}

fn print_outcome(outcome: &VoteOutcome) {
    println!(
        "  {} {} ({:+}) beat {} {} ({:+})",
        outcome.winner.name,
        outcome.winner.elo_rating,
        outcome.winner_delta,
        outcome.loser.name,
        outcome.loser.elo_rating,
        outcome.loser_delta
    );
}

async fn simulate(
    tester: &VoteTester,
    rounds: u32,
    category: Option<&str>,
    left_bias: f64,
) -> Result<()> {
    let left_bias = left_bias.clamp(0.0, 1.0);
    let mut rng = rand::thread_rng();
    let mut failed = 0;
    let start = Instant::now();

    for round in 1..=rounds {
        let result = async {
            let matchup = tester.matchup(category).await?;
            let (winner, loser) = if rng.gen_bool(left_bias) {
                (matchup.company1.id, matchup.company2.id)
            } else {
                (matchup.company2.id, matchup.company1.id)
            };
            tester.vote(winner, loser).await
        }
        .await;

        match result {
            Ok(outcome) => {
                print!("#{:<4}", round);
                print_outcome(&outcome);
            }
            Err(e) => {
                eprintln!("#{:<4} ❌ {}", round, e);
                failed += 1;
            }
        }
    }

    let elapsed = start.elapsed();
    println!(
        "\n📊 {} rounds in {:.2}s ({:.1} votes/s), {} failed",
        rounds,
        elapsed.as_secs_f64(),
        f64::from(rounds - failed) / elapsed.as_secs_f64().max(f64::EPSILON),
        failed
    );
    if failed > 0 {
        bail!("{} rounds failed", failed);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let format = if cli.binary {
        WireFormat::Binary
    } else {
        WireFormat::Json
    };

    println!("🔌 Talking to {} ({:?})", cli.base_url, format);
    let tester = VoteTester::new(
        &cli.base_url,
        format,
        cli.token.clone(),
        Duration::from_secs(cli.timeout),
    )?;

    match cli.command {
        Commands::Health => {
            let report = tester.health().await?;
            println!(
                "Health: {} (database {}), {} {}",
                report.status.as_str(),
                report.database,
                report.service,
                report.version
            );
        }

        Commands::Matchup { category } => {
            let matchup = tester.matchup(category.as_deref()).await?;
            println!(
                "  [{}] {} ({})  vs  [{}] {} ({})",
                matchup.company1.id,
                matchup.company1.name,
                matchup.company1.elo_rating,
                matchup.company2.id,
                matchup.company2.name,
                matchup.company2.elo_rating
            );
        }

        Commands::Vote { winner, loser } => match tester.vote(winner, loser).await {
            Ok(outcome) => {
                println!("✅ Vote recorded");
                print_outcome(&outcome);
            }
            Err(e) => {
                eprintln!("❌ Vote failed: {}", e);
                std::process::exit(1);
            }
        },

        Commands::Simulate {
            rounds,
            category,
            left_bias,
        } => {
            println!("🧪 Simulating {} votes...", rounds);
            if let Err(e) = simulate(&tester, rounds, category.as_deref(), left_bias).await {
                eprintln!("❌ {}", e);
                std::process::exit(1);
            }
        }

        Commands::Leaderboard {
            category,
            page,
            page_size,
        } => {
            let board = tester
                .leaderboard(category.as_deref(), page, page_size)
                .await?;
            println!(
                "🏆 Page {} ({} per page, {} companies)",
                board.page, board.page_size, board.total_count
            );
            for company in &board.companies {
                println!(
                    "  {:>4}. {:<30} {:>5}  {}W/{}L",
                    company.rank.unwrap_or_default(),
                    company.name,
                    company.elo_rating,
                    company.wins,
                    company.losses
                );
            }
        }

        Commands::Voters { page } => {
            let board = tester.voters(page).await?;
            println!("🗳️  {} identified voters", board.total_count);
            for user in &board.users {
                println!("  {:>4}. {:<30} {}", user.rank, user.user_id, user.total_votes);
            }
        }

        Commands::Stats => {
            let stats = tester.stats().await?;
            println!("📊 Platform Statistics:");
            println!("  Companies: {}", stats.total_companies);
            println!("  Votes: {}", stats.total_votes);
            println!("  Ratings: {}", stats.total_ratings);
            println!("  Comments: {}", stats.total_comments);
            println!("  Categories: {}", stats.categories.join(", "));
        }
    }

    Ok(())
}
