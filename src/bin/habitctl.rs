//! Terminal client for the habit tracker store.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use habit_tracker::View;
use habit_tracker::client::render::{render_stats, render_table, status_line};
use habit_tracker::client::{Dashboard, DashboardEvent, FileCache, StoreClient, SyncStatus};
use std::io::BufRead;
use std::path::PathBuf;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(name = "habitctl", about = "Track daily habits against a habit_tracker store")]
struct Cli {
    /// Base URL of the store.
    #[arg(long, env = "HABIT_SERVER", default_value = "http://127.0.0.1:8080")]
    server: String,

    /// Directory for the local snapshot cache.
    #[arg(long, env = "HABIT_CACHE_DIR", default_value = ".habit-cache")]
    cache_dir: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print the merged table.
    Show {
        #[arg(long)]
        week: Option<usize>,
    },
    /// Advance one cell: pending -> completed -> missed -> pending.
    Toggle {
        habit: String,
        date: String,
        #[arg(long)]
        week: Option<usize>,
    },
    /// Print table-wide statistics from the store.
    Stats,
    Add {
        name: String,
        #[arg(long)]
        emoji: Option<String>,
    },
    Edit {
        old_name: String,
        new_name: String,
        #[arg(long)]
        emoji: Option<String>,
    },
    Delete {
        name: String,
    },
    /// Refresh periodically; read `<habit>\t<date>` lines from stdin to toggle.
    Watch {
        #[arg(long)]
        week: Option<usize>,
        #[arg(long, default_value_t = 60)]
        interval: u64,
    },
}

const UNCONFIRMED: &str = "changes are saved locally and not confirmed by the store";

fn view_of(week: Option<usize>) -> View {
    week.map_or(View::All, View::Week)
}

#[tokio::main]
async fn main() -> Result<()> {
    fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("warn".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let api = StoreClient::new(cli.server.as_str()).context("failed to build HTTP client")?;
    let cache = FileCache::new(&cli.cache_dir);

    match cli.command {
        Command::Show { week } => {
            let mut dashboard = Dashboard::new(api, cache, view_of(week)).await;
            dashboard.load().await?;
            print_dashboard(&dashboard);
        }
        Command::Toggle { habit, date, week } => {
            let mut dashboard = Dashboard::new(api, cache, view_of(week)).await;
            dashboard.load().await?;
            dashboard.toggle(&habit, &date).await?;
            print_dashboard(&dashboard);
            dashboard.flush().await;
            println!("{}", status_line(&dashboard.sync_status()));
        }
        Command::Stats => {
            let stats = api
                .statistics()
                .await
                .with_context(|| format!("store at {} did not answer", api.base_url()))?;
            println!("{}", render_stats(&stats));
        }
        Command::Add { name, emoji } => {
            let mut dashboard = Dashboard::new(api, cache, View::All).await;
            let response = dashboard.add_habit(&name, emoji.as_deref()).await?;
            println!("{}", response.message);
        }
        Command::Edit {
            old_name,
            new_name,
            emoji,
        } => {
            let mut dashboard = Dashboard::new(api, cache, View::All).await;
            let response = dashboard
                .edit_habit(&old_name, &new_name, emoji.as_deref())
                .await?;
            println!("{}", response.message);
        }
        Command::Delete { name } => {
            let mut dashboard = Dashboard::new(api, cache, View::All).await;
            let response = dashboard.delete_habit(&name).await?;
            println!("{}", response.message);
        }
        Command::Watch { week, interval } => {
            if interval == 0 {
                bail!("--interval must be at least 1 second");
            }
            let dashboard = Dashboard::new(api, cache, view_of(week)).await;
            let (events, rx) = mpsc::channel(32);
            spawn_stdin_reader(events);
            let dashboard = dashboard
                .run(rx, Duration::from_secs(interval), print_dashboard)
                .await;
            let status = dashboard.sync_status();
            println!("{}", status_line(&status));
            if matches!(status, SyncStatus::Failed { .. }) {
                println!("{UNCONFIRMED}");
            }
        }
    }
    Ok(())
}

fn print_dashboard(dashboard: &Dashboard<FileCache>) {
    print!(
        "{}",
        render_table(
            dashboard.snapshot(),
            &dashboard.local_stats(),
            &dashboard.sync_status()
        )
    );
    if matches!(dashboard.sync_status(), SyncStatus::Failed { .. }) {
        println!("{UNCONFIRMED}");
    }
}

/// Forward `<habit>\t<date>` lines as toggles; `q` or EOF shuts down.
fn spawn_stdin_reader(events: mpsc::Sender<DashboardEvent>) {
    std::thread::spawn(move || {
        let stdin = std::io::stdin();
        for line in stdin.lock().lines() {
            let Ok(line) = line else { break };
            let line = line.trim();
            let event = match line {
                "" => continue,
                "q" | "quit" => DashboardEvent::Shutdown,
                "r" | "refresh" => DashboardEvent::Refresh,
                _ => match line.split_once('\t') {
                    Some((habit, date)) => DashboardEvent::Toggle {
                        habit: habit.trim().to_string(),
                        date: date.trim().to_string(),
                    },
                    None => {
                        eprintln!("expected <habit>\\t<date>, 'r' or 'q'");
                        continue;
                    }
                },
            };
            if events.blocking_send(event).is_err() {
                break;
            }
        }
        let _ = events.blocking_send(DashboardEvent::Shutdown);
    });
}
