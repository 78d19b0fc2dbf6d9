//! CLI for cartpole-rl.
//!
//! Provides commands for training an agent, recording evaluation rollouts
//! from a checkpoint, doing both in one go, and viewing recorded rollouts in
//! the terminal.

use anyhow::{Context, Result};
use cartpole_agents::{AgentConfig, QTableAgent};
use cartpole_core::rollout::{collect_rollouts, RolloutOptions};
use cartpole_core::train::train;
use cartpole_viewer::ViewerData;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Train an agent on CartPole and save a checkpoint
    Train {
        /// Number of training iterations
        #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(1..))]
        iterations: u32,

        /// Directory receiving the checkpoint and metrics summary
        #[arg(long, default_value = ".")]
        save_dir: PathBuf,
    },
    /// Run evaluation rollouts from a checkpoint and save them as JSON
    Rollout {
        /// Directory containing a saved checkpoint
        #[arg(long)]
        checkpoint_dir: PathBuf,

        /// Number of episodes to record
        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
        episodes: u32,

        /// Output file for the rollout collection
        #[arg(long, default_value = "rollout_data.json")]
        output: PathBuf,
    },
    /// Train and immediately record rollouts, saving everything to the
    /// current directory
    Run {
        #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(1..))]
        iterations: u32,

        #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u32).range(1..))]
        episodes: u32,

        #[arg(long, default_value = "rollout_data.json")]
        output: PathBuf,
    },
    /// Render a recorded rollout file in the terminal
    View {
        /// Rollout file; falls back to rollout_data.json in the current
        /// directory
        #[arg(long)]
        input: Option<PathBuf>,

        /// Index of the episode to render (0-based)
        #[arg(long, default_value_t = 0)]
        episode: usize,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Train {
            iterations,
            save_dir,
        } => run_train(iterations, &save_dir),
        Commands::Rollout {
            checkpoint_dir,
            episodes,
            output,
        } => run_rollout(&checkpoint_dir, episodes, &output),
        Commands::Run {
            iterations,
            episodes,
            output,
        } => run_combined(iterations, episodes, &output),
        Commands::View { input, episode } => run_view(input.as_deref(), episode),
    }
}

fn run_train(iterations: u32, save_dir: &Path) -> Result<()> {
    let metrics = train(
        || AgentConfig::cartpole().build(),
        iterations,
        Some(save_dir),
        true,
    )
    .context("Training failed")?;
    println!("Training done. Mean eval return: {}", metrics.mean_eval_return);
    Ok(())
}

fn run_rollout(checkpoint_dir: &Path, episodes: u32, output: &Path) -> Result<()> {
    let agent = QTableAgent::from_checkpoint(checkpoint_dir).with_context(|| {
        format!(
            "Failed to load checkpoint from {}",
            checkpoint_dir.display()
        )
    })?;
    let mut env = cartpole_env::make(&agent.config().env_id)?;

    let options = RolloutOptions {
        num_episodes: episodes,
        save_path: Some(output.to_path_buf()),
        ..RolloutOptions::default()
    };
    let data = collect_rollouts(&agent, env.as_mut(), &options)?;

    println!("Saved {} episodes to {}", data.len(), display_path(output));
    Ok(())
}

fn run_combined(iterations: u32, episodes: u32, output: &Path) -> Result<()> {
    let save_dir = std::env::current_dir().context("Cannot resolve current directory")?;

    println!("Training agent...");
    let metrics = train(
        || AgentConfig::cartpole().build(),
        iterations,
        Some(&save_dir),
        true,
    )
    .context("Training failed")?;
    println!(
        "Training complete. Mean eval return: {}",
        metrics.mean_eval_return
    );

    let agent = QTableAgent::from_checkpoint(&save_dir)
        .context("Failed to reload the freshly saved checkpoint")?;
    let mut env = cartpole_env::make(&agent.config().env_id)?;

    println!("Collecting rollouts...");
    let options = RolloutOptions {
        num_episodes: episodes,
        save_path: Some(output.to_path_buf()),
        ..RolloutOptions::default()
    };
    collect_rollouts(&agent, env.as_mut(), &options)?;

    println!("Rollout data saved to {}", display_path(output));
    Ok(())
}

fn run_view(input: Option<&Path>, episode_index: usize) -> Result<()> {
    let fallback = Path::new(cartpole_viewer::DEFAULT_ROLLOUT_FILE);
    match cartpole_viewer::load(input, fallback) {
        ViewerData::Ready { episodes, warning } => {
            if let Some(warning) = warning {
                eprintln!("{warning}");
            }
            if episodes.len() > 1 {
                println!("Episodes:");
                for episode in &episodes {
                    println!("  {}", cartpole_viewer::episode_label(episode));
                }
                println!();
            }
            let index = episode_index.min(episodes.len() - 1);
            if index != episode_index {
                println!(
                    "Episode index {episode_index} out of range; showing episode {index}."
                );
            }
            print!("{}", cartpole_viewer::render_episode(&episodes[index]));
        }
        // Bad or missing input is shown, not raised: the viewer must not
        // crash on malformed uploads.
        ViewerData::Empty { prompt } => println!("{prompt}"),
        ViewerData::Failed { message } => eprintln!("{message}"),
    }
    Ok(())
}

fn display_path(path: &Path) -> String {
    path.canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .display()
        .to_string()
}
