//! Train a fresh agent for a handful of iterations and print the summary.
//!
//! Run with: cargo run -p cartpole-agents --example train_quick

use cartpole_agents::AgentConfig;
use cartpole_core::train::train;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let summary = train(|| AgentConfig::cartpole().build(), 5, None, true)?;
    println!("Mean eval return after 5 iterations: {}", summary.mean_eval_return);
    Ok(())
}
