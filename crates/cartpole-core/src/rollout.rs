//! Rollout driver: replay a trained agent against a live environment and
//! record every transition.

use crate::trace::{write_rollouts, Episode, Transition};
use crate::{Agent, Environment, Result};
use std::path::PathBuf;

/// Fallback per-episode step ceiling.
///
/// CartPole truncates itself at 500 steps; the ceiling only matters for
/// environments without their own truncation, which would otherwise hang
/// the driver.
pub const DEFAULT_MAX_STEPS: u32 = 100_000;

#[derive(Debug, Clone)]
pub struct RolloutOptions {
    pub num_episodes: u32,
    /// Tag every transition with its originating training iteration.
    pub training_iteration: Option<u32>,
    /// Step ceiling per episode; `None` trusts the environment to truncate.
    pub max_steps_per_episode: Option<u32>,
    /// Where to write the collection as pretty JSON (overwriting).
    pub save_path: Option<PathBuf>,
}

impl Default for RolloutOptions {
    fn default() -> Self {
        Self {
            num_episodes: 10,
            training_iteration: None,
            max_steps_per_episode: Some(DEFAULT_MAX_STEPS),
            save_path: None,
        }
    }
}

/// Run `num_episodes` inference-only episodes and return them in collection
/// order, episode ids starting at 1.
///
/// The environment handle is closed exactly once before returning, however
/// the episode loops exit.
pub fn collect_rollouts<A, E>(
    agent: &A,
    env: &mut E,
    options: &RolloutOptions,
) -> Result<Vec<Episode>>
where
    A: Agent + ?Sized,
    E: Environment + ?Sized,
{
    let result = run_episodes(agent, env, options);
    env.close();
    let episodes = result?;

    if let Some(path) = &options.save_path {
        write_rollouts(path, &episodes)?;
    }

    Ok(episodes)
}

fn run_episodes<A, E>(agent: &A, env: &mut E, options: &RolloutOptions) -> Result<Vec<Episode>>
where
    A: Agent + ?Sized,
    E: Environment + ?Sized,
{
    let mut episodes = Vec::with_capacity(options.num_episodes as usize);

    for index in 0..options.num_episodes {
        let mut observation = env.reset()?;
        let mut total_reward = 0.0_f32;
        let mut steps: Vec<Transition> = Vec::new();
        let mut done = false;

        while !done {
            let action = agent.predict(&observation);
            let outcome = env.step(&action)?;

            done = outcome.done();
            if let Some(cap) = options.max_steps_per_episode {
                if !done && steps.len() as u32 + 1 >= cap {
                    done = true;
                }
            }
            total_reward += outcome.reward;

            steps.push(Transition {
                observation,
                action,
                reward: outcome.reward,
                next_observation: outcome.observation.clone(),
                done,
                training_iteration: options.training_iteration,
            });

            observation = outcome.observation;
        }

        episodes.push(Episode {
            episode_id: index + 1,
            total_reward,
            steps,
        });
    }

    Ok(episodes)
}
