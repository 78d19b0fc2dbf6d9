//! CartPole environment backend.
//!
//! Classic cart-pole balancing: a pole is hinged to a cart on a frictionless
//! track, the agent pushes the cart left or right, and the episode ends when
//! the pole falls over, the cart leaves the track, or 500 steps pass.
//! Matches the CartPole-v1 dynamics (Euler integration at 0.02s).

use cartpole_core::{Action, CoreError, Environment, Result, StepOutcome};
use rand::prelude::*;

const GRAVITY: f32 = 9.8;
const CART_MASS: f32 = 1.0;
const POLE_MASS: f32 = 0.1;
const POLE_LENGTH: f32 = 0.5;
const FORCE_MAG: f32 = 10.0;
const DT: f32 = 0.02;
const X_THRESHOLD: f32 = 2.4;
const THETA_THRESHOLD: f32 = 12.0 * std::f32::consts::PI / 180.0;
const MAX_STEPS: u32 = 500;
const INIT_RANGE: f32 = 0.05;

/// Construct an environment by id.
///
/// The registry knows `"CartPole-v1"`; anything else is an error surfaced to
/// the caller, which performs no validation of its own.
pub fn make(env_id: &str) -> Result<Box<dyn Environment>> {
    match env_id {
        "CartPole-v1" => Ok(Box::new(CartPole::new())),
        other => Err(CoreError::UnknownEnv(other.to_string())),
    }
}

/// Single cart-pole instance. Observation layout: `[x, x_dot, theta, theta_dot]`.
#[derive(Debug)]
pub struct CartPole {
    x: f32,
    x_dot: f32,
    theta: f32,
    theta_dot: f32,
    ticks: u32,
    max_steps: u32,
}

impl CartPole {
    #[must_use]
    pub fn new() -> Self {
        Self {
            x: 0.0,
            x_dot: 0.0,
            theta: 0.0,
            theta_dot: 0.0,
            ticks: 0,
            max_steps: MAX_STEPS,
        }
    }

    /// Override the truncation limit (tests, custom schedules).
    #[must_use]
    pub fn with_max_steps(max_steps: u32) -> Self {
        Self {
            max_steps,
            ..Self::new()
        }
    }

    fn observation(&self) -> Vec<f32> {
        vec![self.x, self.x_dot, self.theta, self.theta_dot]
    }

    fn force_for(&self, action: &Action) -> Result<f32> {
        match action {
            Action::Discrete(0) => Ok(-FORCE_MAG),
            Action::Discrete(1) => Ok(FORCE_MAG),
            Action::Discrete(other) => Err(CoreError::InvalidAction(format!(
                "CartPole-v1 expects action 0 or 1, got {other}"
            ))),
            Action::Continuous(_) => Err(CoreError::InvalidAction(
                "CartPole-v1 has a discrete action space".to_string(),
            )),
        }
    }
}

impl Default for CartPole {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for CartPole {
    fn reset(&mut self) -> Result<Vec<f32>> {
        let mut rng = thread_rng();
        self.x = rng.gen_range(-INIT_RANGE..INIT_RANGE);
        self.x_dot = rng.gen_range(-INIT_RANGE..INIT_RANGE);
        self.theta = rng.gen_range(-INIT_RANGE..INIT_RANGE);
        self.theta_dot = rng.gen_range(-INIT_RANGE..INIT_RANGE);
        self.ticks = 0;
        Ok(self.observation())
    }

    fn step(&mut self, action: &Action) -> Result<StepOutcome> {
        let force = self.force_for(action)?;

        let cos_theta = self.theta.cos();
        let sin_theta = self.theta.sin();

        let total_mass = CART_MASS + POLE_MASS;
        let pole_mass_length = POLE_MASS * POLE_LENGTH;

        let temp =
            (force + pole_mass_length * self.theta_dot * self.theta_dot * sin_theta) / total_mass;
        // Guard the denominator against cos rounding pushing it nonpositive.
        let denom = POLE_LENGTH * (4.0 / 3.0 - POLE_MASS * cos_theta * cos_theta / total_mass);
        let theta_acc = (GRAVITY * sin_theta - cos_theta * temp) / denom.max(1e-6);
        let x_acc = temp - pole_mass_length * theta_acc * cos_theta / total_mass;

        self.x += DT * self.x_dot;
        self.x_dot += DT * x_acc;
        self.theta += DT * self.theta_dot;
        self.theta_dot += DT * theta_acc;
        self.ticks += 1;

        let terminated = self.x.abs() > X_THRESHOLD || self.theta.abs() > THETA_THRESHOLD;
        let truncated = !terminated && self.ticks >= self.max_steps;

        Ok(StepOutcome {
            observation: self.observation(),
            reward: 1.0,
            terminated,
            truncated,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn make_knows_cartpole_and_rejects_others() {
        assert!(make("CartPole-v1").is_ok());
        // matches! avoids formatting the Ok arm, which is a trait object.
        assert!(matches!(
            make("LunarLander-v2"),
            Err(CoreError::UnknownEnv(_))
        ));
    }

    #[test]
    fn reset_starts_near_upright() {
        let mut env = CartPole::new();
        let obs = env.reset().expect("reset");
        assert_eq!(obs.len(), 4);
        assert!(obs.iter().all(|v| v.abs() <= INIT_RANGE));
    }

    #[test]
    fn rejects_out_of_range_and_continuous_actions() {
        let mut env = CartPole::new();
        env.reset().expect("reset");
        assert!(matches!(
            env.step(&Action::Discrete(2)),
            Err(CoreError::InvalidAction(_))
        ));
        assert!(matches!(
            env.step(&Action::Continuous(vec![0.5])),
            Err(CoreError::InvalidAction(_))
        ));
    }

    #[test]
    fn constant_push_terminates_within_the_step_limit() {
        let mut env = CartPole::new();
        env.reset().expect("reset");
        // Pushing one way forever must tip the pole or leave the track.
        for _ in 0..MAX_STEPS {
            let outcome = env.step(&Action::Discrete(1)).expect("step");
            if outcome.done() {
                assert!(outcome.terminated);
                return;
            }
        }
        panic!("constant push never terminated");
    }

    #[test]
    fn truncates_at_the_configured_limit() {
        let mut env = CartPole::with_max_steps(3);
        // Keep the pole perfectly upright so termination cannot fire first.
        env.x = 0.0;
        env.x_dot = 0.0;
        env.theta = 0.0;
        env.theta_dot = 0.0;

        let mut last = None;
        for _ in 0..3 {
            // Alternate pushes to stay near upright.
            let action = if env.ticks % 2 == 0 { 1 } else { 0 };
            last = Some(env.step(&Action::Discrete(action)).expect("step"));
        }
        let outcome = last.expect("stepped");
        assert!(outcome.truncated);
        assert!(!outcome.terminated);
    }

    #[test]
    fn reward_is_one_per_step() {
        let mut env = CartPole::new();
        env.reset().expect("reset");
        let outcome = env.step(&Action::Discrete(0)).expect("step");
        assert_eq!(outcome.reward, 1.0);
    }
}
