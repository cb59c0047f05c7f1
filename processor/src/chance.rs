use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Approve,
    Fail,
}

/// Source of uniform draws in `[0, 1)` used to simulate processor failures.
pub trait FailureSource: Send + Sync {
    fn draw(&self) -> f64;
}

pub fn decide(failure_rate: f64, draw: f64) -> Decision {
    if draw < failure_rate {
        Decision::Fail
    } else {
        Decision::Approve
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct ThreadRngSource;

impl FailureSource for ThreadRngSource {
    fn draw(&self) -> f64 {
        rand::thread_rng().r#gen::<f64>()
    }
}

pub struct SeededSource {
    rng: Mutex<StdRng>,
}

impl SeededSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl FailureSource for SeededSource {
    fn draw(&self) -> f64 {
        match self.rng.lock() {
            Ok(mut rng) => rng.r#gen::<f64>(),
            Err(poisoned) => poisoned.into_inner().r#gen::<f64>(),
        }
    }
}

/// Always returns the same draw.
#[derive(Debug, Clone, Copy)]
pub struct FixedSource(pub f64);

impl FailureSource for FixedSource {
    fn draw(&self) -> f64 {
        self.0
    }
}
