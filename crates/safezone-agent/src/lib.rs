//! Agent-side building blocks: what the agent sees, what it wants, what it remembers.
//!
//! 1. **State abstraction** ([`state_key`]) - Folds an observation into one of
//!    288 symbolic keys.
//! 2. **Reward shaping** ([`reward`]) - Scores a single transition.
//! 3. **Policy** ([`policy`]) - Remembers, per key, the best action seen so far.
//!
//! # Architecture
//!
//! ```text
//! Observation ──encode──▶ StateKey ──lookup──▶ Action ──step──▶ Observation'
//!                            ▲                                      │
//!                            └──────── update(key, action, reward) ◀┘
//!                                          (RewardModel)
//! ```
//!
//! The training loop that drives these pieces lives in `safezone-training`.

pub mod policy;
pub mod reward;
pub mod state_key;
