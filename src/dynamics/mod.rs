//! Secondary motion module
//!
//! A single damped spring and chains of springs for tails, ropes and hair.

mod spring;
mod spring_chain;

pub use spring::{SpringConfig, SpringDynamics, SpringState};
pub use spring_chain::{SpringChain, SpringChainConfig};
