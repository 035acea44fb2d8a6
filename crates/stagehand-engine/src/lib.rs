//! Stagehand engine crate.
//!
//! Real-time engine core: prioritized event dispatch, action-mapped input, a phased
//! asset manager with background loading, and a fixed-timestep stage that switches
//! between scenes and drives a fixed draw pipeline.

pub mod assets;
pub mod config;
pub mod core;
pub mod device;
pub mod events;
pub mod input;
pub mod logging;
pub mod render;
pub mod stage;
pub mod time;
pub mod window;
