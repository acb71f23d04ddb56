//! Urban Traffic Simulation Engine
//!
//! A multi-modal traffic simulator over a weighted road graph. The engine is
//! single-threaded and cooperative: all mutation happens inside `tick` and
//! the command methods, so a transport layer serialises access with one
//! `Mutex<SimEngine>` and reads snapshot copies between ticks.

pub mod simulation;
