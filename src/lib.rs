//! EV charging detour controller
//!
//! An online controller that runs alongside a step-driven traffic simulation
//! and routes electric vehicles low on charge through a charging station,
//! plus a small in-process simulation to run it against.

pub mod controller;
pub mod simulation;
