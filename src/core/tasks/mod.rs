// src/core/tasks/mod.rs

//! Background tasks spawned alongside the accept loop.

pub mod prune;
