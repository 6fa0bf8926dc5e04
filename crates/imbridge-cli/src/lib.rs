//! imbridge CLI: drives the read-cursor database facade from the command
//! line, with the store hosted by an in-process worker.

pub mod commands;
