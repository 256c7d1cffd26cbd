#![allow(unused_assignments)] // thiserror/miette proc macros trigger false positives

pub mod cli;
pub mod cluster;
pub mod config;
pub mod control;
pub mod error;
pub mod lifecycle;
pub mod locator;
pub mod logging;
pub mod outcome;
pub mod retry;
pub mod router;
pub mod session;
pub mod status;
pub mod telegram;
