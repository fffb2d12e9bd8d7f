//! Terminal console for Xcode builds: ingests driver events and presents
//! them as a live dashboard, a log stream and a sorted issues list.

pub mod app;
pub mod buffer;
pub mod classify;
pub mod command;
pub mod config;
pub mod context;
pub mod dashboard;
pub mod effects;
pub mod error;
pub mod event;
pub mod issues;
pub mod logging;
pub mod phase;
pub mod search;
pub mod tui;
