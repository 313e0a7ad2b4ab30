//! # Taskcoach
//!
//! A terminal task tracker with an AI workload coach. Tasks live in columns
//! (to do, in progress, done), belong to projects, and carry a priority and the
//! minutes spent on them. The dashboard aggregates them; the coach sends a
//! summary to a generative-text model and shows its advice.
//!
//! ## Usage
//!
//! ```bash
//! taskcoach login ada@example.com
//! taskcoach add "Write report" --project Work --priority high
//! taskcoach log 3f2a 45
//! taskcoach status 3f2a done
//! taskcoach dashboard
//! taskcoach coach
//! taskcoach            # interactive UI
//! ```
//!
//! ## Data Storage
//!
//! `tasks.json`, `projects.json` and `user.json` are kept in the local data
//! directory (`~/.local/share/taskcoach` on Linux). Override it with
//! `TASKCOACH_DATA_DIR` or `--data-dir`. The coach reads its key from
//! `GEMINI_API_KEY` (or `API_KEY`); a `.env` file in the working directory is
//! honoured.

pub mod advisor;
pub mod commands;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod repository;
pub mod session;
pub mod stats;
pub mod storage;
pub mod tui;
