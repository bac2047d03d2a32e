//! repcoach daemon - exercise registry, detector workers and room broadcast
//!
//! This crate provides the runtime pieces of the daemon:
//! - `registry` - Actor owning one `ExerciseState` per exercise key
//! - `worker` - One detector task per exercise, fed by `FeedRouter`
//! - `rooms` - Subscriber registry and room membership
//! - `dispatcher` - Periodic fan-out of registry state to rooms
//! - `server` - Unix socket server for feeds and subscribers
//! - `config` - TOML configuration
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                         repcoachd                               │
//! ├─────────────────────────────────────────────────────────────────┤
//! │                                                                 │
//! │  ┌─────────────────┐ frames ┌────────────────┐  apply           │
//! │  │  DaemonServer   │───────▶│ ExerciseWorker │─────────┐        │
//! │  │ (Unix Socket)   │        │ (per exercise) │         ▼        │
//! │  └────────┬────────┘        └────────────────┘ ┌──────────────┐ │
//! │           │ join/leave                         │RegistryActor │ │
//! │           ▼                                    └──────┬───────┘ │
//! │  ┌─────────────────┐   publish   ┌─────────────────┐  │ drain   │
//! │  │   RoomManager   │◀────────────│BroadcastDispatch│◀─┘         │
//! │  └─────────────────┘             └─────────────────┘            │
//! │                                                                 │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows a panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Channel operations handle closure gracefully

pub mod config;
pub mod dispatcher;
pub mod registry;
pub mod rooms;
pub mod server;
pub mod worker;
