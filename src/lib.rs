#![warn(clippy::pedantic, clippy::nursery, clippy::cargo)]
#![deny(clippy::use_self, rust_2018_idioms)]
#![allow(clippy::multiple_crate_versions, clippy::module_name_repetitions)]

//! An alarm clock that only stops ringing once you proved you're awake.
//!
//! The engine ([`scheduler`], [`store`], [`lifecycle`], [`challenge`]) is
//! driven by explicit timestamps and never reads the wall clock itself, the
//! terminal host in [`clock`] does that.

pub mod alarm;
pub mod audio;
pub mod challenge;
pub mod clock;
pub mod communication;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod occurrence;
pub mod quotes;
pub mod reminder;
pub mod scanner;
pub mod scheduler;
pub mod storage;
pub mod store;
pub mod weather;

pub use alarm::{Alarm, AlarmId, AlarmPatch, DaySet, Difficulty, NewAlarm, SoundSource, TaskKind};
pub use clock::Clock;
pub use config::Config;
pub use error::{ClockError, Result};
pub use scheduler::{Event, Scheduler};
pub use storage::{FileStore, KeyValueStore, MemoryStore};
