//! Hardware-independent core library for the GNSS tracker
//!
//! This crate contains all platform-agnostic logic for the tracker: the
//! main controller that wires peripheral events together, the current
//! conditions aggregate, display rendering for the e-paper panel, record
//! persistence, and the seam traits that board firmware implements.
//!
//! It is `#![no_std]` with `extern crate alloc` so it compiles on both
//! embedded targets and desktop hosts (for the simulator and tests).

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod app_state;
pub mod cadence;
pub mod clock;
pub mod config;
pub mod display;
pub mod gnss;
pub mod hardware;
pub mod model;
pub mod sensors;
pub mod storage;
pub mod tracker;
pub mod units;
