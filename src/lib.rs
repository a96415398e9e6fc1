//! # Powerlog Library
//!
//! Periodic electrical metering with rolling daily/monthly CSV logs.
//!
//! This library provides the core functionality for sampling
//! per-channel current readings at a fixed cadence, deriving power and
//! tariff cost, rotating log files at calendar boundaries, and
//! archiving completed files offsite.

pub mod acquisition;
pub mod archive;
pub mod config;
pub mod error;
pub mod logfile;
pub mod reading;
pub mod session;
pub mod sink;
pub mod tariff;
