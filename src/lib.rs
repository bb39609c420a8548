//! # slot-finder
//!
//! Placement optimizer for school lesson groups. Given a student, it recommends
//! groups they can join: directly where a seat is free, or by moving one or more
//! current occupants to other groups to make room.
//!
//! - [`model`]: students, enrollments, groups and time slots
//! - [`store`]: the data-access traits and an in-memory implementation
//! - [`schedule`]: availability, scoring, search and ranking
//! - [`web`]: actix-web HTTP adapter

pub mod config;
pub mod demo;
pub mod display;
pub mod error;
pub mod model;
pub mod schedule;
pub mod store;
pub mod web;

pub use config::SlotFinderConfig;
pub use error::{SlotFinderError, SlotFinderResult, StoreError};
pub use schedule::{find_placements, PlacementReport, PlacementRequest, Recommendation};
