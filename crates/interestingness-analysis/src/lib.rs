//! Interestingness analysis of recorded reinforcement-learning rollouts
//!
//! This crate turns a flat sequence of agent-environment interaction records
//! into "interestingness elements": timesteps flagged as noteworthy by some
//! criterion, together with the plots and tables that explain them.
//!
//! # Overview
//!
//! An analysis run goes through the same steps for every criterion:
//!
//! 1. **Segment** ([`episode::Episodes`]): recover episode boundaries from the
//!    `new_episode` markers of the [`record::InteractionRecord`]s
//! 2. **Derive**: compute one scalar per timestep (the criterion)
//! 3. **Detect** ([`threshold::Detection`]): place high/low thresholds over the
//!    whole series and collect the outliers
//! 4. **Report** ([`render::ReportRenderer`], [`export`]): draw timeline,
//!    per-episode and bar-chart figures, and write CSV tables
//! 5. **Persist** ([`engine::PersistentAnalysis`], [`archive`]): archive the
//!    derived state without the raw trace
//!
//! The contract shared by all criteria is the [`engine::Analysis`] trait; the
//! concrete criteria live in [`analyses`]. [`batch::run_batch`] runs several
//! analyses concurrently on a bounded [`pool::WorkerPool`].
//!
//! # Examples
//!
//! ```no_run
//! use std::path::Path;
//!
//! use interestingness_analysis::{
//!     analyses::ValueAnalysis,
//!     config::{AnalysisConfiguration, AnalysisParams},
//!     engine::{Analysis as _, PersistentAnalysis as _},
//!     record::{InteractionRecord, Records},
//! };
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//!
//! let records: Vec<InteractionRecord> = serde_json::from_str(&std::fs::read_to_string("rollout.json")?)?;
//! let records = Records::from(records);
//! let config = AnalysisConfiguration::new(AnalysisParams::default())?;
//!
//! let mut analysis = ValueAnalysis::new(records, config, "png");
//! analysis.analyze(Path::new("out/value"))?;
//! let element = analysis.get_element_time(42)?;
//! println!("t=42: {} ({})", element.name, element.value);
//!
//! analysis.save(Path::new("out/value.ixa"))?;
//! # Ok(())
//! # }
//! ```

pub mod analyses;
pub mod archive;
pub mod batch;
pub mod config;
pub mod engine;
pub mod episode;
pub mod error;
pub mod export;
pub mod pool;
pub mod record;
pub mod render;
pub mod threshold;
