//! repofuse - multi-repository integration pipeline
//!
//! Registers independent repositories, then runs one pipeline over them:
//! analyze each source tree, match the frontend's outbound calls against the
//! backend's routes, generate glue artifacts, validate the result and
//! optionally publish the artifacts back as pull requests against forks.
//!
//! # Core Concepts
//!
//! - **Repository summary**: language, framework, entry points, routes, call
//!   sites, env vars and dependencies extracted statically from a clone
//! - **Enrichment**: best-effort augmentation through a completion service;
//!   every stage falls back to its static result when enrichment fails
//! - **Job**: one pipeline invocation with an append-only log, run blocking,
//!   streamed, or in the background
//!
//! # Example Usage
//!
//! ```no_run
//! use repofuse::pipeline::{NoOpHandler, PipelineOptions};
//! use repofuse::RepofuseConfig;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let driver = RepofuseConfig::default().build_driver()?;
//! let urls = vec![
//!     "https://github.com/acme/web".to_string(),
//!     "https://github.com/acme/api".to_string(),
//! ];
//! let result = driver
//!     .run(&urls, PipelineOptions::default(), &NoOpHandler)
//!     .await
//!     .map_err(|failure| failure.error)?;
//! println!("{}", result.report.summary);
//! # Ok(())
//! # }
//! ```
//!
//! # Project Structure
//!
//! - [`analysis`]: repository analyzer
//! - [`matching`]: interface matcher
//! - [`generate`]: artifact generator and integration plan
//! - [`validation`]: validator, report and effort metrics
//! - [`publish`]: fork, branch, commit and pull-request publisher
//! - [`pipeline`]: driver, jobs, stores and scheduler
//! - [`server`]: HTTP surface

pub mod analysis;
pub mod cli;
pub mod config;
pub mod enrichment;
pub mod generate;
pub mod hosting;
pub mod llm;
pub mod matching;
pub mod pipeline;
pub mod publish;
pub mod server;
pub mod util;
pub mod validation;

pub use analysis::{AnalysisError, RepoSummary, RepositoryAnalyzer};
pub use config::{ConfigError, RepofuseConfig};
pub use enrichment::{with_enrichment, Enricher};
pub use matching::MatchResult;
pub use pipeline::{Job, JobStatus, PipelineDriver, PipelineError, PipelineResult, Scheduler};
pub use publish::{PublishError, PublishResult, Publisher};
pub use util::{init_default, init_from_env, init_logging, LoggingConfig};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name
pub const NAME: &str = env!("CARGO_PKG_NAME");
