//! `valida-recon` - enrollment cross-validation engine.
//!
//! Pure engine crate: receives three already-parsed tables (panel, educapi,
//! comercial), returns the flagged-inconsistency report. No CLI or IO
//! dependencies.

pub mod config;
pub mod engine;
pub mod error;
pub mod model;
pub mod resolve;
pub mod rules;
pub mod summary;

pub use config::{DuplicatePolicy, LabelPreset, ReconConfig, RulePreset};
pub use engine::reconcile;
pub use error::ReconError;
pub use model::{CellValue, InconsistencyRecord, Report, Row, Table, STATUS_COLUMN};
pub use resolve::{resolve, Field, ResolvedColumns, TableRole};
pub use rules::{Rule, RuleKind};
