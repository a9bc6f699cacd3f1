//! Pipeline steps for turning one XML document into a published bundle.
//!
//! Each submodule implements exactly one step so it can be tested against a
//! hand-built workspace without running the steps before it.
//!
//! ## Data Flow
//!
//! ```text
//! staging ──▶ stages ──▶ assemble ──▶ archive
//! (XML/)     (paginate,   (output/)    (<id>.zip)
//!             enrich)
//! ```
//!
//! 1. [`staging`]  — create the workspace skeleton and move the document in
//! 2. [`stages`]   — install the stage scripts and run them in order through
//!    a [`process::ProcessRunner`]; the first non-zero exit stops the job
//! 3. [`assemble`] — copy stage output and shared assets into `output/`,
//!    then rewrite line 2 of the menu data file ([`patch`])
//! 4. [`archive`]  — zip `output/` and publish it atomically
//!
//! [`fsops`] holds the copy helpers the steps share.

pub mod archive;
pub mod assemble;
pub mod fsops;
pub mod patch;
pub mod process;
pub mod stages;
pub mod staging;
