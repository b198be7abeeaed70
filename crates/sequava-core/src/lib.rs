//! `sequava-core` — task compilation engine for a pump/valve platform.
//!
//! Everything here is synchronous and side-effect-free: a [`model::Task`]
//! comes in from the editor, [`validate::validate`] enumerates structural
//! errors and conflict warnings, [`duration::task_duration`] estimates the
//! wall-clock budget, and [`timeline::compile`] flattens the tree into an
//! offset-ordered [`timeline::Timeline`] for the dispatch runtime.

pub mod device;
pub mod duration;
pub mod error;
pub mod model;
pub mod policy;
pub mod timeline;
pub mod validate;

pub use error::{CoreError, Result};
