// crates/core/src/lib.rs
pub mod adapters;
pub mod error;
pub mod jobs;
pub mod layout;
pub mod source;

pub use adapters::{
    DemucsAdapter, DemucsConfig, ProcessAdapter, ProgressFn, YtDlpAdapter, YtDlpConfig,
};
pub use error::*;
pub use jobs::*;
pub use layout::DataLayout;
pub use source::*;
