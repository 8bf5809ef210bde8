//! Archiving tasks: lifecycle, typed job settings and persistence interface.

pub mod model;
pub mod settings;
pub mod status;
pub mod store;

pub use model::{Task, TaskArtifact, TaskUpdate, WebserviceToken};
pub use settings::{ImageOptimize, JobSettings, PaperFormat};
pub use status::{transition, TaskEvent, TaskStatus};
pub use store::TaskStore;
