mod filter;
mod processor;

pub use filter::{QualifiedRelease, Rejection, qualify, should_process};
pub use processor::{DEPENDENCY_HOST, ReleaseProcessor, dependency_name};
