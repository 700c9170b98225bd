pub mod registry;
mod reconciler;

pub use reconciler::{StreamClassContext, error_policy, reconcile, run};
