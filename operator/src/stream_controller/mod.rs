pub mod factory;
pub mod fsm;
mod reconciler;

pub use factory::{ControllerExit, UnmanagedController, build};
pub use reconciler::ReconcilerContext;
