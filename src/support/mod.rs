pub mod flow;
pub mod lock;
pub mod queue;
