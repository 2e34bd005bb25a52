pub mod broker;
pub mod dispatch;
pub mod fees;
pub mod queue;
pub mod sweeps;
pub mod trips;
