pub mod aggregate;
pub mod dispatch;
pub mod judge;

pub use dispatch::dispatch;
