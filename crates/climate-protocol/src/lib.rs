//! Wire format of the realtime notification channel.

pub mod events;
pub mod frames;

pub use frames::EventFrame;
