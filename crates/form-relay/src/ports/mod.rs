//! Ports: the seams between relay logic and the outside world.

pub mod outbound;

pub use outbound::{Clock, DeliveryChannel, ManualClock, SystemClock};
