//! Five-phase schedule allocator.
//!
//! Friday pre-allocation, quota and sequence generation, greedy day-by-day
//! placement, backfilling through swaps and Majorelle Friday rebalancing.
//! The allocator owns the schedule for the duration of one run; the
//! validator and the Friday manager are consulted at every decision.

mod core;
mod fridays;
mod state;
mod validator;

pub use core::{Phase, ScheduleAllocator};
pub use fridays::{split_into_periods, FridayManager};
pub use state::{DaySlots, Schedule};
pub use validator::ConstraintValidator;
