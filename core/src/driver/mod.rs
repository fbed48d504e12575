//! Bounded-concurrency request driver
//!
//! The driver runs one benchmark: a single control thread pulls examples,
//! waits for a free slot, encodes and dispatches each request, and finally
//! blocks until every outcome has been recorded.
//!
//! Completions may arrive on any thread the transport chooses. All shared
//! state lives in the [`ResultAggregator`]:
//!
//! 1. `admit` blocks while `in_flight == concurrency_limit`
//! 2. each completion records error (if any), completion, then release
//! 3. `wait_for_all` blocks until `completed == total`
//!
//! # Example
//!
//! ```ignore
//! use inferbench_core::{DriverBuilder, TransportHandle};
//!
//! let driver = DriverBuilder::new()
//!     .num_tests(1000)
//!     .concurrency(16)
//!     .codec(codec)
//!     .build()?;
//!
//! let summary = driver.run(&mut dataset, &TransportHandle::Callback(transport))?;
//! println!("error rate {:.3} in {:.2}s", summary.error_rate, summary.elapsed_secs());
//! ```

mod aggregator;
mod builder;
mod completion;
mod executor;

pub use aggregator::{AggregateCounters, ResultAggregator};
pub use builder::DriverBuilder;
pub use executor::{BenchmarkDriver, TransportHandle};
