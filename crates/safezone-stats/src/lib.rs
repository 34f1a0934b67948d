//! Statistics helpers for summarizing training runs.
//!
//! - [`descriptive`]: min / max / mean / median / standard deviation of a sample
//!
//! # Example
//!
//! ```
//! use safezone_stats::descriptive::DescriptiveStats;
//!
//! let fitness = [12.0, -3.0, 4.5];
//! let stats = DescriptiveStats::new(fitness).unwrap();
//! assert_eq!(stats.max, 12.0);
//! assert_eq!(stats.median, 4.5);
//! ```

pub mod descriptive;
