//! # count-filter-actor
//!
//! An async front end for [`count_filter::CountFilter`].
//!
//! The filter itself is thread-safe, but async crawlers often prefer a single
//! owner that sees every event in order. This crate runs the filter on one
//! Tokio task and hands out cloneable handles:
//!
//! ```text
//! ┌──────────┐ ┌──────────┐ ┌──────────┐
//! │ Worker 1 │ │ Worker 2 │ │ Worker N │
//! └────┬─────┘ └────┬─────┘ └────┬─────┘
//!      └────────────┼────────────┘
//!             ┌─────▼─────┐
//!             │   Actor   │
//!             └─────┬─────┘
//!             ┌─────▼─────┐
//!             │CountFilter│
//!             └───────────┘
//! ```
//!
//! ## Usage
//!
//! ```
//! use count_filter::{CountFilter, Decision, LimitConfig};
//! use count_filter_actor::CountFilterActor;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> anyhow::Result<()> {
//! let filter = CountFilter::builder()
//!     .limits(LimitConfig::new().with_page_count(1000))
//!     .build();
//! let handle = CountFilterActor::spawn(10_000, filter);
//!
//! handle.page_fetched("https://example.com/").await?;
//! if handle.should_allow("https://example.com/next").await? == Decision::Allow {
//!     // dispatch the request
//! }
//! # Ok(())
//! # }
//! ```

pub mod actor;


pub use actor::{CountFilterActor, CountFilterHandle, CountFilterMessage};
