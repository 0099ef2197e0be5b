//! Bulk tile prefetching.
//!
//! ```ignore
//! use tileproxy::prefetch::{split_provider_list, PrefetchScheduler};
//!
//! let providers = split_provider_list("osm, sea");
//! let report = PrefetchScheduler::new(service, 16).run(&providers, 6).await;
//! println!("{report}");
//! ```

mod config;
mod scheduler;

pub use config::{
    split_provider_list, PrefetchConfig, DEFAULT_PREFETCH_WORKERS, PREFETCH_QUEUE_CAPACITY,
};
pub use scheduler::{PrefetchReport, PrefetchScheduler};
