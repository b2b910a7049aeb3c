//! Core types and page scraping for EVN hydropower reservoir readings.
//!
//! The portal renders one table of reservoir readings per requested hour.
//! [`collect::RangeCollector`] walks an [`hour_range::HourRange`], asking a
//! [`fetch::SampleFetcher`] for one [`sample::Sample`] per hour through a
//! [`render::RenderClient`] session.

pub mod collect;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod hour_range;
pub mod render;
pub mod report;
pub mod reservoir;
pub mod sample;
