//! Scrapers for the source site's speech pages.
//!
//! Harvesting is a two-phase pattern:
//!
//! 1. **Indexing**: [`urls`] names the yearly listing pages, [`listing`]
//!    scrapes each into date/speaker/title/link lists
//! 2. **Fetching**: [`document`] downloads one speech and flattens its
//!    paragraphs into a single string
//!
//! | Module | Input | Output |
//! |--------|-------|--------|
//! | [`urls`] | year range, prefix, suffix | listing paths |
//! | [`listing`] | one listing path | [`listing::ListingPage`] |
//! | [`document`] | one document link | speech text |

pub mod document;
pub mod listing;
pub mod urls;
