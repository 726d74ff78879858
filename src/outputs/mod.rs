//! Persistence of the harvested corpus.
//!
//! # Submodules
//!
//! - [`json`]: the corpus snapshot and the run report
//! - [`delimited`]: CSV export consumed by the scoring and plotting tools
//! - [`checkpoint`]: append-only log of fetched documents, used by `--resume`
//!
//! # Output Structure
//!
//! ```text
//! output_dir/
//! ├── speeches.json      # snapshot, one object per row
//! ├── speeches.csv       # date,speaker,title,link,text,status
//! ├── report.json        # counts and failure log
//! └── checkpoint.jsonl   # {"link": ..., "text": ...} per fetched document
//! ```

pub mod checkpoint;
pub mod delimited;
pub mod json;

pub const SNAPSHOT_FILE: &str = "speeches.json";
pub const CSV_FILE: &str = "speeches.csv";
pub const REPORT_FILE: &str = "report.json";
pub const CHECKPOINT_FILE: &str = "checkpoint.jsonl";
