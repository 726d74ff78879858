//! Yearly listing-page paths.
//!
//! The source site renamed its yearly listing pages after 2010: years up to
//! and including [`LEGACY_CUTOFF_YEAR`] live at `{prefix}{year}speech.htm`,
//! later years at `{prefix}{year}{suffix}` (`-speeches.htm` on the live site).

/// Last year published under the legacy page name.
pub const LEGACY_CUTOFF_YEAR: i32 = 2010;

/// Page-name suffix used for every year up to [`LEGACY_CUTOFF_YEAR`].
pub const LEGACY_SUFFIX: &str = "speech.htm";

/// First year the source site publishes a speech listing for.
pub const EARLIEST_YEAR: i32 = 1996;

/// Build the listing-page path for every year in `start_year..=end_year`.
///
/// The caller's `suffix` is ignored for legacy years. An inverted range
/// yields an empty list; range validation is the caller's job (see
/// [`crate::config::HarvestConfig::validate`]).
pub fn create_url_list(start_year: i32, end_year: i32, prefix: &str, suffix: &str) -> Vec<String> {
    (start_year..=end_year)
        .map(|year| {
            let this_suffix = if year <= LEGACY_CUTOFF_YEAR {
                LEGACY_SUFFIX
            } else {
                suffix
            };
            format!("{prefix}{year}{this_suffix}")
        })
        .collect()
}
