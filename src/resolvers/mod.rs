//! Derived field resolvers.
//!
//! These run after the rule-driven field pass and fill the attributes the
//! rule table cannot express on its own:
//!
//! - [`formats`]: instance format ids from paired 337/338 fields
//! - [`issuance`]: mode of issuance from the leader
//! - [`languages`]: language codes from 041 or 008
//! - [`hrid`]: human-readable identifiers from the numbering sequence

pub mod formats;
pub mod hrid;
pub mod issuance;
pub mod languages;

pub use formats::resolve_instance_format_ids;
pub use hrid::{assign_hrid, NumberingSequence};
pub use issuance::IssuanceResolver;
pub use languages::{extract_language_candidates, filter_languages, normalize_language_value};
