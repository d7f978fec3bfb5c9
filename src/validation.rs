//! Validation of finished instances.
//!
//! Only the attributes every instance needs are checked here: a title and a
//! type classification. Anything else the rules produce is the target
//! platform's business.

use crate::error::{MappingError, MappingResult};
use crate::instance::Instance;

/// Validator for required instance attributes
#[derive(Debug)]
pub struct InstanceValidator;

impl InstanceValidator {
    /// Validate a fully built instance
    ///
    /// # Errors
    ///
    /// Returns [`MappingError::Validation`] naming the legacy identifiers if
    /// the title or the instance type is missing or empty.
    pub fn validate(instance: &Instance, legacy_ids: &[String]) -> MappingResult<()> {
        if instance.title().is_none() {
            return Err(MappingError::Validation(format!(
                "No title for {}",
                legacy_ids.join(", ")
            )));
        }
        if instance.instance_type_id().is_none() {
            return Err(MappingError::Validation(format!(
                "No Instance Type Id for {}",
                legacy_ids.join(", ")
            )));
        }
        Ok(())
    }
}
