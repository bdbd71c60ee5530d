//! Title assignment contract.

use std::collections::HashMap;

use trend_types::merge_key;

use crate::{GroupingError, TitleGroup};

/// Check that `groups` assigns every title in `titles` exactly once.
///
/// Titles are compared by their normalized form so whitespace or case
/// drift in an echoed title is tolerated. A missing, duplicated or unknown
/// title, or a blank cluster name, is a contract violation.
pub fn validate_assignment(titles: &[String], groups: &[TitleGroup]) -> Result<(), GroupingError> {
    let mut seen: HashMap<String, bool> = titles.iter().map(|t| (merge_key(t), false)).collect();

    for group in groups {
        if group.cluster_name.trim().is_empty() {
            return Err(GroupingError::ContractViolation(
                "cluster with empty name".to_string(),
            ));
        }

        for title in &group.titles {
            match seen.get_mut(&merge_key(title)) {
                None => {
                    return Err(GroupingError::ContractViolation(format!(
                        "unknown title {title:?} in cluster {:?}",
                        group.cluster_name
                    )));
                }
                Some(true) => {
                    return Err(GroupingError::ContractViolation(format!(
                        "title {title:?} assigned more than once"
                    )));
                }
                Some(assigned) => *assigned = true,
            }
        }
    }

    let missing = seen.values().filter(|assigned| !**assigned).count();
    if missing > 0 {
        return Err(GroupingError::ContractViolation(format!(
            "{missing} of {} titles not assigned to any cluster",
            titles.len()
        )));
    }

    Ok(())
}
