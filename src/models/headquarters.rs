// src/models/headquarters.rs

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Represents a document in the 'headquarters' collection, keyed by a
/// user-assigned code rather than a generated id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Headquarters {
    #[serde(default)]
    pub code: String,
    pub name: String,
}

/// Headquarters names arrive with spelling variants ("浜松本部", "浜松",
/// "浜松採点"). Equivalence rule: strip the 採点/本部 suffix tokens and trim
/// whitespace. Access-control comparisons must go through this function.
pub fn normalize_hq_name(name: &str) -> String {
    name.trim()
        .trim_end_matches("採点")
        .trim_end_matches("本部")
        .trim()
        .to_string()
}

/// True when two headquarters names refer to the same headquarters under the
/// normalization rule.
pub fn same_headquarters(a: &str, b: &str) -> bool {
    let a = normalize_hq_name(a);
    !a.is_empty() && a == normalize_hq_name(b)
}

/// DTO for registering a headquarters (admin).
#[derive(Debug, Deserialize, Validate)]
pub struct CreateHeadquartersRequest {
    #[validate(length(min = 1, max = 20))]
    pub code: String,
    #[validate(length(min = 1, max = 100))]
    pub name: String,
}
