//! Reference ICD-10 code lists for the NAFL progression study.

/// Anchor diagnosis: nonalcoholic fatty liver disease.
pub const NAFL_ANCHOR_CODE: &str = "K76.0";

/// MASH or worse: fibrosis, cirrhosis, hepatic failure and liver cancers.
pub const PROGRESSION_CODES: &[&str] = &[
    "K75.81", "K75.89", "K72.00", "K72.01", "K72.10", "K72.11", "K72.90", "K72.91", "K74.0",
    "K74.00", "K74.01", "K74.02", "K74.1", "K74.2", "K74.60", "K74.69", "C22.0", "C22.1", "C22.2",
    "C22.3", "C22.4", "C22.7", "C22.8", "C22.9",
];

/// Liver codes that are not progression events but still describe the
/// outcome; stripped from the predictors together with `PROGRESSION_CODES`.
pub const ADDITIONAL_LIVER_CODES: &[&str] = &[
    "K76.1", "K76.2", "K76.3", "K76.4", "K76.6", "K76.7", "K76.81", "K76.82", "K76.89", "K76.9",
    "K77", "C18.3", "C78.7", "C7B.02", "D37.6",
];

pub fn progression_codes() -> Vec<String> {
    PROGRESSION_CODES.iter().map(|code| (*code).to_string()).collect()
}

/// The full superset: progression codes followed by the additional liver codes.
pub fn all_liver_codes() -> Vec<String> {
    PROGRESSION_CODES
        .iter()
        .chain(ADDITIONAL_LIVER_CODES)
        .map(|code| (*code).to_string())
        .collect()
}
