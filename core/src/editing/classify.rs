use crate::types::{SeriesRule, SeriesType};

/// Finds the rule deciding the series of a file
///
/// # Algorithm
///
/// 1. Lowercase the file name, then check every skip (localizer) rule;
///    the first hit short-circuits
/// 2. Otherwise the LAST matching non-skip rule wins
/// 3. If the file name matches nothing and a containing folder is given,
///    repeat steps 1-2 on the folder name
///
/// Keywords are plain substrings, compared case-insensitively.
pub fn match_rule<'a>(
    file_name: &str,
    folder: Option<&str>,
    rules: &'a [SeriesRule],
) -> Option<&'a SeriesRule> {
    match_name(file_name, rules).or_else(|| folder.and_then(|f| match_name(f, rules)))
}

/// Classifies a file by name into a [`SeriesType`]
///
/// # Example
///
/// ```
/// use retag_core::{classify, RetagConfig, SeriesType};
///
/// let rules = RetagConfig::default().series_classification_rules;
/// assert_eq!(classify("brain_T1_001.dcm", None, &rules), SeriesType::T1);
/// assert_eq!(classify("Brain_Localizer_001.dcm", None, &rules), SeriesType::Localizer);
/// assert_eq!(classify("brain_dwi_001.dcm", None, &rules), SeriesType::Unclassified);
/// ```
pub fn classify(file_name: &str, folder: Option<&str>, rules: &[SeriesRule]) -> SeriesType {
    match_rule(file_name, folder, rules)
        .map(|rule| rule.classification)
        .unwrap_or(SeriesType::Unclassified)
}

fn match_name<'a>(name: &str, rules: &'a [SeriesRule]) -> Option<&'a SeriesRule> {
    let name = name.to_lowercase();
    let contains = |rule: &SeriesRule| name.contains(&rule.keyword.to_lowercase());

    if let Some(skip) = rules
        .iter()
        .find(|rule| rule.classification.is_skip() && contains(rule))
    {
        return Some(skip);
    }

    rules
        .iter()
        .rev()
        .find(|rule| !rule.classification.is_skip() && contains(rule))
}
