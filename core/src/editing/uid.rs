use uuid::Uuid;

/// Root for UIDs derived from a UUID (DICOM PS3.5 B.2)
pub const UUID_UID_ROOT: &str = "2.25";

/// Maximum length of a DICOM UID
pub const MAX_UID_LENGTH: usize = 64;

/// Generates a new globally unique DICOM UID
///
/// The UID is `2.25.` followed by the decimal value of a random UUID, so it
/// never exceeds 44 characters.
///
/// # Example
///
/// ```
/// use retag_core::{generate_uid, is_valid_uid};
///
/// let uid = generate_uid();
/// assert!(uid.starts_with("2.25."));
/// assert!(is_valid_uid(&uid));
/// ```
pub fn generate_uid() -> String {
    format!("{}.{}", UUID_UID_ROOT, Uuid::new_v4().as_u128())
}

/// Checks UID syntax: dot separated numeric components without leading
/// zeros, at most 64 characters
pub fn is_valid_uid(uid: &str) -> bool {
    !uid.is_empty()
        && uid.len() <= MAX_UID_LENGTH
        && uid.split('.').all(|component| {
            !component.is_empty()
                && component.chars().all(|c| c.is_ascii_digit())
                && (component == "0" || !component.starts_with('0'))
        })
}
