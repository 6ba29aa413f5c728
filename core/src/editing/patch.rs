use crate::error::FieldWriteError;
use crate::types::TagPatch;
use dicom_core::dictionary::DataDictionary;
use dicom_core::{DataElement, PrimitiveValue, Tag, VR};
use dicom_dictionary_std::StandardDataDictionary;
use dicom_object::InMemDicomObject;
use log::{debug, warn};
use std::str::FromStr;

/// What happened to one field of a patch
#[derive(Debug, Clone, PartialEq)]
pub enum FieldOutcome {
    /// Existing element overwritten, keeping its VR
    Updated { tag: Tag, vr: VR },
    /// Element created with the dictionary VR
    Created { tag: Tag, vr: VR },
    /// Keyword not in the data dictionary, nothing written
    Unresolved,
    /// Write rejected, element left as it was
    Failed(FieldWriteError),
}

impl FieldOutcome {
    /// Returns whether the value was written
    pub fn is_written(&self) -> bool {
        matches!(self, FieldOutcome::Updated { .. } | FieldOutcome::Created { .. })
    }
}

/// Outcome of one patch field
#[derive(Debug, Clone, PartialEq)]
pub struct FieldReport {
    pub keyword: String,
    pub outcome: FieldOutcome,
}

/// Per-field outcomes of one or more patches, in application order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PatchReport {
    pub fields: Vec<FieldReport>,
}

impl PatchReport {
    /// Number of fields written
    pub fn written(&self) -> usize {
        self.fields.iter().filter(|f| f.outcome.is_written()).count()
    }

    /// Keywords that were not found in the data dictionary
    pub fn unresolved(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.outcome == FieldOutcome::Unresolved)
            .map(|f| f.keyword.as_str())
            .collect()
    }

    /// Write errors, one per failed field
    pub fn failures(&self) -> Vec<&FieldWriteError> {
        self.fields
            .iter()
            .filter_map(|f| match &f.outcome {
                FieldOutcome::Failed(e) => Some(e),
                _ => None,
            })
            .collect()
    }

    /// Outcome recorded last for a keyword
    pub fn outcome(&self, keyword: &str) -> Option<&FieldOutcome> {
        self.fields
            .iter()
            .rev()
            .find(|f| f.keyword == keyword)
            .map(|f| &f.outcome)
    }

    fn record(&mut self, keyword: &str, outcome: FieldOutcome) {
        self.fields.push(FieldReport {
            keyword: keyword.to_string(),
            outcome,
        });
    }
}

/// Resolves a DICOM keyword through the standard data dictionary
///
/// Returns the tag and the dictionary VR (relaxed for entries that allow
/// several VRs).
pub fn resolve_keyword(keyword: &str) -> Option<(Tag, VR)> {
    StandardDataDictionary
        .by_name(keyword)
        .map(|entry| (entry.tag.inner(), entry.vr.relaxed()))
}

/// Applies every field of a patch, best effort
///
/// A field that cannot be written is recorded in the report and skipped;
/// the remaining fields are still applied. Applying the same patch twice
/// yields the same object as applying it once.
///
/// # Example
///
/// ```
/// use retag_core::{apply_patch, TagPatch};
/// use dicom_object::InMemDicomObject;
///
/// let mut dcm = InMemDicomObject::new_empty();
/// let patch = TagPatch::new()
///     .with("BodyPartExamined", "BRAIN")
///     .with("PatientWeight", "heavy")
///     .with("NotAKeyword", "x");
///
/// let report = apply_patch(&mut dcm, &patch);
/// assert_eq!(report.written(), 1);
/// assert_eq!(report.failures().len(), 1);
/// assert_eq!(report.unresolved(), vec!["NotAKeyword"]);
/// ```
pub fn apply_patch(dcm: &mut InMemDicomObject, patch: &TagPatch) -> PatchReport {
    let mut report = PatchReport::default();
    for (keyword, value) in patch.iter() {
        let outcome = match set_field(dcm, keyword, value) {
            Ok(FieldOutcome::Unresolved) => {
                debug!("Skipping unknown keyword {}", keyword);
                FieldOutcome::Unresolved
            }
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("Field not written: {}", e);
                FieldOutcome::Failed(e)
            }
        };
        report.record(keyword, outcome);
    }
    report
}

/// Writes one field from its text value
///
/// An existing element keeps its VR; a new element gets the dictionary VR.
/// Elements read with an unknown (UN) VR are rewritten with the dictionary VR.
///
/// # Errors
///
/// Returns a [`FieldWriteError`] if the value does not fit the VR. The
/// object is left untouched in that case.
pub fn set_field(
    dcm: &mut InMemDicomObject,
    keyword: &str,
    value: &str,
) -> Result<FieldOutcome, FieldWriteError> {
    let (tag, dictionary_vr) = match resolve_keyword(keyword) {
        Some(resolved) => resolved,
        None => return Ok(FieldOutcome::Unresolved),
    };

    let existing_vr = dcm
        .element(tag)
        .ok()
        .map(|elem| elem.vr())
        .filter(|vr| *vr != VR::UN);
    let exists = dcm.element(tag).is_ok();
    let vr = existing_vr.unwrap_or(dictionary_vr);

    let primitive = value_for_vr(keyword, vr, value)?;
    dcm.put(DataElement::new(tag, vr, primitive));

    if exists {
        Ok(FieldOutcome::Updated { tag, vr })
    } else {
        Ok(FieldOutcome::Created { tag, vr })
    }
}

/// Converts a text value into a primitive value valid for `vr`
///
/// Multiple values are separated with a backslash, as in DICOM text
/// encoding. An empty string clears any textual VR.
pub fn value_for_vr(keyword: &str, vr: VR, text: &str) -> Result<PrimitiveValue, FieldWriteError> {
    let invalid = |reason: String| FieldWriteError::InvalidValue {
        keyword: keyword.to_string(),
        vr,
        value: text.to_string(),
        reason,
    };

    match vr {
        VR::AE
        | VR::AS
        | VR::CS
        | VR::DA
        | VR::DS
        | VR::DT
        | VR::IS
        | VR::LO
        | VR::PN
        | VR::SH
        | VR::TM
        | VR::UC
        | VR::UI => {
            if text.is_empty() {
                return Ok(PrimitiveValue::Empty);
            }
            let parts: Vec<&str> = text.split('\\').collect();
            for part in &parts {
                check_text_component(vr, part).map_err(invalid)?;
            }
            Ok(PrimitiveValue::Strs(
                parts.into_iter().map(str::to_string).collect(),
            ))
        }
        // single valued, backslash is an ordinary character here
        VR::LT | VR::ST | VR::UT | VR::UR => {
            if text.is_empty() {
                return Ok(PrimitiveValue::Empty);
            }
            check_length(vr, text).map_err(invalid)?;
            Ok(PrimitiveValue::from(text))
        }
        VR::US => parse_numbers::<u16>(text)
            .map(|v| PrimitiveValue::U16(v.into()))
            .map_err(invalid),
        VR::SS => parse_numbers::<i16>(text)
            .map(|v| PrimitiveValue::I16(v.into()))
            .map_err(invalid),
        VR::UL => parse_numbers::<u32>(text)
            .map(|v| PrimitiveValue::U32(v.into()))
            .map_err(invalid),
        VR::SL => parse_numbers::<i32>(text)
            .map(|v| PrimitiveValue::I32(v.into()))
            .map_err(invalid),
        VR::UV => parse_numbers::<u64>(text)
            .map(|v| PrimitiveValue::U64(v.into()))
            .map_err(invalid),
        VR::SV => parse_numbers::<i64>(text)
            .map(|v| PrimitiveValue::I64(v.into()))
            .map_err(invalid),
        VR::FL => parse_numbers::<f32>(text)
            .map(|v| PrimitiveValue::F32(v.into()))
            .map_err(invalid),
        VR::FD => parse_numbers::<f64>(text)
            .map(|v| PrimitiveValue::F64(v.into()))
            .map_err(invalid),
        _ => Err(FieldWriteError::UnsupportedVr {
            keyword: keyword.to_string(),
            vr,
        }),
    }
}

fn parse_numbers<T: FromStr>(text: &str) -> Result<Vec<T>, String> {
    text.split('\\')
        .map(|part| {
            part.trim()
                .parse::<T>()
                .map_err(|_| format!("'{}' is not a valid number", part))
        })
        .collect()
}

/// Maximum length of one value, in characters
fn max_length(vr: VR) -> Option<usize> {
    match vr {
        VR::AE | VR::CS | VR::DS | VR::SH => Some(16),
        VR::AS => Some(4),
        VR::DA => Some(8),
        VR::DT => Some(26),
        VR::IS => Some(12),
        VR::TM => Some(16),
        VR::LO | VR::UI => Some(64),
        VR::ST => Some(1024),
        VR::LT => Some(10240),
        _ => None,
    }
}

fn check_length(vr: VR, s: &str) -> Result<(), String> {
    match max_length(vr) {
        Some(max) if s.chars().count() > max => {
            Err(format!("longer than {} characters", max))
        }
        _ => Ok(()),
    }
}

fn check_text_component(vr: VR, s: &str) -> Result<(), String> {
    check_length(vr, s)?;
    match vr {
        VR::DS => match s.trim().parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(()),
            _ => Err("not a decimal string".to_string()),
        },
        VR::IS => match s.trim().parse::<i64>() {
            Ok(v) if i32::try_from(v).is_ok() => Ok(()),
            _ => Err("not a 32-bit integer string".to_string()),
        },
        VR::DA => check_date(s),
        VR::TM => {
            let (hms, fraction) = s.trim_end().split_once('.').unwrap_or((s.trim_end(), ""));
            let digits = |t: &str| t.chars().all(|c| c.is_ascii_digit());
            if hms.len() < 2 || hms.len() % 2 != 0 || !digits(hms) || !digits(fraction) {
                Err("expected HH[MM[SS[.FFFFFF]]]".to_string())
            } else {
                Ok(())
            }
        }
        VR::UI => {
            if s.trim_end_matches('\0')
                .chars()
                .all(|c| c.is_ascii_digit() || c == '.')
            {
                Ok(())
            } else {
                Err("UIDs contain only digits and dots".to_string())
            }
        }
        VR::AS => {
            let bytes = s.as_bytes();
            if bytes.len() == 4
                && bytes[..3].iter().all(u8::is_ascii_digit)
                && matches!(bytes[3], b'D' | b'W' | b'M' | b'Y')
            {
                Ok(())
            } else {
                Err("expected nnnD, nnnW, nnnM or nnnY".to_string())
            }
        }
        VR::CS => {
            if s.chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == ' ' || c == '_')
            {
                Ok(())
            } else {
                Err("code strings allow upper case letters, digits, space and '_'".to_string())
            }
        }
        VR::PN => {
            if s.split('=').any(|group| group.chars().count() > 64) {
                Err("name component group longer than 64 characters".to_string())
            } else {
                Ok(())
            }
        }
        _ => Ok(()),
    }
}

fn check_date(s: &str) -> Result<(), String> {
    let err = || "expected YYYYMMDD".to_string();
    if s.len() != 8 || !s.chars().all(|c| c.is_ascii_digit()) {
        return Err(err());
    }
    let month: u32 = s[4..6].parse().map_err(|_| err())?;
    let day: u32 = s[6..8].parse().map_err(|_| err())?;
    if (1..=12).contains(&month) && (1..=31).contains(&day) {
        Ok(())
    } else {
        Err(err())
    }
}
