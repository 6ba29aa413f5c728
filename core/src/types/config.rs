use crate::error::{Result, RetagError};
use crate::types::{FlipAxis, PixelSpacing, SeriesType, TagPatch};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Default input file extension
pub const DEFAULT_EXTENSION: &str = "dcm";

/// One filename keyword and what it implies for matching files
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct SeriesRule {
    /// Case-insensitive substring looked up in the file name
    pub keyword: String,

    /// Series type assigned on match
    pub classification: SeriesType,

    /// Series-specific patch, applied after the common patch
    #[serde(default)]
    pub tag_patch: TagPatch,

    /// Axis to flip the pixel data along, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_transform_axis: Option<FlipAxis>,
}

impl SeriesRule {
    /// Creates a rule with no patch and no pixel transform
    pub fn new(keyword: impl Into<String>, classification: SeriesType) -> Self {
        Self {
            keyword: keyword.into(),
            classification,
            tag_patch: TagPatch::new(),
            pixel_transform_axis: None,
        }
    }

    /// Builder: Set the series-specific patch
    pub fn with_patch(mut self, patch: TagPatch) -> Self {
        self.tag_patch = patch;
        self
    }

    /// Builder: Flip pixel data of matching files along `axis`
    pub fn with_flip(mut self, axis: FlipAxis) -> Self {
        self.pixel_transform_axis = Some(axis);
        self
    }
}

/// Acquisition resolution forced onto every file of a series type
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct ResolutionOverride {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pixel_spacing: Option<PixelSpacing>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slice_thickness: Option<f64>,
}

impl ResolutionOverride {
    /// Expresses the override as a tag patch
    pub fn to_patch(&self) -> TagPatch {
        let mut patch = TagPatch::new();
        if let Some(spacing) = self.pixel_spacing {
            patch.insert("PixelSpacing", spacing.to_dicom_string());
        }
        if let Some(thickness) = self.slice_thickness {
            patch.insert("SliceThickness", thickness.to_string());
        }
        patch
    }
}

/// Configuration for one batch run
///
/// [`RetagConfig::default`] carries the tag values of the portable low-field
/// brain protocol; only the input and output roots need to be set.
///
/// # Example
///
/// ```
/// use retag_core::{RetagConfig, SeriesType};
///
/// let config = RetagConfig::default()
///     .with_roots("/data/in/subject01", "/data/out")
///     .with_subject_folders(false);
///
/// assert_eq!(config.patient(), "subject01");
/// assert!(config.rule_for(SeriesType::Flair).is_some());
/// ```
#[derive(Debug, Clone, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct RetagConfig {
    /// Folder holding the input files (or subject folders)
    pub input_root: PathBuf,

    /// Folder receiving the edited files, created if absent
    pub output_root: PathBuf,

    /// PatientID/PatientName for files directly under the input root.
    /// Falls back to the input root's folder name.
    pub patient_identifier: Option<String>,

    /// Extension of the files to process, without the dot
    pub extension: String,

    /// Treat each sub-folder of the input root as one subject
    pub subject_folders: bool,

    /// Patch applied to every written file
    pub common_tag_patch: TagPatch,

    /// Classification rules, in priority order (later wins)
    pub series_classification_rules: Vec<SeriesRule>,

    /// Resolution forced per series type
    pub resolution_overrides: BTreeMap<SeriesType, ResolutionOverride>,
}

impl Default for RetagConfig {
    fn default() -> Self {
        let common_tag_patch = TagPatch::new()
            .with("Manufacturer", "i3M")
            .with("StudyID", "{patient}")
            .with("PatientName", "{patient}")
            .with("ManufacturerModelName", "NextMRI-II")
            .with("InstitutionName", "MRILab - I3M - UPV")
            .with("Model", "NEXTMRI II")
            .with("Modality", "PORTABLE")
            .with("OperatorsName", "")
            .with("SoftwareVersions", "MARGE v0.8.1-35g25a2be1")
            .with("BodyPartExamined", "BRAIN")
            .with("PatientSex", "H")
            .with("PatientWeight", "80")
            .with("PatientBirthDate", "19940101")
            .with("ImagingFrequency", "3.63");

        let t1 = SeriesRule::new("t1", SeriesType::T1).with_patch(
            TagPatch::new()
                .with("SequenceName", "TSE_T1")
                .with("ScanningSequence", "TSE")
                .with("SequenceVariant", "T1W")
                .with("PulseSequenceName", "T1W")
                .with("SeriesDescription", "T1-weighted Axial Portable"),
        );

        let flair = SeriesRule::new("flair", SeriesType::Flair)
            .with_patch(
                TagPatch::new()
                    .with("SequenceName", "TSE_T2")
                    .with("ScanningSequence", "TSE")
                    .with("SequenceVariant", "FLAIR")
                    .with("PulseSequenceName", "T2_FLAIR")
                    .with("SeriesDescription", "T2-weighted Axial BRAIN FLAIR Portable"),
            )
            .with_flip(FlipAxis::Row);

        Self {
            input_root: PathBuf::new(),
            output_root: PathBuf::new(),
            patient_identifier: None,
            extension: DEFAULT_EXTENSION.to_string(),
            subject_folders: false,
            common_tag_patch,
            series_classification_rules: vec![
                SeriesRule::new("localizer", SeriesType::Localizer),
                t1,
                flair,
            ],
            resolution_overrides: BTreeMap::new(),
        }
    }
}

impl RetagConfig {
    /// Loads a configuration from a JSON file
    ///
    /// Missing keys take their [`Default`] values.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            RetagError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let config: RetagConfig = serde_json::from_str(&text)?;
        Ok(config)
    }

    /// Builder: Set input and output roots
    pub fn with_roots(mut self, input: impl Into<PathBuf>, output: impl Into<PathBuf>) -> Self {
        self.input_root = input.into();
        self.output_root = output.into();
        self
    }

    /// Builder: Set the patient identifier
    pub fn with_patient(mut self, patient: impl Into<String>) -> Self {
        self.patient_identifier = Some(patient.into());
        self
    }

    /// Builder: Enable or disable subject folder batching
    pub fn with_subject_folders(mut self, enabled: bool) -> Self {
        self.subject_folders = enabled;
        self
    }

    /// Builder: Set the input file extension
    pub fn with_extension(mut self, extension: impl Into<String>) -> Self {
        self.extension = extension.into().trim_start_matches('.').to_string();
        self
    }

    /// Builder: Append a classification rule
    pub fn with_rule(mut self, rule: SeriesRule) -> Self {
        self.series_classification_rules.push(rule);
        self
    }

    /// Builder: Force a resolution onto one series type
    pub fn with_resolution_override(
        mut self,
        series: SeriesType,
        resolution: ResolutionOverride,
    ) -> Self {
        self.resolution_overrides.insert(series, resolution);
        self
    }

    /// Patient identifier for files directly under the input root
    pub fn patient(&self) -> String {
        self.patient_identifier
            .clone()
            .or_else(|| {
                self.input_root
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
            })
            .unwrap_or_default()
    }

    /// Last rule classifying into `series`, which is the one that wins
    pub fn rule_for(&self, series: SeriesType) -> Option<&SeriesRule> {
        self.series_classification_rules
            .iter()
            .rev()
            .find(|rule| rule.classification == series)
    }

    /// Checks the configuration for values that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.input_root.as_os_str().is_empty() {
            return Err(RetagError::Config("input_root is not set".to_string()));
        }
        if self.output_root.as_os_str().is_empty() {
            return Err(RetagError::Config("output_root is not set".to_string()));
        }
        if same_folder(&self.input_root, &self.output_root) {
            return Err(RetagError::Config(format!(
                "output_root {} is the input folder, source files would be overwritten",
                self.output_root.display()
            )));
        }
        if self.extension.is_empty() {
            return Err(RetagError::Config("extension must not be empty".to_string()));
        }
        for rule in &self.series_classification_rules {
            if rule.keyword.trim().is_empty() {
                return Err(RetagError::Config(format!(
                    "empty keyword in {} rule",
                    rule.classification
                )));
            }
            if rule.classification == SeriesType::Unclassified {
                return Err(RetagError::Config(format!(
                    "rule '{}' cannot classify into unclassified",
                    rule.keyword
                )));
            }
        }
        Ok(())
    }
}

fn same_folder(a: &Path, b: &Path) -> bool {
    if a == b {
        return true;
    }
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_rules() {
        let config = RetagConfig::default();
        assert_eq!(config.extension, "dcm");
        assert!(!config.subject_folders);
        assert_eq!(config.series_classification_rules.len(), 3);

        let flair = config.rule_for(SeriesType::Flair).unwrap();
        assert_eq!(flair.pixel_transform_axis, Some(FlipAxis::Row));
        assert_eq!(flair.tag_patch.get("SequenceVariant"), Some("FLAIR"));

        let t1 = config.rule_for(SeriesType::T1).unwrap();
        assert_eq!(t1.pixel_transform_axis, None);
        assert!(config.rule_for(SeriesType::Unclassified).is_none());
    }

    #[test]
    fn test_patient_falls_back_to_folder_name() {
        let config = RetagConfig::default().with_roots("/in/dcmjueves1", "/out");
        assert_eq!(config.patient(), "dcmjueves1");
        assert_eq!(config.with_patient("P001").patient(), "P001");
    }

    #[test]
    fn test_builder_chain() {
        let config = RetagConfig::default()
            .with_roots("/in", "/out")
            .with_extension(".DCM")
            .with_subject_folders(true)
            .with_rule(SeriesRule::new("dwi", SeriesType::T1))
            .with_resolution_override(
                SeriesType::T1,
                ResolutionOverride {
                    pixel_spacing: Some(PixelSpacing::isotropic(1.0)),
                    slice_thickness: Some(5.0),
                },
            );
        assert_eq!(config.extension, "DCM");
        assert!(config.subject_folders);
        assert_eq!(config.rule_for(SeriesType::T1).unwrap().keyword, "dwi");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_missing_roots_and_bad_rules() {
        assert!(RetagConfig::default().validate().is_err());

        let config = RetagConfig::default()
            .with_roots("/in", "/out")
            .with_rule(SeriesRule::new("  ", SeriesType::T1));
        assert!(config.validate().is_err());

        let config = RetagConfig::default()
            .with_roots("/in", "/out")
            .with_rule(SeriesRule::new("x", SeriesType::Unclassified));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_output_into_input() {
        let config = RetagConfig::default().with_roots("/data/subj01", "/data/subj01");
        assert!(matches!(config.validate(), Err(RetagError::Config(_))));

        let input = tempfile::TempDir::new().unwrap();
        let config = RetagConfig::default().with_roots(input.path(), input.path().join("."));
        assert!(config.validate().is_err());

        let config =
            RetagConfig::default().with_roots(input.path(), input.path().join("edited"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_resolution_override_patch() {
        let patch = ResolutionOverride {
            pixel_spacing: Some(PixelSpacing::new(1.5, 1.5)),
            slice_thickness: Some(6.0),
        }
        .to_patch();
        assert_eq!(patch.get("PixelSpacing"), Some("1.5\\1.5"));
        assert_eq!(patch.get("SliceThickness"), Some("6"));
        assert!(ResolutionOverride::default().to_patch().is_empty());
    }

    #[test]
    fn test_json_partial_config() {
        let json = r#"{
            "input_root": "/in",
            "output_root": "/out",
            "series_classification_rules": [
                {"keyword": "scout", "classification": "localizer"},
                {"keyword": "t1", "classification": "t1",
                 "tag_patch": {"SeriesDescription": "T1"},
                 "pixel_transform_axis": "column"}
            ],
            "resolution_overrides": {
                "t1": {"pixel_spacing": "1.0\\1.0", "slice_thickness": 5.0}
            }
        }"#;
        let config: RetagConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.extension, "dcm");
        assert_eq!(config.series_classification_rules.len(), 2);
        assert_eq!(
            config.rule_for(SeriesType::T1).unwrap().pixel_transform_axis,
            Some(FlipAxis::Column)
        );
        let resolution = config.resolution_overrides[&SeriesType::T1];
        assert_eq!(resolution.pixel_spacing, Some(PixelSpacing::isotropic(1.0)));
        // untouched sections keep their defaults
        assert_eq!(config.common_tag_patch.get("Manufacturer"), Some("i3M"));
    }
}
