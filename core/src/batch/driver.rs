use crate::batch::discover::{discover_subjects, Subject};
use crate::batch::report::{BatchReport, FileOutcome, FileRecord, IdentifierTriple};
use crate::editing::tags::{SERIES_INSTANCE_UID, SOP_INSTANCE_UID, STUDY_INSTANCE_UID};
use crate::editing::{apply_patch, flip_pixel_data, generate_uid, match_rule, PatchReport};
use crate::error::{Result, RetagError};
use crate::types::{RetagConfig, SeriesRule, SeriesType, TagPatch};
use dicom_core::{DataElement, PrimitiveValue, Tag, VR};
use dicom_object::{open_file, DefaultDicomObject, InMemDicomObject};
use log::{error, info};
use std::collections::BTreeMap;
use std::path::Path;

/// Runs classify, patch, flip, re-identify and save over every input file
///
/// # Example
///
/// ```no_run
/// use retag_core::{BatchDriver, RetagConfig};
///
/// let config = RetagConfig::default().with_roots("/data/dcmjueves1", "/data/edited");
/// let report = BatchDriver::new(config).unwrap().run().unwrap();
/// println!("{} written, {} failed", report.written(), report.failed());
/// ```
pub struct BatchDriver {
    config: RetagConfig,
}

impl BatchDriver {
    /// Creates a driver for one configuration
    ///
    /// # Errors
    ///
    /// Returns [`RetagError::Config`] if the configuration is invalid
    pub fn new(config: RetagConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn config(&self) -> &RetagConfig {
        &self.config
    }

    /// Processes every discovered file exactly once
    ///
    /// File-level errors are recorded in the report and never stop the run.
    ///
    /// # Errors
    ///
    /// Returns [`RetagError::Fatal`] if the input root is not a directory,
    /// cannot be listed, or the output root cannot be created
    pub fn run(&self) -> Result<BatchReport> {
        let input_root = &self.config.input_root;
        if !input_root.is_dir() {
            return Err(RetagError::Fatal(format!(
                "{} is not a directory",
                input_root.display()
            )));
        }

        std::fs::create_dir_all(&self.config.output_root).map_err(|e| {
            RetagError::Fatal(format!(
                "cannot create output folder {}: {}",
                self.config.output_root.display(),
                e
            ))
        })?;

        let subjects = discover_subjects(&self.config).map_err(|e| {
            RetagError::Fatal(format!("cannot list {}: {}", input_root.display(), e))
        })?;

        let mut report = BatchReport::default();

        for subject in &subjects {
            let study_uid = generate_uid();
            let series_uids: BTreeMap<SeriesType, String> = SeriesType::WRITTEN
                .iter()
                .map(|series| (*series, generate_uid()))
                .collect();
            info!(
                "Processing {} files for patient {}",
                subject.files.len(),
                subject.patient
            );
            for path in &subject.files {
                let outcome = self.process_file(path, subject, &study_uid, &series_uids);
                report.files.push(FileRecord {
                    input: path.clone(),
                    patient: subject.patient.clone(),
                    outcome,
                });
            }
            report.series_uids.insert(subject.patient.clone(), series_uids);
        }

        info!(
            "Done: {} written, {} skipped, {} failed",
            report.written(),
            report.skipped(),
            report.failed()
        );
        Ok(report)
    }

    fn process_file(
        &self,
        path: &Path,
        subject: &Subject,
        study_uid: &str,
        series_uids: &BTreeMap<SeriesType, String>,
    ) -> FileOutcome {
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let rule = match_rule(
            &file_name,
            subject.folder.as_deref(),
            &self.config.series_classification_rules,
        );
        let series = rule
            .map(|r| r.classification)
            .unwrap_or(SeriesType::Unclassified);

        if series.is_skip() {
            info!("Skipping {}: {}", series, file_name);
            return FileOutcome::Skipped { series };
        }

        let ids = IdentifierTriple {
            study: study_uid.to_string(),
            series: series_uids
                .get(&series)
                .cloned()
                .unwrap_or_else(generate_uid),
            instance: generate_uid(),
        };
        let output = subject.output_dir.join(&file_name);

        match self.edit_file(path, &output, &subject.patient, series, rule, &ids) {
            Ok(patch) => {
                info!("Edited and saved: {} ({})", file_name, series);
                FileOutcome::Written {
                    output,
                    series,
                    ids,
                    flipped: rule.and_then(|r| r.pixel_transform_axis),
                    patch,
                }
            }
            Err(e) => {
                error!("Error in {}: {}", file_name, e);
                FileOutcome::Failed { series, error: e }
            }
        }
    }

    fn edit_file(
        &self,
        input: &Path,
        output: &Path,
        patient: &str,
        series: SeriesType,
        rule: Option<&SeriesRule>,
        ids: &IdentifierTriple,
    ) -> Result<PatchReport> {
        let mut obj = open_file(input)?;
        let patch = self.edit_object(&mut obj, patient, series, rule, ids)?;

        if let Some(dir) = output.parent() {
            std::fs::create_dir_all(dir).map_err(|e| {
                RetagError::Serialize(format!("cannot create {}: {}", dir.display(), e))
            })?;
        }
        obj.write_to_file(output)?;
        Ok(patch)
    }

    /// Applies every in-memory edit to one decoded file
    ///
    /// # Algorithm
    ///
    /// 1. PatientID and PatientName set to the patient identifier
    /// 2. Common patch, then the matched rule's patch, then the resolution
    ///    override of the series type, merged into one patch (later wins)
    /// 3. SeriesInstanceUID set to the series UID
    /// 4. Pixel data flipped if the matched rule asks for it
    /// 5. StudyInstanceUID and SOPInstanceUID replaced, the file meta
    ///    instance UID kept in sync
    ///
    /// # Errors
    ///
    /// Returns [`RetagError::Transform`] if the pixel data cannot be flipped.
    /// Field write failures only show up in the returned report.
    pub fn edit_object(
        &self,
        obj: &mut DefaultDicomObject,
        patient: &str,
        series: SeriesType,
        rule: Option<&SeriesRule>,
        ids: &IdentifierTriple,
    ) -> Result<PatchReport> {
        let mut patch = TagPatch::new()
            .with("PatientID", patient)
            .with("PatientName", patient)
            .merged_with(&self.config.common_tag_patch);
        if let Some(rule) = rule {
            patch = patch.merged_with(&rule.tag_patch);
        }
        if let Some(resolution) = self.config.resolution_overrides.get(&series) {
            patch = patch.merged_with(&resolution.to_patch());
        }
        let report = apply_patch(obj, &patch.resolved_for(patient));

        put_uid(obj, SERIES_INSTANCE_UID, &ids.series);

        if let Some(axis) = rule.and_then(|r| r.pixel_transform_axis) {
            flip_pixel_data(obj, axis)?;
        }

        put_uid(obj, STUDY_INSTANCE_UID, &ids.study);
        put_uid(obj, SOP_INSTANCE_UID, &ids.instance);
        let meta = obj.meta_mut();
        meta.media_storage_sop_instance_uid = ids.instance.clone();
        meta.update_information_group_length();

        Ok(report)
    }
}

fn put_uid(obj: &mut InMemDicomObject, tag: Tag, uid: &str) {
    obj.put(DataElement::new(tag, VR::UI, PrimitiveValue::from(uid)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::editing::tags::{get_string_value, PATIENT_ID, PATIENT_NAME, PIXEL_DATA, ROWS};
    use crate::types::{PixelSpacing, ResolutionOverride};
    use dicom_dictionary_std::{tags, uids};
    use dicom_object::FileMetaTableBuilder;

    fn mr_image() -> DefaultDicomObject {
        let dataset = InMemDicomObject::from_element_iter([
            DataElement::new(tags::SOP_CLASS_UID, VR::UI, PrimitiveValue::from(uids::MR_IMAGE_STORAGE)),
            DataElement::new(tags::SOP_INSTANCE_UID, VR::UI, PrimitiveValue::from("1.2.3.4")),
            DataElement::new(tags::PATIENT_NAME, VR::PN, PrimitiveValue::from("Real^Patient")),
            DataElement::new(tags::ROWS, VR::US, PrimitiveValue::from(2_u16)),
            DataElement::new(tags::COLUMNS, VR::US, PrimitiveValue::from(2_u16)),
            DataElement::new(tags::BITS_ALLOCATED, VR::US, PrimitiveValue::from(8_u16)),
            DataElement::new(tags::PIXEL_DATA, VR::OB, PrimitiveValue::U8(vec![1, 2, 3, 4].into())),
        ]);
        dataset
            .with_meta(
                FileMetaTableBuilder::new()
                    .transfer_syntax(uids::EXPLICIT_VR_LITTLE_ENDIAN)
                    .media_storage_sop_class_uid(uids::MR_IMAGE_STORAGE)
                    .media_storage_sop_instance_uid("1.2.3.4"),
            )
            .unwrap()
    }

    fn ids() -> IdentifierTriple {
        IdentifierTriple {
            study: "2.25.1".to_string(),
            series: "2.25.2".to_string(),
            instance: "2.25.3".to_string(),
        }
    }

    fn driver() -> BatchDriver {
        BatchDriver::new(RetagConfig::default().with_roots("/in/subj", "/out")).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        assert!(matches!(
            BatchDriver::new(RetagConfig::default()),
            Err(RetagError::Config(_))
        ));
    }

    #[test]
    fn test_edit_object_flair() {
        let driver = driver();
        let rule = driver.config().rule_for(SeriesType::Flair).cloned();
        let mut obj = mr_image();

        let report = driver
            .edit_object(&mut obj, "subj", SeriesType::Flair, rule.as_ref(), &ids())
            .unwrap();

        assert_eq!(report.unresolved(), vec!["Model"]);
        assert!(report.failures().is_empty());
        // layered patches are merged, one outcome per keyword
        let patient_names = report
            .fields
            .iter()
            .filter(|f| f.keyword == "PatientName")
            .count();
        assert_eq!(patient_names, 1);
        assert_eq!(get_string_value(&obj, PATIENT_ID), Some("subj".to_string()));
        assert_eq!(get_string_value(&obj, PATIENT_NAME), Some("subj".to_string()));
        assert_eq!(get_string_value(&obj, tags::STUDY_ID), Some("subj".to_string()));
        assert_eq!(
            get_string_value(&obj, tags::SEQUENCE_VARIANT),
            Some("FLAIR".to_string())
        );
        assert_eq!(get_string_value(&obj, SERIES_INSTANCE_UID), Some("2.25.2".to_string()));
        assert_eq!(get_string_value(&obj, STUDY_INSTANCE_UID), Some("2.25.1".to_string()));
        assert_eq!(get_string_value(&obj, SOP_INSTANCE_UID), Some("2.25.3".to_string()));
        assert_eq!(
            obj.meta().media_storage_sop_instance_uid.trim_end_matches('\0'),
            "2.25.3"
        );

        // 2x2 image flipped top to bottom
        let pixels = obj.element(PIXEL_DATA).unwrap().to_bytes().unwrap().into_owned();
        assert_eq!(pixels, vec![3, 4, 1, 2]);
        assert_eq!(get_string_value(&obj, ROWS), Some("2".to_string()));
    }

    #[test]
    fn test_edit_object_unclassified_keeps_pixels() {
        let driver = driver();
        let mut obj = mr_image();

        driver
            .edit_object(&mut obj, "subj", SeriesType::Unclassified, None, &ids())
            .unwrap();

        let pixels = obj.element(PIXEL_DATA).unwrap().to_bytes().unwrap().into_owned();
        assert_eq!(pixels, vec![1, 2, 3, 4]);
        assert!(obj.element(tags::SEQUENCE_VARIANT).is_err());
        assert_eq!(get_string_value(&obj, tags::MANUFACTURER), Some("i3M".to_string()));
    }

    #[test]
    fn test_edit_object_resolution_override() {
        let config = RetagConfig::default()
            .with_roots("/in/subj", "/out")
            .with_resolution_override(
                SeriesType::T1,
                ResolutionOverride {
                    pixel_spacing: Some(PixelSpacing::isotropic(1.0)),
                    slice_thickness: Some(5.0),
                },
            );
        let driver = BatchDriver::new(config).unwrap();
        let rule = driver.config().rule_for(SeriesType::T1).cloned();
        let mut obj = mr_image();

        driver
            .edit_object(&mut obj, "subj", SeriesType::T1, rule.as_ref(), &ids())
            .unwrap();

        assert_eq!(
            get_string_value(&obj, tags::PIXEL_SPACING),
            Some("1\\1".to_string())
        );
        assert_eq!(get_string_value(&obj, tags::SLICE_THICKNESS), Some("5".to_string()));
    }

    #[test]
    fn test_edit_object_transform_error() {
        let driver = driver();
        let rule = driver.config().rule_for(SeriesType::Flair).cloned();
        let mut obj = mr_image();
        obj.remove_element(tags::PIXEL_DATA);

        let result = driver.edit_object(&mut obj, "subj", SeriesType::Flair, rule.as_ref(), &ids());
        assert!(matches!(result, Err(RetagError::Transform(_))));
    }

    #[test]
    fn test_run_missing_input_root_is_fatal() {
        let driver = BatchDriver::new(
            RetagConfig::default().with_roots("/definitely/not/here", "/tmp/retag-out"),
        )
        .unwrap();
        assert!(matches!(driver.run(), Err(RetagError::Fatal(_))));
    }
}
