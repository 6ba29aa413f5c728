use dicom_core::Tag;
use dicom_object::InMemDicomObject;

// Image Geometry Tags
pub const ROWS: Tag = Tag(0x0028, 0x0010);
pub const COLUMNS: Tag = Tag(0x0028, 0x0011);
pub const NUMBER_OF_FRAMES: Tag = Tag(0x0028, 0x0008);
pub const SAMPLES_PER_PIXEL: Tag = Tag(0x0028, 0x0002);
pub const PLANAR_CONFIGURATION: Tag = Tag(0x0028, 0x0006);
pub const BITS_ALLOCATED: Tag = Tag(0x0028, 0x0100);
pub const PIXEL_DATA: Tag = Tag(0x7FE0, 0x0010);

// Resolution Tags
pub const PIXEL_SPACING: Tag = Tag(0x0028, 0x0030);
pub const SLICE_THICKNESS: Tag = Tag(0x0018, 0x0050);

// Study/Series Identification Tags
pub const STUDY_INSTANCE_UID: Tag = Tag(0x0020, 0x000D);
pub const SERIES_INSTANCE_UID: Tag = Tag(0x0020, 0x000E);
pub const SOP_INSTANCE_UID: Tag = Tag(0x0008, 0x0018);

// Patient Tags
pub const PATIENT_NAME: Tag = Tag(0x0010, 0x0010);
pub const PATIENT_ID: Tag = Tag(0x0010, 0x0020);

/// Helper to get string value from DICOM tag
///
/// Returns `None` if the tag is not present or cannot be converted to string
pub fn get_string_value(dcm: &InMemDicomObject, tag: Tag) -> Option<String> {
    dcm.element(tag)
        .ok()
        .and_then(|elem| elem.to_str().ok())
        .map(|s| s.trim_end_matches('\0').trim().to_string())
}

/// Helper to get integer value from DICOM tag
///
/// Returns `None` if the tag is not present or cannot be converted to i32
pub fn get_int_value(dcm: &InMemDicomObject, tag: Tag) -> Option<i32> {
    dcm.element(tag)
        .ok()
        .and_then(|elem| elem.to_int::<i32>().ok())
}

/// Helper to get u16 value from DICOM tag
///
/// Returns `None` if the tag is not present or cannot be converted to u16
pub fn get_u16_value(dcm: &InMemDicomObject, tag: Tag) -> Option<u16> {
    dcm.element(tag)
        .ok()
        .and_then(|elem| elem.to_int::<u16>().ok())
}
