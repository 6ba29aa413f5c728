use crate::error::{Result, RetagError};
use crate::types::FlipAxis;
use dicom_core::value::Value;
use dicom_core::{DataElement, PrimitiveValue};
use dicom_object::InMemDicomObject;
use ndarray::{Array5, Axis};

use super::tags::{
    get_int_value, get_u16_value, BITS_ALLOCATED, COLUMNS, NUMBER_OF_FRAMES, PIXEL_DATA,
    PLANAR_CONFIGURATION, ROWS, SAMPLES_PER_PIXEL,
};

/// Geometry of native pixel data as declared by the image pixel module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelLayout {
    pub frames: usize,
    pub rows: usize,
    pub columns: usize,
    pub samples_per_pixel: usize,
    /// Planar configuration 1: one color plane after the other
    pub planar: bool,
    pub bytes_per_sample: usize,
}

impl PixelLayout {
    /// Reads the layout from the image pixel attributes
    ///
    /// # Errors
    ///
    /// Returns [`RetagError::Transform`] if Rows, Columns or BitsAllocated
    /// are missing, or BitsAllocated is not a whole number of bytes
    pub fn from_dicom(dcm: &InMemDicomObject) -> Result<Self> {
        let required = |tag, name: &str| {
            get_u16_value(dcm, tag)
                .filter(|v| *v > 0)
                .ok_or_else(|| RetagError::Transform(format!("missing or zero {}", name)))
        };

        let rows = required(ROWS, "Rows")?;
        let columns = required(COLUMNS, "Columns")?;
        let bits_allocated = required(BITS_ALLOCATED, "BitsAllocated")?;
        if bits_allocated % 8 != 0 {
            return Err(RetagError::Transform(format!(
                "unsupported BitsAllocated {}",
                bits_allocated
            )));
        }

        let frames = get_int_value(dcm, NUMBER_OF_FRAMES).unwrap_or(1);
        if frames < 1 {
            return Err(RetagError::Transform(format!(
                "invalid NumberOfFrames {}",
                frames
            )));
        }

        let samples_per_pixel = get_u16_value(dcm, SAMPLES_PER_PIXEL).unwrap_or(1).max(1);
        let planar =
            samples_per_pixel > 1 && get_u16_value(dcm, PLANAR_CONFIGURATION).unwrap_or(0) == 1;

        Ok(Self {
            frames: frames as usize,
            rows: rows as usize,
            columns: columns as usize,
            samples_per_pixel: samples_per_pixel as usize,
            planar,
            bytes_per_sample: (bits_allocated / 8) as usize,
        })
    }

    /// Shape used to view the data, always five dimensions: frames, then
    /// rows/columns/samples in storage order, then the units of one sample
    fn shape(&self, units_per_sample: usize) -> (usize, usize, usize, usize, usize) {
        if self.planar {
            (
                self.frames,
                self.samples_per_pixel,
                self.rows,
                self.columns,
                units_per_sample,
            )
        } else {
            (
                self.frames,
                self.rows,
                self.columns,
                self.samples_per_pixel,
                units_per_sample,
            )
        }
    }

    fn axis_index(&self, axis: FlipAxis) -> usize {
        match (axis, self.planar) {
            (FlipAxis::Slice, _) => 0,
            (FlipAxis::Row, false) => 1,
            (FlipAxis::Column, false) => 2,
            (FlipAxis::Row, true) => 2,
            (FlipAxis::Column, true) => 3,
        }
    }

    /// Number of values the layout covers, `None` if it does not fit in `usize`
    fn len(&self, units_per_sample: usize) -> Option<usize> {
        [self.rows, self.columns, self.samples_per_pixel, units_per_sample]
            .iter()
            .try_fold(self.frames, |acc, n| acc.checked_mul(*n))
    }
}

/// Reverses native pixel data along an axis, in place
///
/// Only the order of the stored samples changes: Rows, Columns,
/// NumberOfFrames and the PixelData VR are left as they were. Flipping
/// twice along the same axis restores the original data.
///
/// # Errors
///
/// Returns [`RetagError::Transform`] if PixelData is missing or
/// encapsulated, the layout cannot be read, or the data is shorter than
/// the declared layout
pub fn flip_pixel_data(dcm: &mut InMemDicomObject, axis: FlipAxis) -> Result<()> {
    let layout = PixelLayout::from_dicom(dcm)?;

    let elem = dcm
        .element(PIXEL_DATA)
        .map_err(|_| RetagError::Transform("missing PixelData".to_string()))?;
    let vr = elem.vr();
    let primitive = match elem.value() {
        Value::Primitive(p) => p,
        _ => {
            return Err(RetagError::Transform(
                "encapsulated (compressed) PixelData is not supported".to_string(),
            ))
        }
    };

    let flipped = match primitive {
        PrimitiveValue::U8(bytes) => {
            PrimitiveValue::U8(flip_samples(&bytes[..], &layout, layout.bytes_per_sample, axis)?.into())
        }
        PrimitiveValue::U16(words) if layout.bytes_per_sample % 2 == 0 => PrimitiveValue::U16(
            flip_samples(&words[..], &layout, layout.bytes_per_sample / 2, axis)?.into(),
        ),
        other => {
            let bytes = other.to_bytes();
            PrimitiveValue::U8(flip_samples(&bytes[..], &layout, layout.bytes_per_sample, axis)?.into())
        }
    };

    dcm.put(DataElement::new(PIXEL_DATA, vr, flipped));
    Ok(())
}

/// Reverses `values` along `axis`, treating `units_per_sample` consecutive
/// values as one sample. Trailing values past the declared layout (such as
/// the padding byte of odd-length data) are kept at the end.
fn flip_samples<T: Clone>(
    values: &[T],
    layout: &PixelLayout,
    units_per_sample: usize,
    axis: FlipAxis,
) -> Result<Vec<T>> {
    let expected = layout
        .len(units_per_sample)
        .ok_or_else(|| RetagError::Transform("pixel layout too large".to_string()))?;
    if values.len() < expected {
        return Err(RetagError::Transform(format!(
            "PixelData holds {} values, layout needs {}",
            values.len(),
            expected
        )));
    }

    let mut array = Array5::from_shape_vec(layout.shape(units_per_sample), values[..expected].to_vec())
        .map_err(|e| RetagError::Transform(format!("invalid pixel array shape: {}", e)))?;
    array.invert_axis(Axis(layout.axis_index(axis)));

    let mut out: Vec<T> = array.iter().cloned().collect();
    out.extend_from_slice(&values[expected..]);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dicom_core::VR;

    fn image(rows: u16, cols: u16, frames: Option<&str>, bits: u16, data: PrimitiveValue) -> InMemDicomObject {
        let mut dcm = InMemDicomObject::new_empty();
        dcm.put(DataElement::new(ROWS, VR::US, PrimitiveValue::from(rows)));
        dcm.put(DataElement::new(COLUMNS, VR::US, PrimitiveValue::from(cols)));
        dcm.put(DataElement::new(BITS_ALLOCATED, VR::US, PrimitiveValue::from(bits)));
        if let Some(frames) = frames {
            dcm.put(DataElement::new(NUMBER_OF_FRAMES, VR::IS, PrimitiveValue::from(frames)));
        }
        let vr = if bits > 8 { VR::OW } else { VR::OB };
        dcm.put(DataElement::new(PIXEL_DATA, vr, data));
        dcm
    }

    fn bytes_of(dcm: &InMemDicomObject) -> Vec<u8> {
        dcm.element(PIXEL_DATA).unwrap().to_bytes().unwrap().into_owned()
    }

    fn words_of(dcm: &InMemDicomObject) -> Vec<u16> {
        match dcm.element(PIXEL_DATA).unwrap().value() {
            Value::Primitive(PrimitiveValue::U16(w)) => w.to_vec(),
            other => panic!("unexpected value {:?}", other),
        }
    }

    #[test]
    fn test_row_flip_single_frame() {
        // 2 rows x 3 columns
        let mut dcm = image(2, 3, None, 8, PrimitiveValue::U8(vec![1, 2, 3, 4, 5, 6].into()));
        flip_pixel_data(&mut dcm, FlipAxis::Row).unwrap();
        assert_eq!(bytes_of(&dcm), vec![4, 5, 6, 1, 2, 3]);
    }

    #[test]
    fn test_column_flip_single_frame() {
        let mut dcm = image(2, 3, None, 8, PrimitiveValue::U8(vec![1, 2, 3, 4, 5, 6].into()));
        flip_pixel_data(&mut dcm, FlipAxis::Column).unwrap();
        assert_eq!(bytes_of(&dcm), vec![3, 2, 1, 6, 5, 4]);
    }

    #[test]
    fn test_slice_flip_multi_frame_words() {
        // 3 frames of 1 x 2
        let mut dcm = image(1, 2, Some("3"), 16, PrimitiveValue::U16(vec![1, 2, 3, 4, 5, 6].into()));
        flip_pixel_data(&mut dcm, FlipAxis::Slice).unwrap();
        assert_eq!(words_of(&dcm), vec![5, 6, 3, 4, 1, 2]);
    }

    #[test]
    fn test_row_flip_keeps_sample_bytes_together() {
        // 16-bit samples stored as bytes: 2 rows x 1 column
        let mut dcm = image(2, 1, None, 16, PrimitiveValue::U8(vec![0x01, 0x02, 0x03, 0x04].into()));
        flip_pixel_data(&mut dcm, FlipAxis::Row).unwrap();
        assert_eq!(bytes_of(&dcm), vec![0x03, 0x04, 0x01, 0x02]);
    }

    #[test]
    fn test_rgb_interleaved_and_planar() {
        // 1 row x 2 columns RGB, interleaved: R1 G1 B1 R2 G2 B2
        let mut dcm = image(1, 2, None, 8, PrimitiveValue::U8(vec![1, 2, 3, 4, 5, 6].into()));
        dcm.put(DataElement::new(SAMPLES_PER_PIXEL, VR::US, PrimitiveValue::from(3_u16)));
        flip_pixel_data(&mut dcm, FlipAxis::Column).unwrap();
        assert_eq!(bytes_of(&dcm), vec![4, 5, 6, 1, 2, 3]);

        // planar: R1 R2 G1 G2 B1 B2
        let mut dcm = image(1, 2, None, 8, PrimitiveValue::U8(vec![1, 2, 3, 4, 5, 6].into()));
        dcm.put(DataElement::new(SAMPLES_PER_PIXEL, VR::US, PrimitiveValue::from(3_u16)));
        dcm.put(DataElement::new(PLANAR_CONFIGURATION, VR::US, PrimitiveValue::from(1_u16)));
        flip_pixel_data(&mut dcm, FlipAxis::Column).unwrap();
        assert_eq!(bytes_of(&dcm), vec![2, 1, 4, 3, 6, 5]);
    }

    #[test]
    fn test_double_flip_restores_data() {
        let original: Vec<u16> = (0..4 * 3 * 5).collect();
        for axis in [FlipAxis::Slice, FlipAxis::Row, FlipAxis::Column] {
            let mut dcm = image(3, 5, Some("4"), 16, PrimitiveValue::U16(original.clone().into()));
            flip_pixel_data(&mut dcm, axis).unwrap();
            assert_ne!(words_of(&dcm), original, "axis {} left data unchanged", axis);
            flip_pixel_data(&mut dcm, axis).unwrap();
            assert_eq!(words_of(&dcm), original);
        }
    }

    #[test]
    fn test_shape_fields_untouched() {
        let mut dcm = image(2, 3, Some("1"), 8, PrimitiveValue::U8(vec![0; 6].into()));
        flip_pixel_data(&mut dcm, FlipAxis::Row).unwrap();
        assert_eq!(get_u16_value(&dcm, ROWS), Some(2));
        assert_eq!(get_u16_value(&dcm, COLUMNS), Some(3));
        assert_eq!(get_int_value(&dcm, NUMBER_OF_FRAMES), Some(1));
        assert_eq!(dcm.element(PIXEL_DATA).unwrap().vr(), VR::OB);
    }

    #[test]
    fn test_trailing_padding_kept() {
        // 1 x 3 bytes plus one padding byte
        let mut dcm = image(1, 3, None, 8, PrimitiveValue::U8(vec![1, 2, 3, 0].into()));
        flip_pixel_data(&mut dcm, FlipAxis::Column).unwrap();
        assert_eq!(bytes_of(&dcm), vec![3, 2, 1, 0]);
    }

    #[test]
    fn test_errors() {
        let mut short = image(2, 2, None, 8, PrimitiveValue::U8(vec![1, 2, 3].into()));
        assert!(matches!(
            flip_pixel_data(&mut short, FlipAxis::Row),
            Err(RetagError::Transform(_))
        ));

        let mut one_bit = image(8, 8, None, 1, PrimitiveValue::U8(vec![0; 8].into()));
        assert!(flip_pixel_data(&mut one_bit, FlipAxis::Row).is_err());

        let mut no_pixels = image(1, 1, None, 8, PrimitiveValue::U8(vec![0].into()));
        no_pixels.remove_element(PIXEL_DATA);
        assert!(flip_pixel_data(&mut no_pixels, FlipAxis::Row).is_err());

        let mut empty = InMemDicomObject::new_empty();
        assert!(flip_pixel_data(&mut empty, FlipAxis::Slice).is_err());
    }

    #[test]
    fn test_oversized_layout_is_transform_error() {
        let mut dcm = image(
            u16::MAX,
            u16::MAX,
            Some("2147483647"),
            64,
            PrimitiveValue::U8(vec![0; 16].into()),
        );
        dcm.put(DataElement::new(SAMPLES_PER_PIXEL, VR::US, PrimitiveValue::from(u16::MAX)));

        match flip_pixel_data(&mut dcm, FlipAxis::Row) {
            Err(RetagError::Transform(msg)) => assert_eq!(msg, "pixel layout too large"),
            other => panic!("expected transform error, got {:?}", other),
        }
        assert_eq!(bytes_of(&dcm), vec![0; 16]);
    }
}
