use std::fmt;

/// Series classification derived from a file name
///
/// `Localizer` is the skip bucket: those files are never written.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeriesType {
    Localizer,
    T1,
    Flair,
    Unclassified,
}

impl SeriesType {
    /// Series types that produce output files
    pub const WRITTEN: [SeriesType; 3] = [SeriesType::T1, SeriesType::Flair, SeriesType::Unclassified];

    /// Returns whether files of this type are skipped
    pub fn is_skip(&self) -> bool {
        matches!(self, SeriesType::Localizer)
    }

    /// Returns simple name for display
    pub fn simple_name(&self) -> &'static str {
        match self {
            SeriesType::Localizer => "localizer",
            SeriesType::T1 => "t1",
            SeriesType::Flair => "flair",
            SeriesType::Unclassified => "unclassified",
        }
    }
}

impl fmt::Display for SeriesType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.simple_name())
    }
}

/// Spatial axis along which pixel data is reversed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlipAxis {
    /// Frame order (first slice becomes last)
    Slice,
    /// Row order, a vertical (top-bottom) flip
    Row,
    /// Column order, a horizontal (left-right) flip
    Column,
}

impl fmt::Display for FlipAxis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FlipAxis::Slice => "slice",
            FlipAxis::Row => "row",
            FlipAxis::Column => "column",
        };
        write!(f, "{}", name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_localizer_is_skip() {
        assert!(SeriesType::Localizer.is_skip());
        for series in SeriesType::WRITTEN {
            assert!(!series.is_skip());
        }
    }

    #[test]
    fn test_serde_names() {
        let parsed: SeriesType = serde_json::from_str("\"flair\"").unwrap();
        assert_eq!(parsed, SeriesType::Flair);
        assert_eq!(serde_json::to_string(&FlipAxis::Row).unwrap(), "\"row\"");
        assert_eq!(SeriesType::T1.to_string(), "t1");
    }
}
