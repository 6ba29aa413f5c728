use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// In-plane pixel spacing in millimeters (row, column)
///
/// Used by resolution overrides. Configuration files may write it in any of
/// the usual notations; it is always written back to DICOM as `row\col`.
#[derive(Debug, Clone, Copy, PartialEq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PixelSpacing {
    pub row: f64,
    pub col: f64,
}

impl PixelSpacing {
    /// Creates a new PixelSpacing
    pub fn new(row: f64, col: f64) -> Self {
        Self { row, col }
    }

    /// Creates a PixelSpacing with the same spacing on both axes
    pub fn isotropic(spacing: f64) -> Self {
        Self::new(spacing, spacing)
    }

    /// Parses pixel spacing from string
    ///
    /// Accepts formats like:
    /// - "0.5\\0.5"
    /// - "0.5 0.5"
    /// - "[0.5, 0.5]"
    /// - Exponential notation: "5e-1 5e-1"
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than two numbers are found or a value is
    /// not strictly positive
    pub fn parse(s: &str) -> Result<Self, String> {
        static REGEX: OnceLock<Regex> = OnceLock::new();
        let re = REGEX.get_or_init(|| {
            Regex::new(r"[-+]?\d*\.?\d+(?:[eE][-+]?\d+)?").expect("Failed to compile regex")
        });

        let mut numbers = re.find_iter(s).map(|m| m.as_str().parse::<f64>());
        let (row, col) = match (numbers.next(), numbers.next()) {
            (Some(Ok(row)), Some(Ok(col))) => (row, col),
            _ => return Err(format!("Failed to parse PixelSpacing from '{}'", s)),
        };

        if row <= 0.0 || col <= 0.0 {
            return Err(format!("PixelSpacing must be positive, got '{}'", s));
        }

        Ok(PixelSpacing { row, col })
    }

    /// Formats the spacing as a multi-valued DS string
    pub fn to_dicom_string(&self) -> String {
        format!("{}\\{}", self.row, self.col)
    }
}

impl TryFrom<String> for PixelSpacing {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        PixelSpacing::parse(&s)
    }
}

impl From<PixelSpacing> for String {
    fn from(ps: PixelSpacing) -> Self {
        ps.to_dicom_string()
    }
}

impl fmt::Display for PixelSpacing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} x {} mm", self.row, self.col)
    }
}
