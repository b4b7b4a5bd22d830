use std::fmt;

// https://msdn.microsoft.com/en-us/library/office/ff839168.aspx
/// An enum to represent all different errors that can appear as
/// a value in a worksheet cell
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellErrorType {
    /// Division by 0 error
    Div0,
    /// Unavailable value error
    NA,
    /// Invalid name error
    Name,
    /// Null value error
    Null,
    /// Number error
    Num,
    /// Invalid cell reference error
    Ref,
    /// Value error
    Value,
    /// Getting data
    GettingData,
}

impl fmt::Display for CellErrorType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match *self {
            CellErrorType::Div0 => write!(f, "#DIV/0!"),
            CellErrorType::NA => write!(f, "#N/A"),
            CellErrorType::Name => write!(f, "#NAME?"),
            CellErrorType::Null => write!(f, "#NULL!"),
            CellErrorType::Num => write!(f, "#NUM!"),
            CellErrorType::Ref => write!(f, "#REF!"),
            CellErrorType::Value => write!(f, "#VALUE!"),
            CellErrorType::GettingData => write!(f, "#DATA!"),
        }
    }
}

/// An enum to represent all different data types that can appear as
/// a value in a worksheet cell
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Data {
    /// Signed integer
    Int(i64),
    /// Float
    Float(f64),
    /// String
    String(String),
    /// Boolean
    Bool(bool),
    /// Date, Time or DateTime in ISO 8601
    DateTimeIso(String),
    /// Error
    Error(CellErrorType),
    /// Empty cell
    #[default]
    Empty,
}

impl Data {
    /// Whether the cell holds no value
    pub fn is_empty(&self) -> bool {
        *self == Data::Empty
    }

    /// Whether the cell holds a string
    pub fn is_string(&self) -> bool {
        matches!(*self, Data::String(_))
    }

    /// Whether the cell holds a numeric value (integer or float)
    pub fn is_numeric(&self) -> bool {
        matches!(*self, Data::Int(_) | Data::Float(_))
    }

    /// Whether the cell holds a temporal value
    pub fn is_datetime_iso(&self) -> bool {
        matches!(*self, Data::DateTimeIso(_))
    }

    /// Gets the string value if the cell holds one
    pub fn get_string(&self) -> Option<&str> {
        if let Data::String(v) = self {
            Some(&**v)
        } else {
            None
        }
    }

    /// Gets the float value if the cell holds one
    pub fn get_float(&self) -> Option<f64> {
        if let Data::Float(v) = self {
            Some(*v)
        } else {
            None
        }
    }
}

impl fmt::Display for Data {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match *self {
            Data::Int(ref e) => write!(f, "{e}"),
            Data::Float(ref e) => write!(f, "{e}"),
            Data::String(ref e) => write!(f, "{e}"),
            Data::Bool(ref e) => write!(f, "{e}"),
            Data::DateTimeIso(ref e) => write!(f, "{e}"),
            Data::Error(ref e) => write!(f, "{e}"),
            Data::Empty => Ok(()),
        }
    }
}

impl PartialEq<str> for Data {
    fn eq(&self, other: &str) -> bool {
        matches!(*self, Data::String(ref s) if s == other)
    }
}

impl PartialEq<f64> for Data {
    fn eq(&self, other: &f64) -> bool {
        matches!(*self, Data::Float(ref s) if *s == *other)
    }
}

impl PartialEq<i64> for Data {
    fn eq(&self, other: &i64) -> bool {
        matches!(*self, Data::Int(ref s) if *s == *other)
    }
}

impl From<String> for Data {
    fn from(v: String) -> Self {
        Data::String(v)
    }
}

impl From<&str> for Data {
    fn from(v: &str) -> Self {
        Data::String(v.to_string())
    }
}

impl From<f64> for Data {
    fn from(v: f64) -> Self {
        Data::Float(v)
    }
}

impl From<i64> for Data {
    fn from(v: i64) -> Self {
        Data::Int(v)
    }
}

impl From<bool> for Data {
    fn from(v: bool) -> Self {
        Data::Bool(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_and_comparisons() {
        assert!(Data::Empty.is_empty());
        assert!(!Data::Int(0).is_empty());
        assert!(Data::Int(2).is_numeric());
        assert!(Data::Float(0.5).is_numeric());
        assert!(Data::from("ab").is_string());
        assert!(Data::DateTimeIso("2024-03-01".into()).is_datetime_iso());
        assert_eq!(Data::from("ab").get_string(), Some("ab"));
        assert_eq!(Data::from(0.5).get_float(), Some(0.5));
        assert_eq!(Data::Int(3).get_float(), None);
        assert_eq!(Data::from(true), Data::Bool(true));
        assert_eq!(Data::String("x".into()), *"x");
        assert_eq!(Data::Float(1.5), 1.5);
        assert_eq!(Data::Int(4), 4i64);
    }

    #[test]
    fn display_is_the_grid_stringification() {
        assert_eq!(Data::Int(3).to_string(), "3");
        assert_eq!(Data::Float(0.5).to_string(), "0.5");
        assert_eq!(Data::Float(3.0).to_string(), "3");
        assert_eq!(Data::String("ab".into()).to_string(), "ab");
        assert_eq!(Data::Bool(false).to_string(), "false");
        assert_eq!(Data::Error(CellErrorType::Div0).to_string(), "#DIV/0!");
        assert_eq!(Data::Empty.to_string(), "");
    }
}
