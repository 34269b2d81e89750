//! Dot-delimited river paths.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Separator between path components, e.g. `control.pressure.valid`.
pub const SEPARATOR: char = '.';

/// Errors related to path parsing and validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathError {
    /// The path string has no components at all.
    #[error("path is empty")]
    Empty,

    /// A path component is empty or contains a disallowed character.
    #[error("invalid path component '{component}' at position {position}: {message}")]
    InvalidComponent {
        component: String,
        position: usize,
        message: String,
    },
}

/// A validated path in a river.
///
/// Components are separated by `.` and may only contain ASCII letters,
/// digits and underscores. Unlike most path types there is no
/// normalization: `a..b`, `.a` and `a.` are all rejected because they
/// contain an empty component.
#[derive(Clone, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct Path {
    pub components: Vec<String>,
}

impl Path {
    /// Parse a path string, validating every component.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use river_core::Path;
    ///
    /// let path = Path::parse("control.pressure.valid").unwrap();
    /// assert_eq!(path.len(), 3);
    ///
    /// assert!(Path::parse("").is_err());
    /// assert!(Path::parse("control..pressure").is_err());
    /// assert!(Path::parse("control.valve-open").is_err());
    /// ```
    pub fn parse(s: &str) -> Result<Self, PathError> {
        if s.is_empty() {
            return Err(PathError::Empty);
        }

        let components: Vec<String> = s.split(SEPARATOR).map(str::to_string).collect();
        for (i, component) in components.iter().enumerate() {
            Self::validate_component(component, i)?;
        }

        Ok(Path { components })
    }

    fn validate_component(component: &str, position: usize) -> Result<(), PathError> {
        if component.is_empty() {
            return Err(PathError::InvalidComponent {
                component: component.to_string(),
                position,
                message: "empty component".to_string(),
            });
        }

        if let Some(c) = component
            .chars()
            .find(|c| !c.is_ascii_alphanumeric() && *c != '_')
        {
            return Err(PathError::InvalidComponent {
                component: component.to_string(),
                position,
                message: format!("invalid character '{}'", c),
            });
        }

        Ok(())
    }

    /// True for the empty path naming the root of a tree.
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Get the number of components.
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Iterate over components.
    pub fn iter(&self) -> impl Iterator<Item = &String> {
        self.components.iter()
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for component in &self.components {
            if !first {
                write!(f, "{}", SEPARATOR)?;
            }
            write!(f, "{}", component)?;
            first = false;
        }
        Ok(())
    }
}

impl FromStr for Path {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Path::parse(s)
    }
}

impl std::ops::Index<usize> for Path {
    type Output = String;

    fn index(&self, i: usize) -> &Self::Output {
        &self.components[i]
    }
}

/// Macro for creating paths from literals.
///
/// # Example
///
/// ```rust
/// use river_core::path;
///
/// let p = path!("system.time");
/// assert_eq!(p.len(), 2);
/// ```
#[macro_export]
macro_rules! path {
    ($s:expr) => {
        $crate::Path::parse($s).expect("invalid path literal")
    };
}
