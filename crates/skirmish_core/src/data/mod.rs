//! Data structures for match configuration.
//!
//! Pure data types deserialized from RON strings. Reading files is the
//! caller's business; parse failures carry the path the caller supplies.

mod ordinance_data;
mod world_data;

pub use ordinance_data::{apply_overrides, OrdinanceData};
pub use world_data::WorldConfig;

use serde::de::DeserializeOwned;

use crate::error::{GameError, Result};

/// Label used for RON sources that did not come from a file.
pub const INLINE_SOURCE: &str = "<inline>";

/// Parse any RON-deserializable value, labelling errors with `path`.
///
/// # Errors
///
/// Returns [`GameError::DataParseError`] when `source` is not valid RON
/// for `T`.
pub fn parse_ron<T: DeserializeOwned>(source: &str, path: &str) -> Result<T> {
    ron::from_str(source).map_err(|err| GameError::DataParseError {
        path: path.to_string(),
        message: err.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_carries_path() {
        let err = parse_ron::<WorldConfig>("WorldConfig(width: )", "maps/bad.ron").unwrap_err();
        match err {
            GameError::DataParseError { path, message } => {
                assert_eq!(path, "maps/bad.ron");
                assert!(!message.is_empty());
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
