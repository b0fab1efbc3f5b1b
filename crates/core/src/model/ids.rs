use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error type for parsing an ID from a string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseIdError {
    kind: &'static str,
}

impl fmt::Display for ParseIdError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failed to parse {} from string", self.kind)
    }
}

impl std::error::Error for ParseIdError {}

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(u64);

        impl $name {
            #[must_use]
            pub fn new(id: u64) -> Self {
                Self(id)
            }

            /// Returns the underlying u64 value
            #[must_use]
            pub fn value(&self) -> u64 {
                self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl FromStr for $name {
            type Err = ParseIdError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.trim()
                    .parse::<u64>()
                    .map(Self::new)
                    .map_err(|_| ParseIdError {
                        kind: stringify!($name),
                    })
            }
        }
    };
}

numeric_id!(
    /// Owner of a plan/task store. Stores of different users never share rows.
    UserId
);
numeric_id!(
    /// Unique identifier for a study plan
    PlanId
);
numeric_id!(
    /// Unique identifier for a task, never reused within a process lifetime
    TaskId
);
numeric_id!(
    /// Identifier assigned to an upload by the upload service
    UploadId
);
numeric_id!(ReminderId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plan_id_display_and_parse() {
        let id = PlanId::new(42);
        assert_eq!(id.to_string(), "42");
        assert_eq!("42".parse::<PlanId>().unwrap(), id);
    }

    #[test]
    fn task_id_rejects_garbage() {
        let err = "not-a-number".parse::<TaskId>().unwrap_err();
        assert_eq!(err.to_string(), "failed to parse TaskId from string");
    }

    #[test]
    fn debug_includes_kind() {
        assert_eq!(format!("{:?}", UserId::new(7)), "UserId(7)");
    }

    #[test]
    fn ids_serialize_as_plain_numbers() {
        let json = serde_json::to_string(&UploadId::new(9)).unwrap();
        assert_eq!(json, "9");
        let back: UploadId = serde_json::from_str("9").unwrap();
        assert_eq!(back, UploadId::new(9));
    }
}
