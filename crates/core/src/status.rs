//! Code enums mapping to SMALLINT columns.
//!
//! Each enum variant's discriminant matches the stored code. [`Status`] codes
//! are also the seed rows of the `lifecycle_statuses` lookup table.

use std::str::FromStr;

use crate::error::CoreError;
use crate::types::CodeId;

macro_rules! define_code_enum {
    (
        $(#[$meta:meta])*
        $name:ident {
            $( $(#[$vmeta:meta])* $variant:ident = $val:expr => $label:literal ),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[repr(i16)]
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $( $(#[$vmeta])* $variant = $val ),+
        }

        impl $name {
            /// Every variant, in code order.
            pub const ALL: &'static [$name] = &[$( $name::$variant ),+];

            /// Return the stored code.
            pub fn id(self) -> $crate::types::CodeId {
                self as $crate::types::CodeId
            }

            /// Lowercase name used in logs and serialized output.
            pub fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => $label ),+
                }
            }
        }

        impl From<$name> for $crate::types::CodeId {
            fn from(value: $name) -> Self {
                value as $crate::types::CodeId
            }
        }

        impl TryFrom<$crate::types::CodeId> for $name {
            type Error = $crate::error::CoreError;

            fn try_from(value: $crate::types::CodeId) -> Result<Self, Self::Error> {
                $(
                    if value == $val {
                        return Ok($name::$variant);
                    }
                )+
                Err($crate::error::CoreError::InvalidCode {
                    kind: stringify!($name),
                    value,
                })
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::error::CoreError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $( $label => Ok($name::$variant), )+
                    other => Err($crate::error::CoreError::Validation(format!(
                        "Unknown {} '{other}'",
                        stringify!($name)
                    ))),
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

pub(crate) use define_code_enum;

define_code_enum! {
    /// Lifecycle status shared by every status-bearing entity.
    ///
    /// Any status may follow any other; callers that need a stricter
    /// transition graph enforce it themselves.
    Status {
        Enabled = 0 => "enabled",
        Deleted = 1 => "deleted",
        Suspended = 2 => "suspended",
        Archived = 3 => "archived",
    }
}

impl Default for Status {
    fn default() -> Self {
        Status::Enabled
    }
}

impl Status {
    /// `true` for the soft-deleted state.
    pub fn is_deleted(self) -> bool {
        self == Status::Deleted
    }
}

/// Parse a status from either its code (`"2"`) or its name (`"suspended"`).
pub fn parse_status(input: &str) -> Result<Status, CoreError> {
    let trimmed = input.trim();
    match trimmed.parse::<CodeId>() {
        Ok(code) => Status::try_from(code),
        Err(_) => Status::from_str(&trimmed.to_ascii_lowercase()),
    }
}
