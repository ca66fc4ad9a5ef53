//! Newtype IDs for remote CRM entity references.
//!
//! The CRM assigns opaque string identifiers. Use the `define_id!` macro to
//! create type-safe wrappers that prevent accidentally passing a pipeline id
//! where a stage id is expected.

/// Errors that can occur when constructing an id from untrusted input.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum IdError {
    /// The input was empty or only whitespace.
    #[error("{kind} cannot be empty")]
    Empty {
        /// Name of the id type.
        kind: &'static str,
    },
}

/// Macro to define a type-safe remote ID wrapper.
///
/// Creates a newtype wrapper around `String` with:
/// - `Serialize`/`Deserialize` with `#[serde(transparent)]`
/// - `Debug`, `Clone`, `PartialEq`, `Eq`, `Hash`
/// - `parse()` rejecting blank input, `new_unchecked()` for trusted values
/// - `as_str()`, `into_inner()`, `Display` and `AsRef<str>`
///
/// # Example
///
/// ```rust
/// # use crm_bridge_core::define_id;
/// define_id!(ContactId);
/// define_id!(PipelineId);
///
/// let contact = ContactId::parse("abc123").unwrap();
/// assert_eq!(contact.as_str(), "abc123");
///
/// // These are different types, so this won't compile:
/// // let _: PipelineId = contact;
/// ```
#[macro_export]
macro_rules! define_id {
    ($name:ident) => {
        #[derive(
            Debug,
            Clone,
            PartialEq,
            Eq,
            Hash,
            ::serde::Serialize,
            ::serde::Deserialize
        )]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Parse an id from caller input, trimming surrounding whitespace.
            ///
            /// # Errors
            ///
            /// Returns [`IdError::Empty`] if the input is blank.
            pub fn parse(id: &str) -> ::core::result::Result<Self, $crate::types::id::IdError> {
                let trimmed = id.trim();
                if trimmed.is_empty() {
                    return Err($crate::types::id::IdError::Empty {
                        kind: stringify!($name),
                    });
                }
                Ok(Self(trimmed.to_owned()))
            }

            /// Wrap a value that is known to be valid (e.g. read back from the CRM).
            #[must_use]
            pub fn new_unchecked(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Get the underlying id.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Consume the wrapper and return the inner string.
            #[must_use]
            pub fn into_inner(self) -> String {
                self.0
            }
        }

        impl ::core::fmt::Display for $name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl ::core::str::FromStr for $name {
            type Err = $crate::types::id::IdError;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                Self::parse(s)
            }
        }
    };
}

define_id!(ContactId);
define_id!(OpportunityId);
define_id!(PipelineId);
define_id!(StageId);
define_id!(ConversationId);
define_id!(MessageId);
define_id!(LocationId);
define_id!(CalendarId);
define_id!(AppointmentId);

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trims_whitespace() {
        let id = ContactId::parse("  abc123 ").unwrap();
        assert_eq!(id.as_str(), "abc123");
    }

    #[test]
    fn test_parse_rejects_blank() {
        let err = StageId::parse("   ").unwrap_err();
        assert_eq!(err, IdError::Empty { kind: "StageId" });
        assert_eq!(err.to_string(), "StageId cannot be empty");
    }

    #[test]
    fn test_serde_is_transparent() {
        let id = PipelineId::new_unchecked("SjYJh6QYcw6bdK6poVnL");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"SjYJh6QYcw6bdK6poVnL\"");

        let parsed: PipelineId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_display_matches_inner() {
        let id = MessageId::new_unchecked("msg_1");
        assert_eq!(id.to_string(), "msg_1");
        assert_eq!(id.into_inner(), "msg_1");
    }
}
