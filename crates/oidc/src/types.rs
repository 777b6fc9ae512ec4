/// Opaque string newtype that rejects empty (or all-whitespace) values at
/// construction, so the rest of the crate can pass them around without
/// re-checking.
macro_rules! non_empty_string {
    ($(#[$meta:meta])* $name:ident, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name(String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Result<Self, $crate::error::OidcError> {
                let value = value.into();
                if value.trim().is_empty() {
                    return Err($crate::error::OidcError::EmptyValue($label));
                }
                Ok(Self(value))
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

pub(crate) use non_empty_string;
