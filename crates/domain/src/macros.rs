//! Macro for implementing string tags on fieldless enums
//!
//! Presentation enums (statuses, modes) travel as short lowercase tags to the
//! device framework and through configuration files. This macro derives a
//! `const fn as_str`, `Display` and case-insensitive `FromStr` from one
//! mapping table so the three never drift apart.
//!
//! # Example
//!
//! ```rust
//! use trainpulse_domain::impl_tag_conversions;
//!
//! #[derive(Debug, Clone, Copy, PartialEq, Eq)]
//! pub enum Signal {
//!     Green,
//!     Red,
//! }
//!
//! impl_tag_conversions!(Signal {
//!     Green => "green",
//!     Red => "red",
//! });
//!
//! assert_eq!(Signal::Green.as_str(), "green");
//! assert_eq!("RED".parse::<Signal>().unwrap(), Signal::Red);
//! ```

/// Implements `as_str`, `Display` and `FromStr` for a fieldless enum
///
/// Tags must be written in lowercase; parsing lowercases its input first.
#[macro_export]
macro_rules! impl_tag_conversions {
    ($enum_name:ident { $($variant:ident => $tag:literal),+ $(,)? }) => {
        impl $enum_name {
            /// Stable lowercase tag for this variant
            pub const fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $tag,)+
                }
            }
        }

        impl ::core::fmt::Display for $enum_name {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::core::str::FromStr for $enum_name {
            type Err = ::std::string::String;

            fn from_str(s: &str) -> ::core::result::Result<Self, Self::Err> {
                match s.trim().to_lowercase().as_str() {
                    $($tag => ::core::result::Result::Ok(Self::$variant),)+
                    _ => ::core::result::Result::Err(::std::format!(
                        "Invalid {}: {}",
                        ::core::stringify!($enum_name),
                        s
                    )),
                }
            }
        }
    };
}
