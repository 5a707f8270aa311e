//! Polymorphic reads over variant-shaped values.
//!
//! A reactive value often holds one of a closed set of shapes. Reading a
//! field that only some shapes carry should be a question ("do you have a
//! radius?") rather than a crash. [`unionize!`](crate::unionize!) declares
//! such a set as an enum and gives it one accessor per field, returning
//! `Some` on the variant that carries the field and `None` on the rest.
//!
//! ```rust
//! use trellis_core::unionize;
//! use trellis_core::unionize::Tagged;
//!
//! unionize! {
//!     #[derive(Debug, Clone, PartialEq)]
//!     pub enum Shape {
//!         Circle { radius: f64 },
//!         Rect { width: f64, height: f64 },
//!     }
//! }
//!
//! let shape = Shape::Circle { radius: 2.0 };
//! assert_eq!(shape.radius(), Some(&2.0));
//! assert_eq!(shape.width(), None);
//! assert_eq!(shape.tag(), "Circle");
//! ```
//!
//! Every variant must use braces, and a field name may appear in only one
//! variant.

/// Enums whose variants can be named at runtime.
pub trait Tagged {
    /// Name of the variant this value holds.
    fn tag(&self) -> &'static str;

    /// Names of every variant, in declaration order.
    fn tags() -> &'static [&'static str]
    where
        Self: Sized;

    /// Whether this value holds the variant called `tag`.
    fn is(&self, tag: &str) -> bool {
        self.tag() == tag
    }
}

/// Declare an enum with per-field optional accessors.
///
/// See the [module documentation](crate::unionize).
#[macro_export]
macro_rules! unionize {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident {
                    $(
                        $(#[$fmeta:meta])*
                        $field:ident : $ty:ty
                    ),* $(,)?
                }
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant {
                    $(
                        $(#[$fmeta])*
                        $field: $ty
                    ),*
                }
            ),*
        }

        #[allow(dead_code)]
        impl $name {
            $($(
                pub fn $field(&self) -> ::core::option::Option<&$ty> {
                    match self {
                        Self::$variant { $field, .. } => ::core::option::Option::Some($field),
                        #[allow(unreachable_patterns)]
                        _ => ::core::option::Option::None,
                    }
                }
            )*)*
        }

        impl $crate::unionize::Tagged for $name {
            fn tag(&self) -> &'static str {
                match self {
                    $(Self::$variant { .. } => ::core::stringify!($variant),)*
                }
            }

            fn tags() -> &'static [&'static str] {
                &[$(::core::stringify!($variant)),*]
            }
        }
    };
}
