//! Arguments of API commands.
//!
//! Commands take an ordered list of arguments, each of which is either a scalar or a nested
//! sequence of further arguments. On the wire the whole list is flattened depth-first and joined
//! with commas, so `[1, [2, 3], 4]` and `[1, 2, 3, 4]` serialize identically. Text is always a
//! single scalar; it is never split into characters.

use std::fmt::{self, Display, Formatter};

use nalgebra::{Point, Scalar};

/// A single argument of an API command.
#[derive(Debug, Clone, PartialEq)]
pub enum Arg {
    Int(i64),
    Float(f64),
    Text(String),
    /// A nested sequence, expanded in place when the command is serialized.
    ///
    /// An empty sequence contributes nothing, which is how optional arguments are left out.
    Seq(Vec<Arg>),
}

impl Arg {
    /// Returns `true` for every argument that is not a [`Arg::Seq`].
    #[must_use]
    pub const fn is_scalar(&self) -> bool {
        !matches!(self, Self::Seq(_))
    }

    /// Serializes `args` the way they appear between the parentheses of a command.
    #[must_use]
    pub fn join(args: &[Arg]) -> String {
        flatten(args)
            .iter()
            .map(|v| v.to_string())
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Expands nested sequences depth-first, left to right, returning only scalars.
#[must_use]
pub fn flatten(args: &[Arg]) -> Vec<&Arg> {
    fn walk<'a>(args: &'a [Arg], out: &mut Vec<&'a Arg>) {
        for arg in args {
            match arg {
                Arg::Seq(inner) => walk(inner, out),
                scalar => out.push(scalar),
            }
        }
    }

    let mut out = Vec::with_capacity(args.len());
    walk(args, &mut out);
    out
}

impl Display for Arg {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Text(v) => f.write_str(v),
            Self::Seq(inner) => f.write_str(&Self::join(inner)),
        }
    }
}

macro_rules! impl_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Arg {
                fn from(value: $ty) -> Self {
                    Self::Int(value.into())
                }
            }
        )*
    };
}

impl_from_int!(i8, i16, i32, i64, u8, u16, u32);

/// Values outside the range of `i64` are sent as their decimal text.
macro_rules! impl_from_wide_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Arg {
                fn from(value: $ty) -> Self {
                    i64::try_from(value)
                        .map_or_else(|_| Self::Text(value.to_string()), Self::Int)
                }
            }
        )*
    };
}

impl_from_wide_int!(i128, isize, u64, u128, usize);

impl From<f32> for Arg {
    fn from(value: f32) -> Self {
        Self::Float(value.into())
    }
}

impl From<f64> for Arg {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

/// Booleans are sent as `1` or `0`.
impl From<bool> for Arg {
    fn from(value: bool) -> Self {
        Self::Int(value.into())
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl<T: Into<Arg>> From<Option<T>> for Arg {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(inner) => inner.into(),
            None => Self::Seq(Vec::new()),
        }
    }
}

impl<T: Into<Arg>> From<Vec<T>> for Arg {
    fn from(value: Vec<T>) -> Self {
        Self::Seq(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Arg>, const N: usize> From<[T; N]> for Arg {
    fn from(value: [T; N]) -> Self {
        Self::Seq(value.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Arg> + Clone> From<&[T]> for Arg {
    fn from(value: &[T]) -> Self {
        Self::Seq(value.iter().cloned().map(Into::into).collect())
    }
}

impl<T: Into<Arg> + Scalar, const D: usize> From<Point<T, D>> for Arg {
    fn from(value: Point<T, D>) -> Self {
        Self::Seq(value.iter().cloned().map(Into::into).collect())
    }
}

/// Builds a `Vec<Arg>` from values convertible into [`Arg`].
///
/// ```
/// use mcpi::args;
/// use mcpi::connection::args::Arg;
///
/// assert_eq!(Arg::join(&args![1, [2, 3], "four"]), "1,2,3,four");
/// ```
#[macro_export]
macro_rules! args {
    () => {
        ::std::vec::Vec::<$crate::connection::args::Arg>::new()
    };
    ($($arg:expr),+ $(,)?) => {
        ::std::vec![$($crate::connection::args::Arg::from($arg)),+]
    };
}
