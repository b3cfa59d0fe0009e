use std::any::Any;
use std::fmt;
use std::rc::Rc;

/// Identity comparison used for state updates and dependency lists.
///
/// Plain values compare by value. Floats follow `Object.is`: `NaN` equals
/// itself and `+0.0` differs from `-0.0`. Shared handles (`Rc`) compare by
/// address, never by contents.
pub trait SameValue {
    fn same_value(&self, other: &Self) -> bool;
}

macro_rules! same_value_via_eq {
    ($($ty:ty),* $(,)?) => {
        $(
            impl SameValue for $ty {
                #[inline]
                fn same_value(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

same_value_via_eq!(
    (),
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    String,
    &'static str,
);

impl SameValue for f64 {
    fn same_value(&self, other: &Self) -> bool {
        if self.is_nan() && other.is_nan() {
            return true;
        }
        self.to_bits() == other.to_bits()
    }
}

impl SameValue for f32 {
    fn same_value(&self, other: &Self) -> bool {
        if self.is_nan() && other.is_nan() {
            return true;
        }
        self.to_bits() == other.to_bits()
    }
}

impl<T: ?Sized> SameValue for Rc<T> {
    fn same_value(&self, other: &Self) -> bool {
        Rc::as_ptr(self) as *const () == Rc::as_ptr(other) as *const ()
    }
}

impl<T: SameValue> SameValue for Option<T> {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.same_value(b),
            (None, None) => true,
            _ => false,
        }
    }
}

impl<T: SameValue> SameValue for Vec<T> {
    fn same_value(&self, other: &Self) -> bool {
        self.len() == other.len() && self.iter().zip(other).all(|(a, b)| a.same_value(b))
    }
}

impl<A: SameValue, B: SameValue> SameValue for (A, B) {
    fn same_value(&self, other: &Self) -> bool {
        self.0.same_value(&other.0) && self.1.same_value(&other.1)
    }
}

impl<A: SameValue, B: SameValue, C: SameValue> SameValue for (A, B, C) {
    fn same_value(&self, other: &Self) -> bool {
        self.0.same_value(&other.0) && self.1.same_value(&other.1) && self.2.same_value(&other.2)
    }
}

/// One entry of a dependency list.
#[derive(Clone)]
pub enum Dep {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Rc<str>),
    Shared(Rc<dyn Any>),
}

pub type Deps = Vec<Dep>;

impl Dep {
    pub fn shared<T: Any>(value: &Rc<T>) -> Self {
        Dep::Shared(value.clone() as Rc<dyn Any>)
    }
}

impl SameValue for Dep {
    fn same_value(&self, other: &Self) -> bool {
        match (self, other) {
            (Dep::Null, Dep::Null) => true,
            (Dep::Bool(a), Dep::Bool(b)) => a == b,
            (Dep::Int(a), Dep::Int(b)) => a == b,
            (Dep::Float(a), Dep::Float(b)) => a.same_value(b),
            (Dep::Str(a), Dep::Str(b)) => a == b,
            (Dep::Shared(a), Dep::Shared(b)) => a.same_value(b),
            _ => false,
        }
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Dep::Null => f.write_str("Null"),
            Dep::Bool(value) => write!(f, "Bool({value})"),
            Dep::Int(value) => write!(f, "Int({value})"),
            Dep::Float(value) => write!(f, "Float({value})"),
            Dep::Str(value) => write!(f, "Str({value:?})"),
            Dep::Shared(value) => write!(f, "Shared({:p})", Rc::as_ptr(value) as *const ()),
        }
    }
}

macro_rules! dep_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Dep {
                fn from(value: $ty) -> Self {
                    Dep::Int(i64::from(value))
                }
            }
        )*
    };
}

dep_from_int!(i8, i16, i32, i64, u8, u16, u32);

impl From<usize> for Dep {
    fn from(value: usize) -> Self {
        match i64::try_from(value) {
            Ok(value) => Dep::Int(value),
            Err(_) => Dep::Float(value as f64),
        }
    }
}

impl From<bool> for Dep {
    fn from(value: bool) -> Self {
        Dep::Bool(value)
    }
}

impl From<f64> for Dep {
    fn from(value: f64) -> Self {
        Dep::Float(value)
    }
}

impl From<f32> for Dep {
    fn from(value: f32) -> Self {
        Dep::Float(f64::from(value))
    }
}

impl From<&str> for Dep {
    fn from(value: &str) -> Self {
        Dep::Str(Rc::from(value))
    }
}

impl From<String> for Dep {
    fn from(value: String) -> Self {
        Dep::Str(Rc::from(value))
    }
}

impl From<Rc<str>> for Dep {
    fn from(value: Rc<str>) -> Self {
        Dep::Str(value)
    }
}

impl<T: Into<Dep>> From<Option<T>> for Dep {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Dep::Null)
    }
}

/// Returns whether a hook with dependency list `next` has to run again after
/// a previous run with `prev`. Missing lists on either side always count as
/// a change.
pub fn deps_changed(prev: Option<&[Dep]>, next: Option<&[Dep]>) -> bool {
    match (prev, next) {
        (Some(prev), Some(next)) => {
            prev.len() != next.len()
                || prev
                    .iter()
                    .zip(next.iter())
                    .any(|(a, b)| !a.same_value(b))
        }
        _ => true,
    }
}

/// Builds a dependency list for [`use_memo`](crate::use_memo),
/// [`use_callback`](crate::use_callback) and [`use_effect`](crate::use_effect).
///
/// `deps![]` is an empty list (run once); pass `None` to run on every render.
#[macro_export]
macro_rules! deps {
    ($($dep:expr),* $(,)?) => {
        ::std::option::Option::Some(::std::vec![$($crate::Dep::from($dep)),*])
    };
}
