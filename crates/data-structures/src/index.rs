//! Index types.

/// Creates a new `u32`-based index type: a dense, copyable handle into some
/// backing vector.
#[macro_export]
macro_rules! newtype_index {
    ($(#[$attr:meta])* $vis:vis struct $name:ident;) => {
        $(#[$attr])*
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
        #[repr(transparent)]
        $vis struct $name(u32);

        impl $name {
            /// The maximum representable index.
            $vis const MAX: Self = Self(u32::MAX);

            /// Creates a new index from `value`.
            #[inline]
            $vis const fn new(value: u32) -> Self {
                Self(value)
            }

            /// Creates a new index from `value`, panicking on overflow.
            #[inline]
            $vis fn from_usize(value: usize) -> Self {
                Self(u32::try_from(value).expect("index overflowed u32"))
            }

            /// Returns the underlying value.
            #[inline]
            $vis const fn get(self) -> u32 {
                self.0
            }

            /// Returns the index as a `usize`.
            #[inline]
            $vis const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl ::std::fmt::Debug for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                write!(f, concat!(stringify!($name), "({})"), self.0)
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

#[cfg(test)]
mod tests {
    newtype_index! {
        struct TestIdx;
    }

    #[test]
    fn roundtrip() {
        let i = TestIdx::from_usize(42);
        assert_eq!(i.index(), 42);
        assert_eq!(i.get(), 42);
        assert_eq!(i, TestIdx::new(42));
        assert_eq!(format!("{i}"), "42");
    }
}
