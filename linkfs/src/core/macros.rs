// SPDX-License-Identifier: MIT

/// Declares the `From` conversions between error layers.
///
/// - `top`: every layer error wraps into the top-level error.
/// - `str_into`: `&'static str` becomes `Other` on each listed layer and on the top.
/// - `sub`: a lower layer wraps into the named variant of each higher layer.
#[macro_export]
macro_rules! fs_error_wiring {
    (
        top => $top:ty { $($src:ty : $variant:ident),+ $(,)? },
        str_into => [ $($str_tgt:ty),* $(,)? ],
        sub => { $($low:ty => [ $($high:ident::$wrap:ident),+ ]),* $(,)? } $(,)?
    ) => {
        $( $crate::__from_variant!($src => $top, $variant); )+
        $( $crate::__from_variant!(&'static str => $str_tgt, Other); )*
        $crate::__from_variant!(&'static str => $top, Other);
        $( $( $crate::__from_variant!($low => $high, $wrap); )+ )*
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __from_variant {
    ($src:ty => $dst:ty, $variant:ident) => {
        impl From<$src> for $dst {
            #[inline]
            fn from(e: $src) -> Self {
                <$dst>::$variant(e)
            }
        }
    };
}

/// Display for layer errors: the error's own message, then one
/// `caused by` line per wrapped source.
#[macro_export]
macro_rules! fs_error_display {
    ($($t:ty),+ $(,)?) => {
        $(
            impl core::fmt::Display for $t {
                fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                    f.write_str(self.msg())?;
                    let mut cause = self.source();
                    while let Some(src) = cause {
                        write!(f, "\n  caused by: {}", src.msg())?;
                        cause = src.source();
                    }
                    Ok(())
                }
            }
        )+
    };
}

#[macro_export]
macro_rules! ensure {
    ($cond:expr, $err:expr) => {
        if !$cond {
            return Err($err.into());
        }
    };
}

#[macro_export]
macro_rules! bail {
    ($err:expr) => {
        return Err($err.into())
    };
}
