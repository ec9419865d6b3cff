//! Internal logging macros.
//!
//! With the `tracing` feature enabled these forward to [`tracing`];
//! without it they compile to nothing, so the hot paths carry no cost.

macro_rules! debug {
    ($($arg:tt)*) => {{
        #[cfg(feature = "tracing")]
        {
            ::tracing::debug!($($arg)*);
        }
        #[cfg(not(feature = "tracing"))]
        {
            let _ = || ($($arg)*);
        }
    }};
}

pub(crate) use debug;
