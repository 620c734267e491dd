macro_rules! general_err {
    ( $context:expr $(,)? ) => {{
        <$crate::SessionError as $crate::SessionErrorExt>::general($context)
    }};
}

macro_rules! reason_err {
    ( $context:expr, $($arg:tt)* ) => {{
        <$crate::SessionError as $crate::SessionErrorExt>::reason($context, format!($($arg)*))
    }};
}

macro_rules! custom_err {
    ( $context:expr, $source:expr $(,)? ) => {{
        <$crate::SessionError as $crate::SessionErrorExt>::custom($context, $source)
    }};
}
