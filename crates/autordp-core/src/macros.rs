/// Asserts that the traits support dynamic dispatch.
#[macro_export]
macro_rules! assert_obj_safe {
    ($($xs:path),+ $(,)?) => {
        $(const _: Option<&dyn $xs> = None;)+
    };
}

/// Finds the name of the function in which this macro is expanded.
#[macro_export]
macro_rules! function {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            core::any::type_name::<T>()
        }
        let name = type_name_of(f);
        name.strip_suffix("::f").unwrap()
    }};
}

/// Creates a "not enough bytes" error.
///
/// If the context is not provided, the current function name is used.
#[macro_export]
macro_rules! not_enough_bytes_err {
    ( $context:expr, $received:expr , $expected:expr $(,)? ) => {{
        $crate::not_enough_bytes_err($context, $received, $expected)
    }};
    ( $received:expr , $expected:expr $(,)? ) => {{
        $crate::not_enough_bytes_err!($crate::function!(), $received, $expected)
    }};
}

/// Creates an "invalid field" error.
///
/// If the context is not provided, the current function name is used.
#[macro_export]
macro_rules! invalid_field_err {
    ( $context:expr, $field:expr , $reason:expr $(,)? ) => {{
        $crate::invalid_field_err($context, $field, $reason)
    }};
    ( $field:expr , $reason:expr $(,)? ) => {{
        $crate::invalid_field_err!($crate::function!(), $field, $reason)
    }};
}

/// Creates an "unexpected message type" error.
#[macro_export]
macro_rules! unexpected_message_type_err {
    ( $context:expr, $got:expr $(,)? ) => {{
        $crate::unexpected_message_type_err($context, $got)
    }};
    ( $got:expr $(,)? ) => {{
        $crate::unexpected_message_type_err!($crate::function!(), $got)
    }};
}

/// Creates an "unsupported version" error.
#[macro_export]
macro_rules! unsupported_version_err {
    ( $context:expr, $got:expr $(,)? ) => {{
        $crate::unsupported_version_err($context, $got)
    }};
    ( $got:expr $(,)? ) => {{
        $crate::unsupported_version_err!($crate::function!(), $got)
    }};
}

/// Creates an "unsupported value" error for a named field.
#[macro_export]
macro_rules! unsupported_value_err {
    ( $context:expr, $name:expr, $value:expr $(,)? ) => {{
        $crate::unsupported_value_err($context, $name, $value)
    }};
    ( $name:expr, $value:expr $(,)? ) => {{
        $crate::unsupported_value_err!($crate::function!(), $name, $value)
    }};
}

/// Creates a generic error with optional context and source information.
#[macro_export]
macro_rules! other_err {
    ( $context:expr, source: $source:expr $(,)? ) => {{
        $crate::other_err_with_source($context, "", $source)
    }};
    ( $context:expr, $description:expr $(,)? ) => {{
        $crate::other_err($context, $description)
    }};
    ( source: $source:expr $(,)? ) => {{
        $crate::other_err!($crate::function!(), source: $source)
    }};
    ( $description:expr $(,)? ) => {{
        $crate::other_err!($crate::function!(), $description)
    }};
}

/// Ensures that a buffer has at least the expected size, returning a
/// "not enough bytes" error otherwise.
#[macro_export]
macro_rules! ensure_size {
    (ctx: $ctx:expr, in: $buf:ident, size: $expected:expr) => {{
        let received = $buf.len();
        let expected = $expected;
        if !(received >= expected) {
            return Err($crate::not_enough_bytes_err($ctx, received, expected));
        }
    }};
    (in: $buf:ident, size: $expected:expr) => {{
        $crate::ensure_size!(ctx: $crate::function!(), in: $buf, size: $expected)
    }};
}

/// Ensures that a buffer has at least `Self::FIXED_PART_SIZE` bytes.
#[macro_export]
macro_rules! ensure_fixed_part_size {
    (in: $buf:ident) => {{
        $crate::ensure_size!(ctx: $crate::function!(), in: $buf, size: Self::FIXED_PART_SIZE)
    }};
}

/// Safely casts a length to a different integer type.
#[macro_export]
macro_rules! cast_length {
    ($ctx:expr, $field:expr, $len:expr) => {{
        $len.try_into()
            .map_err(|e| $crate::invalid_field_err_with_source($ctx, $field, "too many elements", e))
    }};
    ($field:expr, $len:expr) => {{
        $crate::cast_length!($crate::function!(), $field, $len)
    }};
}

/// Safely casts an integer to a different integer type.
#[macro_export]
macro_rules! cast_int {
    ($ctx:expr, $field:expr, $len:expr) => {{
        $len.try_into().map_err(|e| {
            $crate::invalid_field_err_with_source($ctx, $field, "out of range integral type conversion", e)
        })
    }};
    ($field:expr, $len:expr) => {{
        $crate::cast_int!($crate::function!(), $field, $len)
    }};
}

/// Writes zeroes using as few `write_u*` calls as possible.
#[macro_export]
macro_rules! write_padding {
    ($dst:expr, 1) => {
        $dst.write_u8(0)
    };
    ($dst:expr, 2) => {
        $dst.write_u16(0)
    };
    ($dst:expr, 4) => {
        $dst.write_u32(0)
    };
    ($dst:expr, 8) => {
        $dst.write_u64(0)
    };
    ($dst:expr, $n:expr) => {
        $crate::write_padding($dst, $n)
    };
}

/// Moves the read cursor, ignoring padding bytes.
#[macro_export]
macro_rules! read_padding {
    ($src:expr, $n:expr) => {
        $crate::read_padding($src, $n)
    };
}
