pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// Fails with `InvalidArgument` when the condition does not hold.
#[macro_export]
macro_rules! verify_arg {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_arg(result, stringify!($name), stringify!($expr))?;
    }};
}

/// Fails with `ShapeMismatch` when the condition on buffer content does not hold.
#[macro_export]
macro_rules! verify_data {
    ($name:expr, $expr:expr) => {{
        let result = $expr;
        $crate::result::verify_data(result, stringify!($name), stringify!($expr))?;
    }};
}

#[inline]
pub fn verify_arg(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        invalid_arg(name, condition)
    }
}

#[inline]
pub fn verify_data(predicate: bool, name: &str, condition: &str) -> Result<()> {
    if predicate {
        Ok(())
    } else {
        shape_mismatch(name, condition)
    }
}

#[cold]
pub fn invalid_arg(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::ErrorKind::InvalidArgument {
        name: name.to_string(),
        message: condition.to_string(),
    }
    .into())
}

#[cold]
pub fn shape_mismatch(name: &str, condition: &str) -> Result<()> {
    Err(crate::error::ErrorKind::ShapeMismatch {
        buffer: name.to_string(),
        message: condition.to_string(),
    }
    .into())
}

#[cfg(test)]
mod tests {
    use crate::error::ErrorKind;

    fn check_len(len: usize) -> super::Result<()> {
        verify_arg!(len, len > 0);
        Ok(())
    }

    fn check_offsets(offsets: &[u64]) -> super::Result<()> {
        verify_data!(offsets, offsets.windows(2).all(|w| w[0] <= w[1]));
        Ok(())
    }

    #[test]
    fn test_verify_arg() {
        assert!(check_len(1).is_ok());
        let err = check_len(0).unwrap_err();
        match err.kind() {
            ErrorKind::InvalidArgument { name, message } => {
                assert_eq!(name, "len");
                assert_eq!(message, "len > 0");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn test_verify_data() {
        assert!(check_offsets(&[0, 1, 1, 4]).is_ok());
        let err = check_offsets(&[0, 3, 2]).unwrap_err();
        assert!(matches!(err.kind(), ErrorKind::ShapeMismatch { .. }));
    }
}
