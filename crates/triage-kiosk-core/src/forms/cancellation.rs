//! Appointment cancellation by displayed list position.

use super::{FormError, FormResult};

/// Parse the 1-based position typed by the operator and check it against
/// the current list length.
pub fn parse_cancellation(input: &str, list_len: usize) -> FormResult<usize> {
    let position: i64 = input.trim().parse().map_err(|_| FormError::NotANumber)?;
    if position < 1 || position as u64 > list_len as u64 {
        return Err(FormError::InvalidAppointmentId(position));
    }
    Ok(position as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_position() {
        assert_eq!(parse_cancellation(" 2 ", 3), Ok(2));
        assert_eq!(parse_cancellation("1", 1), Ok(1));
    }

    #[test]
    fn test_not_a_number() {
        assert_eq!(parse_cancellation("two", 3), Err(FormError::NotANumber));
        assert_eq!(parse_cancellation("", 3), Err(FormError::NotANumber));
    }

    #[test]
    fn test_out_of_range() {
        assert_eq!(parse_cancellation("0", 3), Err(FormError::InvalidAppointmentId(0)));
        assert_eq!(parse_cancellation("-1", 3), Err(FormError::InvalidAppointmentId(-1)));
        assert_eq!(parse_cancellation("4", 3), Err(FormError::InvalidAppointmentId(4)));
        assert_eq!(parse_cancellation("1", 0), Err(FormError::InvalidAppointmentId(1)));
    }
}
