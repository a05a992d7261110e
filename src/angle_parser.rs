//! Extracts angles from the text the goniometer streams back.
//!
//! While a measurement runs the device prints bare numbers (the live angle)
//! mixed with diagnostic chatter. The authoritative result is a tagged line
//! of the form `ANGLE:<float>`; the device may print several of them and the
//! last one wins.
//!
//! Both functions are total: malformed input yields `None`, never an error.
//! Only finite numbers count as angles.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_until},
    combinator::{all_consuming, rest},
    number::complete::double,
    sequence::{pair, preceded},
    Finish, IResult,
};

/// Marker that prefixes the final angle of a measurement.
pub const ANGLE_MARKER: &str = "ANGLE:";

fn bare_angle(s: &str) -> IResult<&str, f64> {
    all_consuming(double)(s)
}

/// Everything after the first marker, up to the next marker if there is one.
fn tagged_suffix(s: &str) -> IResult<&str, &str> {
    preceded(
        pair(take_until(ANGLE_MARKER), tag(ANGLE_MARKER)),
        alt((take_until(ANGLE_MARKER), rest)),
    )(s)
}

fn parse_number(s: &str) -> Option<f64> {
    bare_angle(s.trim())
        .finish()
        .ok()
        .map(|(_, angle)| angle)
        .filter(|angle| angle.is_finite())
}

/// Interprets a single line as a bare floating point number.
///
/// ```
/// use medmove::angle_parser::parse_live;
///
/// assert_eq!(parse_live(" 93.5 "), Some(93.5));
/// assert_eq!(parse_live("ANGLE:93.5"), None);
/// ```
pub fn parse_live(line: &str) -> Option<f64> {
    parse_number(line)
}

/// Finds the authoritative angle in an accumulated response.
///
/// Lines are scanned from last to first; the first line carrying
/// [`ANGLE_MARKER`] followed by a number is the result. A tagged line whose
/// suffix is not a number is skipped and the scan carries on upwards.
pub fn parse_final(buffer: &str) -> Option<f64> {
    buffer
        .trim()
        .split('\n')
        .rev()
        .filter_map(|line| tagged_suffix(line).finish().ok())
        .find_map(|(_, suffix)| parse_number(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn live_bare_numbers() {
        assert_eq!(parse_live("93.5"), Some(93.5));
        assert_eq!(parse_live("-12"), Some(-12.0));
        assert_eq!(parse_live("  7.25\r"), Some(7.25));
        assert_eq!(parse_live(".5"), Some(0.5));
    }

    #[test]
    fn live_rejects_everything_else() {
        assert_eq!(parse_live("ANGLE:93.5"), None);
        assert_eq!(parse_live(""), None);
        assert_eq!(parse_live("   "), None);
        assert_eq!(parse_live("93.5 deg"), None);
        assert_eq!(parse_live("IMU ready"), None);
    }

    #[test]
    fn final_last_tagged_line_wins() {
        assert_eq!(parse_final("junk\nANGLE:12.0\nANGLE:45.5\n"), Some(45.5));
    }

    #[test]
    fn final_without_marker() {
        assert_eq!(parse_final("no angle here"), None);
        assert_eq!(parse_final(""), None);
        assert_eq!(parse_final("12.0\n13.0\n"), None);
    }

    #[test]
    fn final_skips_unparseable_tags() {
        assert_eq!(parse_final("ANGLE:30.0\nANGLE:oops\n"), Some(30.0));
        assert_eq!(parse_final("ANGLE:\nANGLE: n/a"), None);
    }

    #[test]
    fn final_marker_inside_line() {
        assert_eq!(parse_final("dbg ANGLE: 42.3 \n"), Some(42.3));
        assert_eq!(parse_final("ANGLE:10ANGLE:20"), Some(10.0));
    }

    #[test]
    fn non_finite_values_are_not_angles() {
        for text in ["nan", "NaN", "inf", "-inf", "infinity"] {
            assert_eq!(parse_live(text), None, "{}", text);
        }
        assert_eq!(parse_final("ANGLE:nan\n"), None);
        assert_eq!(parse_final("ANGLE:30.0\nANGLE:NaN\nANGLE:inf\n"), Some(30.0));
    }

    #[test]
    fn final_tolerates_carriage_returns() {
        assert_eq!(parse_final("noise\r\nANGLE:42.3\r\n"), Some(42.3));
    }
}
