//! Literal attribute values as they appear in a text manifest.

use crate::android::manifest::ManifestValue;
use nom::branch::alt;
use nom::bytes::complete::{tag, tag_no_case};
use nom::character::complete::{digit1, hex_digit1};
use nom::combinator::{all_consuming, map, map_res, opt, recognize, value};
use nom::sequence::{pair, preceded};
use nom::IResult;

fn hex_u32(input: &str) -> IResult<&str, u32> {
    preceded(
        tag_no_case("0x"),
        map_res(hex_digit1, |digits: &str| u32::from_str_radix(digits, 16)),
    )(input)
}

fn decimal_u32(input: &str) -> IResult<&str, u32> {
    map_res(digit1, |digits: &str| digits.parse::<u32>())(input)
}

// `@0x7f020001` or `@2130837505`; symbolic `@drawable/x` is left as text.
fn reference(input: &str) -> IResult<&str, ManifestValue> {
    map(
        preceded(tag("@"), alt((hex_u32, decimal_u32))),
        ManifestValue::Reference,
    )(input)
}

fn boolean(input: &str) -> IResult<&str, ManifestValue> {
    alt((
        value(ManifestValue::Boolean(true), tag_no_case("true")),
        value(ManifestValue::Boolean(false), tag_no_case("false")),
    ))(input)
}

fn hex(input: &str) -> IResult<&str, ManifestValue> {
    map(hex_u32, ManifestValue::Hex)(input)
}

fn integer(input: &str) -> IResult<&str, ManifestValue> {
    map_res(recognize(pair(opt(tag("-")), digit1)), |text: &str| {
        text.parse::<i64>().map(ManifestValue::Integer)
    })(input)
}

/// Types a literal attribute value. Anything that is not a numeric resource
/// reference, boolean or number stays a string.
pub fn parse_manifest_value(text: &str) -> ManifestValue {
    let trimmed = text.trim();
    match all_consuming(alt((reference, boolean, hex, integer)))(trimmed) {
        Ok((_, parsed)) => parsed,
        Err(_) => ManifestValue::String(trimmed.to_string()),
    }
}
