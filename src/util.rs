use std::collections::HashMap;
use std::str::FromStr;
use std::sync::LazyLock;

use nalgebra::{Point, Point3, Scalar};
use snafu::ensure;

use crate::{MalformedReplySnafu, Result, WorldError};

/// Parses a comma-separated reply such as `"1.5,70.0,-3.25"` into a point.
pub fn parse_point<T, E, const D: usize>(s: &str) -> Result<Point<T, D>>
where
    T: FromStr<Err = E> + Scalar,
    WorldError: From<E>,
{
    let parts = s
        .trim()
        .splitn(D, ',')
        .map(|s| s.trim().parse())
        .collect::<Result<Vec<T>, E>>()?;
    ensure!(parts.len() == D, MalformedReplySnafu { reply: s });
    Ok(Point::<T, D>::from_slice(&parts))
}

/// Splits a list-valued reply into its `|`-separated records, skipping empty ones.
pub fn records(s: &str) -> impl Iterator<Item = &str> {
    s.split('|').filter(|record| !record.is_empty())
}

/// Converts a floating-point position to the coordinates of the tile containing it.
pub fn pos_to_tile(pos: &Point3<f64>) -> Point3<i32> {
    pos.map(|v| v.floor() as i32)
}

// Port of Minecraft Pi: Reborn's character handling to Rust

const CP437_CHARACTERS: usize = 256;
/// Bytes below this are ASCII control codes in text, not the glyphs the table
/// shows for them.
const FIRST_PRINTABLE: u8 = 0x20;

/// Used to convert a CP437 character to a Unicode character.
#[rustfmt::skip]
pub static CP437_TO_CHAR: [char; CP437_CHARACTERS] = [
    '\0', '☺', '☻', '♥', '♦', '♣', '♠', '•', '◘', '○', '\n', '♂', '♀', '♪', '♫', '☼',
    '►', '◄', '↕', '‼', '¶', '§', '▬', '↨', '↑', '↓', '→', '←', '∟', '↔', '▲', '▼',
    ' ', '!', '"', '#', '$', '%', '&', '\'', '(', ')', '*', '+', ',', '-', '.', '/',
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', ':', ';', '<', '=', '>', '?',
    '@', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'I', 'J', 'K', 'L', 'M', 'N', 'O',
    'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', '[', '\\', ']', '^', '_',
    '`', 'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o',
    'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y', 'z', '{', '|', '}', '~', '⌂',
    'Ç', 'ü', 'é', 'â', 'ä', 'à', 'å', 'ç', 'ê', 'ë', 'è', 'ï', 'î', 'ì', 'Ä', 'Å',
    'É', 'æ', 'Æ', 'ô', 'ö', 'ò', 'û', 'ù', 'ÿ', 'Ö', 'Ü', '¢', '£', '¥', '₧', 'ƒ',
    'á', 'í', 'ó', 'ú', 'ñ', 'Ñ', 'ª', 'º', '¿', '⌐', '¬', '½', '¼', '¡', '«', '»',
    '░', '▒', '▓', '│', '┤', '╡', '╢', '╖', '╕', '╣', '║', '╗', '╝', '╜', '╛', '┐',
    '└', '┴', '┬', '├', '─', '┼', '╞', '╟', '╚', '╔', '╩', '╦', '╠', '═', '╬', '╧',
    '╨', '╤', '╥', '╙', '╘', '╒', '╓', '╫', '╪', '┘', '┌', '█', '▄', '▌', '▐', '▀',
    'α', 'ß', 'Γ', 'π', 'Σ', 'σ', 'µ', 'τ', 'Φ', 'Θ', 'Ω', 'δ', '∞', 'φ', 'ε', '∩',
    '≡', '±', '≥', '≤', '⌠', '⌡', '÷', '≈', '°', '∙', '·', '√', 'ⁿ', '²', '■', '©'
];

pub static CHAR_TO_CP437: LazyLock<HashMap<char, u8>> = LazyLock::new(|| {
    CP437_TO_CHAR
        .iter()
        .enumerate()
        .map(|(i, &c)| (c, i as u8))
        .chain((0..FIRST_PRINTABLE).map(|b| (char::from(b), b)))
        .collect()
});

/// Encodes `s` as CP437, failing with the first character that has no code point.
///
/// Both the ASCII control characters and the glyphs CP437 draws for them
/// encode to the same bytes.
pub fn encode_cp437(s: &str, out: &mut Vec<u8>) -> Result<(), char> {
    out.reserve(s.len());
    for c in s.chars() {
        out.push(*CHAR_TO_CP437.get(&c).ok_or(c)?);
    }
    Ok(())
}

/// Decodes CP437 bytes. Every byte has a mapping, so this cannot fail.
///
/// Control bytes such as `\t` and `\r` decode to their ASCII characters.
#[must_use]
pub fn decode_cp437(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| match b {
            b if b < FIRST_PRINTABLE => char::from(b),
            _ => CP437_TO_CHAR[usize::from(b)],
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cp437_to_string() {
        assert_eq!(decode_cp437(&[0x82, 0xe9, 0x7f]), "éΘ⌂");
        assert_eq!(decode_cp437(b"world.getBlock"), "world.getBlock");
    }

    #[test]
    fn control_bytes_decode_as_ascii() {
        assert_eq!(decode_cp437(b"64\r"), "64\r");
        assert_eq!(decode_cp437(b"64\r").trim(), "64");
        assert_eq!(decode_cp437(&[0, 3, 9]), "\0\u{3}\t");
    }

    #[test]
    fn test_str_to_cp437() {
        let mut out = Vec::new();
        encode_cp437("☺☻♥♦", &mut out).unwrap();
        assert_eq!(out, vec![1, 2, 3, 4]);

        let mut out = Vec::new();
        encode_cp437("a\tb\r", &mut out).unwrap();
        assert_eq!(out, b"a\tb\r");
        assert_eq!(encode_cp437("snow ☃", &mut Vec::new()), Err('☃'));
    }

    #[test]
    fn parses_points_from_replies() {
        let pos: Point3<f64> = parse_point("1.5,70.0,-3.25").unwrap();
        assert_eq!(pos, Point3::new(1.5, 70.0, -3.25));

        let tile: Point3<i32> = parse_point("1,2,3\n").unwrap();
        assert_eq!(tile, Point3::new(1, 2, 3));

        let short: Result<Point3<i32>> = parse_point("1,2");
        assert!(matches!(short, Err(WorldError::MalformedReply { .. })));
        let bad: Result<Point3<i32>> = parse_point("1,x,3");
        assert!(matches!(bad, Err(WorldError::ParseInt { .. })));
    }

    #[test]
    fn floors_positions_to_tiles() {
        assert_eq!(
            pos_to_tile(&Point3::new(1.9, -0.5, -2.0)),
            Point3::new(1, -1, -2)
        );
    }

    #[test]
    fn skips_empty_records() {
        assert_eq!(records("1,2|3,4|").collect::<Vec<_>>(), ["1,2", "3,4"]);
        assert_eq!(records("").count(), 0);
    }
}
