//! Morse code tables and conversions.
//!
//! This module holds the character/element tables shared by the tone
//! generator, the decoder, and the practice sessions, along with helpers
//! to render element strings for display.

use crate::error::{Error, Result};

/// The letters the trainer tests on.
pub const ALPHABETICS: &str = "ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// The digits the trainer tests on.
pub const NUMBERS: &str = "0123456789";

/// The punctuation the trainer tests on.
pub const PUNCTUATION: &str = r#"?,.!=/()'":;"#;

/// Every character the trainer tests on, in the Koch teaching order.
///
/// The Koch method starts with the first two characters and extends the
/// set one character at a time as proficiency improves.
pub const KOCH: &str = r#"KMRSUAPTLOWI.NJE=F0Y,VG5/Q9ZH38B?427C1D6X():;!"'"#;

/// Map of characters to their Morse element strings.
///
/// Covers more than the trainer charset; extra entries (`$`, `&`, `@`, ...)
/// are kept so received morse can still be named in error messages.
const CODE_TABLE: &[(char, &str)] = &[
    ('!', "-.-.--"),
    ('"', ".-..-."),
    ('$', "...-..-"),
    ('&', ".-..."),
    ('\'', ".----."),
    ('(', "-.--."),
    (')', "-.--.-"),
    (',', "--..--"),
    ('-', "-....-"),
    ('.', ".-.-.-"),
    ('/', "-..-."),
    (':', "---..."),
    (';', "-.-.-."),
    ('=', "-...-"),
    ('?', "..--.."),
    ('@', ".--.-."),
    ('_', "..--.-"),
    ('+', ".-.-."),
    ('0', "-----"),
    ('1', ".----"),
    ('2', "..---"),
    ('3', "...--"),
    ('4', "....-"),
    ('5', "....."),
    ('6', "-...."),
    ('7', "--..."),
    ('8', "---.."),
    ('9', "----."),
    ('A', ".-"),
    ('B', "-..."),
    ('C', "-.-."),
    ('D', "-.."),
    ('E', "."),
    ('F', "..-."),
    ('G', "--."),
    ('H', "...."),
    ('I', ".."),
    ('J', ".---"),
    ('K', "-.-"),
    ('L', ".-.."),
    ('M', "--"),
    ('N', "-."),
    ('O', "---"),
    ('P', ".--."),
    ('Q', "--.-"),
    ('R', ".-."),
    ('S', "..."),
    ('T', "-"),
    ('U', "..-"),
    ('V', "...-"),
    ('W', ".--"),
    ('X', "-..-"),
    ('Y', "-.--"),
    ('Z', "--.."),
];

/// Get the Morse element string for a character, if it has one.
///
/// Lookup is case-insensitive. A space maps to a space (word gap).
#[must_use]
pub fn elements_for(ch: char) -> Option<&'static str> {
    if ch == ' ' {
        return Some(" ");
    }
    let upper = ch.to_ascii_uppercase();
    CODE_TABLE
        .iter()
        .find(|(c, _)| *c == upper)
        .map(|(_, m)| *m)
}

/// Get the character for a Morse element string, if one matches.
#[must_use]
pub fn char_for(elements: &str) -> Option<char> {
    if elements == " " {
        return Some(' ');
    }
    CODE_TABLE
        .iter()
        .find(|(_, m)| *m == elements)
        .map(|(c, _)| *c)
}

/// The first `n` characters of the Koch teaching order.
///
/// `n` is clamped to the full set. The Koch string is ASCII so byte
/// slicing is safe.
#[must_use]
pub fn koch_prefix(n: usize) -> &'static str {
    &KOCH[..n.min(KOCH.len())]
}

/// Convert a Morse element string to 'display' morse.
///
/// Raw `./-` strings are hard to read in reports; `.-.` renders as
/// `• ━ •` instead.
///
/// # Errors
///
/// Returns [`Error::Internal`] if the string contains anything other
/// than dots, dashes, underscores, and spaces.
pub fn elements_to_display(elements: &str) -> Result<String> {
    const DOT: char = '\u{2022}';
    const DASH: char = '\u{2501}';
    const SIX_PER_EM_SPACE: char = '\u{2005}';

    let mut parts = Vec::with_capacity(elements.len());
    for sign in elements.chars() {
        match sign {
            '.' => parts.push(DOT.to_string()),
            '-' | '_' => parts.push(DASH.to_string()),
            ' ' => parts.push(' '.to_string()),
            other => {
                return Err(Error::internal(format!(
                    "unrecognized sign in {elements:?}: {other:?}"
                )))
            }
        }
    }

    let mut result = String::new();
    for (i, part) in parts.iter().enumerate() {
        if i > 0 {
            result.push(SIX_PER_EM_SPACE);
        }
        result.push_str(part);
    }
    Ok(result)
}

/// Convert a character to display morse.
///
/// # Errors
///
/// Returns [`Error::UnknownCharacter`] if the character has no encoding.
pub fn char_to_display(ch: char) -> Result<String> {
    let elements = elements_for(ch).ok_or(Error::UnknownCharacter { ch })?;
    elements_to_display(elements)
}

/// Convert a string into element form, characters separated by spaces.
///
/// # Errors
///
/// Returns [`Error::UnknownCharacter`] on the first character with no
/// encoding.
pub fn encode(text: &str) -> Result<String> {
    let mut parts = Vec::new();
    for ch in text.chars() {
        parts.push(elements_for(ch).ok_or(Error::UnknownCharacter { ch })?);
    }
    Ok(parts.join(" "))
}

/// Decode whitespace-separated element text, `/` marking word gaps.
///
/// Unrecognized element groups decode to `\u{00bf}` (inverted question
/// mark) so the caller can see where decoding failed.
#[must_use]
pub fn decode_elements(text: &str) -> String {
    const NOTHING: char = '\u{00bf}';

    let mut result = String::new();
    for group in text.split_whitespace() {
        if group == "/" {
            result.push(' ');
        } else {
            result.push(char_for(group).unwrap_or(NOTHING));
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_koch_is_permutation_of_user_chars() {
        let all: String = format!("{ALPHABETICS}{NUMBERS}{PUNCTUATION}");
        let mut all_sorted: Vec<char> = all.chars().collect();
        all_sorted.sort_unstable();
        let mut koch_sorted: Vec<char> = KOCH.chars().collect();
        koch_sorted.sort_unstable();
        assert_eq!(all_sorted, koch_sorted);
    }

    #[test]
    fn test_elements_for_letters() {
        assert_eq!(elements_for('A'), Some(".-"));
        assert_eq!(elements_for('E'), Some("."));
        assert_eq!(elements_for('T'), Some("-"));
        assert_eq!(elements_for('Z'), Some("--.."));
    }

    #[test]
    fn test_elements_for_is_case_insensitive() {
        assert_eq!(elements_for('q'), elements_for('Q'));
        assert_eq!(elements_for('k'), Some("-.-"));
    }

    #[test]
    fn test_elements_for_space_and_unknown() {
        assert_eq!(elements_for(' '), Some(" "));
        assert_eq!(elements_for('%'), None);
        assert_eq!(elements_for('~'), None);
    }

    #[test]
    fn test_char_for_round_trip() {
        for (ch, elements) in CODE_TABLE {
            assert_eq!(char_for(elements), Some(*ch), "elements {elements}");
        }
    }

    #[test]
    fn test_char_for_unknown() {
        assert_eq!(char_for("........"), None);
        assert_eq!(char_for(""), None);
    }

    #[test]
    fn test_koch_prefix() {
        assert_eq!(koch_prefix(2), "KM");
        assert_eq!(koch_prefix(5), "KMRSU");
        assert_eq!(koch_prefix(0), "");
        assert_eq!(koch_prefix(10_000), KOCH);
    }

    #[test]
    fn test_every_koch_char_has_elements() {
        for ch in KOCH.chars() {
            assert!(elements_for(ch).is_some(), "no elements for {ch:?}");
        }
    }

    #[test]
    fn test_elements_to_display() {
        let displayed = elements_to_display(".-.").unwrap();
        assert!(displayed.contains('\u{2022}'));
        assert!(displayed.contains('\u{2501}'));
        // two dots, one dash
        assert_eq!(displayed.matches('\u{2022}').count(), 2);
        assert_eq!(displayed.matches('\u{2501}').count(), 1);
    }

    #[test]
    fn test_elements_to_display_rejects_bad_sign() {
        let result = elements_to_display(".x-");
        assert!(result.is_err());
    }

    #[test]
    fn test_char_to_display_unknown() {
        let result = char_to_display('%');
        assert!(result.is_err());
        assert!(result.unwrap_err().is_unknown_character());
    }

    #[test]
    fn test_encode() {
        assert_eq!(encode("SOS").unwrap(), "... --- ...");
        assert_eq!(encode("et").unwrap(), ". -");
    }

    #[test]
    fn test_encode_with_space() {
        assert_eq!(encode("A B").unwrap(), ".-   -...");
    }

    #[test]
    fn test_encode_unknown_char() {
        assert!(encode("A%B").is_err());
    }

    #[test]
    fn test_decode_elements() {
        assert_eq!(decode_elements("... --- ..."), "SOS");
        assert_eq!(decode_elements("-.- / --"), "K M");
    }

    #[test]
    fn test_decode_elements_unrecognized_group() {
        let decoded = decode_elements(".- ........ -");
        assert_eq!(decoded.chars().count(), 3);
        assert!(decoded.contains('\u{00bf}'));
    }
}
