//! "Did you mean" suggestions for unresolved type names.
//!
//! Uses a soundex-style phonetic code: names that sound alike map to the same
//! code, so `UIVew` suggests `UIView`. Suggestions downgrade an unresolved
//! seed from fatal to a warning; a typo should not hide the hint behind a
//! build failure.

/// Phonetic code for `text`.
///
/// Non-letters are ignored, the first letter is kept verbatim, and the rest
/// collapse to digit classes with adjacent duplicates removed. `scale` grows
/// the code for long names instead of always truncating to three digits.
#[must_use]
pub fn sound_ex(text: &str, scale: bool) -> String {
    let letters: Vec<char> = text
        .to_uppercase()
        .chars()
        .filter(char::is_ascii_uppercase)
        .collect();
    let Some(first_letter) = letters.first().copied() else {
        return String::new();
    };

    let codes: Vec<Option<u8>> = letters.iter().map(|letter| digit_class(*letter)).collect();
    let first_code = codes[0];

    let mut build: Vec<Option<u8>> = Vec::new();
    for (index, code) in codes[1..].iter().enumerate() {
        let previous = if index == 0 {
            first_code
        } else {
            codes[index]
        };
        if *code != previous {
            build.push(*code);
        }
    }

    let digits: String = build
        .iter()
        .filter_map(|code| code.map(|digit| char::from(b'0' + digit)))
        .collect();

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let max = if scale {
        let scaled = (build.len() as f64 * 2.0 / 3.5) as usize;
        scaled.max(3)
    } else {
        3
    };

    let mut padded = digits;
    while padded.len() < max {
        padded.push('0');
    }
    padded.truncate(max);

    let mut result = String::with_capacity(1 + max);
    result.push(first_letter);
    result.push_str(&padded);
    result
}

fn digit_class(letter: char) -> Option<u8> {
    match letter {
        'B' | 'F' | 'P' | 'V' => Some(1),
        'C' | 'G' | 'J' | 'K' | 'Q' | 'S' | 'X' | 'Z' => Some(2),
        'D' | 'T' => Some(3),
        'L' => Some(4),
        'M' | 'N' => Some(5),
        'R' => Some(6),
        _ => None,
    }
}

/// Known names that sound like `name`.
#[must_use]
pub fn suggestions<'a>(name: &str, known: impl Iterator<Item = &'a str>) -> Vec<String> {
    let wanted = sound_ex(name, false);
    if wanted.is_empty() {
        return Vec::new();
    }
    known
        .filter(|candidate| sound_ex(candidate, false) == wanted)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classic_codes() {
        assert_eq!(sound_ex("Robert", false), "R163");
        assert_eq!(sound_ex("Rupert", false), "R163");
        assert_eq!(sound_ex("Tymczak", false), "T522");
    }

    #[test]
    fn test_typo_matches_original() {
        assert_eq!(sound_ex("UIVew", false), sound_ex("UIView", false));
        assert_ne!(sound_ex("UIView", false), sound_ex("NSString", false));
    }

    #[test]
    fn test_non_letters_ignored() {
        assert_eq!(sound_ex("UI-View_2", false), sound_ex("UIView", false));
        assert_eq!(sound_ex("123", false), "");
    }

    #[test]
    fn test_suggestions_filter() {
        let known = ["UIView", "UILabel", "NSString"];
        let found = suggestions("UIVew", known.iter().copied());
        assert_eq!(found, vec!["UIView".to_string()]);
        assert!(suggestions("Zzzzq", known.iter().copied()).is_empty());
    }
}
