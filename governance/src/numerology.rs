//! Pythagorean title numbers, used only as a deterministic tie-break.

/// Sum of letter values (a=1 .. i=9, j=1 ..) and digits over the title.
///
/// Case-insensitive; anything that is not an ASCII letter or digit is
/// ignored.
pub fn title_number(title: &str) -> u32 {
    title
        .chars()
        .filter_map(|c| {
            let c = c.to_ascii_lowercase();
            if c.is_ascii_lowercase() {
                Some((c as u32 - 'a' as u32) % 9 + 1)
            } else {
                c.to_digit(10)
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_letter_values() {
        assert_eq!(title_number("a"), 1);
        assert_eq!(title_number("i"), 9);
        assert_eq!(title_number("j"), 1);
        assert_eq!(title_number("z"), 8);
    }

    #[test]
    fn test_case_digits_and_punctuation() {
        assert_eq!(title_number("ABC"), title_number("abc"));
        assert_eq!(title_number("abc"), 6);
        assert_eq!(title_number("5-4-3"), 12);
        assert_eq!(title_number("Box Breathing!"), title_number("boxbreathing"));
        assert_eq!(title_number(""), 0);
    }
}
