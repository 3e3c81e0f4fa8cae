use crate::docs::types::TextStyle;

/// Characters with meaning in the markers we emit.
const SPECIAL: [char; 3] = ['\\', '*', '_'];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Emphasis {
    pub bold: bool,
    pub italic: bool,
    pub underline: bool,
}

impl From<&TextStyle> for Emphasis {
    fn from(style: &TextStyle) -> Self {
        Self {
            bold: style.bold,
            italic: style.italic,
            underline: style.underline,
        }
    }
}

/// Backslash-escape `*` and `_` (and the backslash itself) so literal
/// characters can't be mistaken for emphasis markers.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        if SPECIAL.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Wrap the trimmed content in markers: bold, then underline, then italic.
/// Surrounding whitespace stays outside the markers.
pub fn format(text: &str, emphasis: Emphasis) -> String {
    let core = text.trim();
    if core.is_empty() {
        return text.to_string();
    }
    let start = text.len() - text.trim_start().len();
    let end = start + core.len();

    let mut wrapped = core.to_string();
    if emphasis.bold {
        wrapped = format!("**{}**", wrapped);
    }
    if emphasis.underline {
        wrapped = format!("_{}_", wrapped);
    }
    if emphasis.italic {
        wrapped = format!("*{}*", wrapped);
    }
    format!("{}{}{}", &text[..start], wrapped, &text[end..])
}

/// Drop emphasis markers and undo `escape`.
pub fn strip_markers(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if let Some(next) = chars.next() {
                    out.push(next);
                }
            }
            '*' | '_' => {}
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_emphasis() -> Vec<Emphasis> {
        let mut out = Vec::new();
        for bits in 0..8u8 {
            out.push(Emphasis {
                bold: bits & 1 != 0,
                italic: bits & 2 != 0,
                underline: bits & 4 != 0,
            });
        }
        out
    }

    #[test]
    fn test_wrapping_order() {
        let all = Emphasis {
            bold: true,
            italic: true,
            underline: true,
        };
        assert_eq!(format("word", all), "*_**word**_*");
    }

    #[test]
    fn test_whitespace_outside_markers() {
        let bold = Emphasis {
            bold: true,
            ..Default::default()
        };
        assert_eq!(format("  hi there \n", bold), "  **hi there** \n");
    }

    #[test]
    fn test_blank_text_is_not_wrapped() {
        let bold = Emphasis {
            bold: true,
            ..Default::default()
        };
        assert_eq!(format(" \n", bold), " \n");
    }

    #[test]
    fn test_escape() {
        assert_eq!(escape("2*3 = snake_case"), "2\\*3 = snake\\_case");
        assert_eq!(escape("C:\\dir"), "C:\\\\dir");
    }

    #[test]
    fn test_round_trip_recovers_trimmed_text() {
        let samples = [
            "plain",
            "  padded words \n",
            "a*b_c",
            "**already bold**",
            "ends with backslash\\",
            "\\*_\\_",
            "ñandú _über_ *naïve*",
        ];
        for text in samples {
            for emphasis in all_emphasis() {
                let formatted = format(&escape(text), emphasis);
                assert_eq!(
                    strip_markers(&formatted).trim(),
                    text.trim(),
                    "text {:?} emphasis {:?}",
                    text,
                    emphasis
                );
            }
        }
    }
}
