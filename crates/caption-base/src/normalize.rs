/// Lead-in phrases vision models like to open their answers with.
///
/// Checked in this order, first match wins. Phrases must not contain `.` or
/// `,` since the comma step below could otherwise create a new match.
pub const DEFAULT_FILLER_PREFIXES: &[&str] = &[
    "The image shows",
    "The image depicts",
    "The image features",
    "The image displays",
    "The image contains",
    "The image captures",
    "This image shows",
    "This image depicts",
    "This image features",
    "This image displays",
    "This image captures",
    "The photo shows",
    "The photo depicts",
    "This photo shows",
    "This photo depicts",
    "The picture shows",
    "The picture depicts",
    "This picture shows",
    "This picture depicts",
    "The photograph shows",
    "This photograph shows",
    "I can see",
];

/// Turns raw model output into a single line, comma delimited caption.
#[derive(Debug, Clone)]
pub struct CaptionNormalizer {
    prefixes: Vec<String>,
}

impl Default for CaptionNormalizer {
    fn default() -> Self {
        Self::new(DEFAULT_FILLER_PREFIXES.iter().map(|v| v.to_string()))
    }
}

impl CaptionNormalizer {
    /// Build a normalizer from filler phrases, tried in the given order.
    ///
    /// Blank phrases are ignored. Phrases containing `.` or `,` are skipped
    /// too, stripping them would make normalizing twice change the result.
    pub fn new(prefixes: impl IntoIterator<Item = String>) -> Self {
        Self {
            prefixes: prefixes
                .into_iter()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
                .filter(|v| {
                    let accepted = !v.contains(|c: char| c == '.' || c == ',');
                    if !accepted {
                        tracing::warn!("filler phrase {:?} contains punctuation, ignored", v);
                    }
                    accepted
                })
                .collect(),
        }
    }

    pub fn prefixes(&self) -> &[String] {
        &self.prefixes
    }

    pub fn normalize(&self, raw: &str) -> String {
        let text = raw.trim();
        let text = self.strip_filler_prefix(text);
        let text = periods_to_commas(text);
        text.trim().to_string()
    }

    /// Remove at most one filler phrase from the start of `text`.
    fn strip_filler_prefix<'a>(&self, text: &'a str) -> &'a str {
        for prefix in &self.prefixes {
            if let Some(rest) = strip_prefix_ignore_case(text, prefix) {
                return rest.trim();
            }
        }
        text
    }
}

/// Normalize with the default filler phrases.
pub fn normalize(raw: &str) -> String {
    CaptionNormalizer::default().normalize(raw)
}

/// Case-insensitive `strip_prefix` that removes exactly as many characters as
/// `prefix` has.
fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let mut chars = text.char_indices();
    for p in prefix.chars() {
        let (_, c) = chars.next()?;
        if c != p && !c.to_lowercase().eq(p.to_lowercase()) {
            return None;
        }
    }
    let offset = chars.next().map(|(idx, _)| idx).unwrap_or(text.len());
    Some(&text[offset..])
}

/// Every sentence but the last ends with a comma instead of a period.
///
/// Empty trailing segments (a closing `.`) are dropped so the caption never
/// ends with a dangling comma.
fn periods_to_commas(text: &str) -> String {
    let mut segments: Vec<&str> = text.split('.').map(str::trim).collect();
    while segments.last().is_some_and(|v| v.is_empty()) {
        segments.pop();
    }

    let last = segments.len().saturating_sub(1);
    segments
        .iter()
        .enumerate()
        .map(|(idx, segment)| {
            if idx < last {
                format!("{},", segment)
            } else {
                segment.to_string()
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_periods_become_commas() {
        assert_eq!(normalize("A cat. A dog. A bird."), "A cat, A dog, A bird");
        assert_eq!(normalize("a red car.\n\nparked outside"), "a red car, parked outside");
        assert_eq!(normalize("one.two"), "one, two");
    }

    #[test]
    fn test_no_periods() {
        assert_eq!(normalize("A single phrase"), "A single phrase");
        assert_eq!(normalize("  \n A single phrase \n"), "A single phrase");
    }

    #[test]
    fn test_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \n\t "), "");
        assert_eq!(normalize("..."), "");
    }

    #[test]
    fn test_strip_filler_prefix() {
        assert_eq!(normalize("The image shows a red car."), "a red car");
        assert_eq!(normalize("the IMAGE shows a red car"), "a red car");
        assert_eq!(normalize("I can see two dogs. One is sleeping."), "two dogs, One is sleeping");
        assert_eq!(normalize("The image shows   "), "");
        assert_eq!(normalize("The image shows."), "");
        // only matches at the start
        assert_eq!(normalize("A car, the image shows it"), "A car, the image shows it");
    }

    #[test]
    fn test_strip_only_first_matching_prefix() {
        let normalizer = CaptionNormalizer::new(vec![
            "The image".to_string(),
            "The image shows".to_string(),
        ]);
        assert_eq!(normalizer.normalize("The image shows a cat"), "shows a cat");

        let normalizer = CaptionNormalizer::new(vec![
            "The image shows".to_string(),
            "The image".to_string(),
        ]);
        assert_eq!(normalizer.normalize("The image shows a cat"), "a cat");

        // a second phrase after the stripped one is kept
        assert_eq!(
            normalize("I can see the image shows a cat"),
            "the image shows a cat"
        );
    }

    #[test]
    fn test_strip_removes_phrase_length_in_chars() {
        let normalizer = CaptionNormalizer::new(vec!["Ça montre".to_string()]);
        assert_eq!(normalizer.normalize("ÇA MONTRE un chat"), "un chat");
    }

    #[test]
    fn test_empty_prefixes_are_ignored() {
        let normalizer = CaptionNormalizer::new(vec!["  ".to_string()]);
        assert!(normalizer.prefixes().is_empty());
        assert_eq!(normalizer.normalize(" a cat. "), "a cat");
    }

    #[test]
    fn test_punctuated_prefixes_are_ignored() {
        let normalizer = CaptionNormalizer::new(vec![
            "Well,".to_string(),
            "Sure. Here".to_string(),
            "Here".to_string(),
        ]);
        assert_eq!(normalizer.prefixes(), ["Here".to_string()]);

        let once = normalizer.normalize("Well,. a cat");
        assert_eq!(normalizer.normalize(&once), once);
    }

    #[test]
    fn test_idempotent() {
        let corpus = [
            "",
            " ",
            ".",
            ". .",
            ",",
            "A cat. A dog. A bird.",
            "The image shows a red car.",
            "The image shows   ",
            "The image shows.",
            ". The image shows a cat",
            "a.. b",
            "a , b. c",
            "  leading. and trailing .  ",
            "This photo depicts a woman. She is smiling. The background is blurry.",
            "I can see\n\na mountain.\nSnow on top.",
            "3.5 inch floppy disk",
            "Error: connection refused.",
            "THE IMAGE SHOWS: a cat",
            "multi\nline\ncaption",
            "ends with comma,",
            "Ça. va.",
        ];

        for raw in corpus {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "input: {:?}", raw);
        }
    }
}
