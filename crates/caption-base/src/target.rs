use std::{
    cmp::Ordering,
    iter::Peekable,
    path::{Path, PathBuf},
    str::Chars,
};

/// Extension of the caption file stored next to every image.
pub const CAPTION_EXTENSION: &str = "txt";

/// Image extensions offered for captioning, compared case-insensitively.
pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "webp"];

/// A captionable image on disk.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageRef {
    path: PathBuf,
}

impl ImageRef {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|v| v.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    /// Same directory and base name, extension replaced by [`CAPTION_EXTENSION`].
    pub fn sidecar_path(&self) -> PathBuf {
        self.path.with_extension(CAPTION_EXTENSION)
    }

    pub fn is_supported(path: impl AsRef<Path>) -> bool {
        path.as_ref()
            .extension()
            .and_then(|v| v.to_str())
            .map(|ext| {
                SUPPORTED_IMAGE_EXTENSIONS
                    .iter()
                    .any(|supported| supported.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

impl From<PathBuf> for ImageRef {
    fn from(path: PathBuf) -> Self {
        Self { path }
    }
}

impl std::fmt::Display for ImageRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.path.display())
    }
}

/// Sort targets the way a file browser lists them.
pub fn sort_targets(targets: impl IntoIterator<Item = ImageRef>) -> Vec<ImageRef> {
    let mut targets: Vec<ImageRef> = targets.into_iter().collect();
    targets.sort_by(|a, b| {
        compare_file_names(&a.file_name(), &b.file_name()).then_with(|| a.path.cmp(&b.path))
    });
    targets.dedup();
    targets
}

/// Locale-aware filename comparison: case-insensitive, with runs of digits
/// compared by numeric value (`img2` < `img10`).
///
/// Names that only differ by case or leading zeros fall back to a plain
/// comparison so the order stays total.
pub fn compare_file_names(a: &str, b: &str) -> Ordering {
    let mut left = a.chars().peekable();
    let mut right = b.chars().peekable();

    loop {
        match (left.peek().copied(), right.peek().copied()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) if l.is_ascii_digit() && r.is_ascii_digit() => {
                let l = take_digits(&mut left);
                let r = take_digits(&mut right);
                let ordering = compare_digit_runs(&l, &r);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            (Some(l), Some(r)) => {
                left.next();
                right.next();
                let ordering = l.to_lowercase().cmp(r.to_lowercase());
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
        }
    }
}

fn take_digits(chars: &mut Peekable<Chars<'_>>) -> String {
    let mut digits = String::new();
    while let Some(c) = chars.next_if(|c| c.is_ascii_digit()) {
        digits.push(c);
    }
    digits
}

fn compare_digit_runs(a: &str, b: &str) -> Ordering {
    let a = a.trim_start_matches('0');
    let b = b.trim_start_matches('0');
    a.len().cmp(&b.len()).then_with(|| a.cmp(b))
}
