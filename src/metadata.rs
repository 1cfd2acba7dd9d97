// Upload metadata derived from a video's file name. Course recordings are
// named like `btc101_2.1_es.mp4` or `ECO201-3.2-fr.MP4`: a course index,
// a `part.chapter` pair, then free-form tokens that include the language.

use std::path::Path;

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::course::CourseLibrary;

static COURSE_INDEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Za-z]+\d+)").expect("COURSE_INDEX should compile"));

static PART_CHAPTER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z]+\d+[_\-. ]+(\d+)\.(\d+)(.*)$").expect("PART_CHAPTER should compile")
});

/// Title and description sent with an upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMetadata {
    pub title: String,
    pub description: String,
}

impl VideoMetadata {
    /// Use the chapter title from the course documents when the file name
    /// carries enough coordinates and the document has that chapter; fall
    /// back to the file stem otherwise.
    pub fn resolve(path: &Path, courses: Option<&CourseLibrary>) -> Self {
        let title = courses
            .and_then(|lib| chapter_title(path, lib))
            .unwrap_or_else(|| generate_title(path));
        VideoMetadata {
            title,
            description: generate_description(path),
        }
    }
}

fn chapter_title(path: &Path, lib: &CourseLibrary) -> Option<String> {
    let course = course_index(path)?;
    let coords = part_chapter(path)?;
    let lang = language(path)?;
    match lib.chapter_name(&course, coords, &lang) {
        Ok(Some(name)) => Some(name),
        Ok(None) => {
            debug!("{} {}.{} ({}) not found under {}", course, coords.0, coords.1, lang, lib.root().display());
            None
        }
        Err(e) => {
            warn!("could not read course document for {}: {}", path.display(), e);
            None
        }
    }
}

fn stem(path: &Path) -> &str {
    path.file_stem().and_then(|s| s.to_str()).unwrap_or_default()
}

/// File name without directory or extension.
pub fn generate_title(path: &Path) -> String {
    stem(path).to_string()
}

/// Descriptions are left empty.
pub fn generate_description(_path: &Path) -> String {
    String::new()
}

/// Lowercased course index, e.g. `btc101`.
pub fn course_index(path: &Path) -> Option<String> {
    COURSE_INDEX
        .captures(stem(path))
        .map(|c| c[1].to_lowercase())
}

/// `(part, chapter)` from the `N.M` following the course index.
pub fn part_chapter(path: &Path) -> Option<(u32, u32)> {
    let caps = PART_CHAPTER.captures(stem(path))?;
    Some((caps[1].parse().ok()?, caps[2].parse().ok()?))
}

/// First two-letter token after `part.chapter`, lowercased. Region
/// suffixes such as `en-US` reduce to the language (`en`).
pub fn language(path: &Path) -> Option<String> {
    let caps = PART_CHAPTER.captures(stem(path))?;
    caps[3]
        .split(|c: char| matches!(c, '_' | '-' | '.' | ' '))
        .find(|tok| tok.len() == 2 && tok.chars().all(|c| c.is_ascii_alphabetic()))
        .map(str::to_lowercase)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn title_is_file_stem() {
        assert_eq!(generate_title(Path::new("/tmp/My Video Title.mp4")), "My Video Title");
        assert_eq!(generate_description(Path::new("/tmp/video.mp4")), "");
    }

    #[test]
    fn course_index_is_lowercased() {
        assert_eq!(course_index(Path::new("btc101_2.1_es.txt")).as_deref(), Some("btc101"));
        assert_eq!(course_index(Path::new("/path/to/ECO201-3.2-fr.MP4")).as_deref(), Some("eco201"));
        assert_eq!(course_index(Path::new("holiday.mp4")), None);
    }

    #[test]
    fn part_and_chapter() {
        assert_eq!(part_chapter(Path::new("btc101_2.1_es.txt")), Some((2, 1)));
        assert_eq!(part_chapter(Path::new("cyp201-4.7-fr.txt")), Some((4, 7)));
        assert_eq!(part_chapter(Path::new("btc101_intro.mp4")), None);
    }

    #[test]
    fn language_token() {
        assert_eq!(language(Path::new("btc101_2.1_es.txt")).as_deref(), Some("es"));
        assert_eq!(language(Path::new("btc101_2.1-es.txt")).as_deref(), Some("es"));
        assert_eq!(language(Path::new("cyp201_4.7_fr_test.txt")).as_deref(), Some("fr"));
        assert_eq!(language(Path::new("cyp201_1.1_Loic_en-US.mp4")).as_deref(), Some("en"));
        assert_eq!(language(Path::new("cyp201_1.1_Loic.mp4")), None);
    }

    #[test]
    fn resolve_prefers_chapter_title() {
        let tmp = tempfile::tempdir().unwrap();
        let dir = tmp.path().join("btc101");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("en.md"), "# Part 1\n## Intro\n# Part 2\n## Basics\n").unwrap();
        let lib = CourseLibrary::new(tmp.path());

        let meta = VideoMetadata::resolve(Path::new("/videos/BTC101_2.1_en.mp4"), Some(&lib));
        assert_eq!(meta.title, "Basics");
        assert_eq!(meta.description, "");

        let fallback = VideoMetadata::resolve(Path::new("/videos/btc101_7.1_en.mp4"), Some(&lib));
        assert_eq!(fallback.title, "btc101_7.1_en");
    }

    #[test]
    fn resolve_without_library_uses_stem() {
        let meta = VideoMetadata::resolve(Path::new("btc101_2.1_en.mp4"), None);
        assert_eq!(meta.title, "btc101_2.1_en");
    }
}
