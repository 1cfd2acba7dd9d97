// Course documents: one markdown file per course and language, laid out as
// `{root}/{course}/{lang}.md`. Top-level headings (`# `) are parts and
// second-level headings (`## `) are the chapters of the current part.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::debug;

use crate::error::Result;

/// Read access to a tree of course documents.
#[derive(Debug, Clone)]
pub struct CourseLibrary {
    root: PathBuf,
}

impl CourseLibrary {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        CourseLibrary { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Title of chapter `chapter` in part `part` (both 1-based) of
    /// `course` in `lang`. `Ok(None)` when the document or chapter is absent.
    pub fn chapter_name(&self, course: &str, (part, chapter): (u32, u32), lang: &str) -> Result<Option<String>> {
        let path = self.root.join(course).join(format!("{}.md", lang));
        let text = match fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("no course document at {}", path.display());
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        Ok(find_chapter(&text, part, chapter))
    }
}

/// Locate a chapter heading in a course document by position.
pub fn find_chapter(markdown: &str, part: u32, chapter: u32) -> Option<String> {
    let mut lines = markdown.lines().map(str::trim).skip_while(|l| l.is_empty()).peekable();

    // Front matter between a leading pair of `+++` lines.
    if lines.peek() == Some(&"+++") {
        lines.next();
        for line in lines.by_ref() {
            if line == "+++" {
                break;
            }
        }
    }

    let mut current_part = 0;
    let mut current_chapter = 0;
    let mut in_fence = false;
    for line in lines {
        if line.starts_with("```") {
            in_fence = !in_fence;
            continue;
        }
        if in_fence {
            continue;
        }
        if line.starts_with("# ") {
            current_part += 1;
            current_chapter = 0;
        } else if let Some(title) = line.strip_prefix("## ") {
            current_chapter += 1;
            if current_part == part && current_chapter == chapter {
                return Some(title.trim().to_string());
            }
        }
    }
    None
}
