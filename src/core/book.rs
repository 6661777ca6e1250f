//! Creating new books on disk

use std::fs;
use std::path::{Path, PathBuf};

use quick_xml::escape::escape;

use super::error::BookError;
use super::recents::{RecentBook, RecentKey, RecentsRepository};
use crate::document::html::PRE_WRAP_STYLE;

/// Fields of the "new book" dialog
#[derive(Debug, Clone, Default)]
pub struct NewBookForm {
    /// Book title, also used for the folder and file name
    pub name: String,
    /// Directory the book folder is created in
    pub folder: Option<PathBuf>,
    /// Optional cover image
    pub cover: Option<PathBuf>,
}

impl NewBookForm {
    /// Check the form without touching the disk
    pub fn validate(&self) -> Result<(&str, &Path), BookError> {
        let name = self.name.trim();
        let folder = self
            .folder
            .as_deref()
            .filter(|f| !f.as_os_str().is_empty());

        let Some(folder) = folder.filter(|_| !name.is_empty()) else {
            return Err(BookError::Validation(
                "Fill in the book name and choose where to save it.".to_string(),
            ));
        };

        if name == "." || name == ".." || name.contains(['/', '\\']) {
            return Err(BookError::Validation(format!(
                "\"{}\" cannot be used as a book name.",
                name
            )));
        }

        Ok((name, folder))
    }
}

/// Skeleton document for a new book
pub fn scaffold_html(title: &str) -> String {
    let title = escape(title);
    let style = PRE_WRAP_STYLE;
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <meta charset="UTF-8">
    <title>{title}</title>
    <style>{style}</style>
</head>
<body>
    <h1>{title}</h1>
    <p>Your book starts here...</p>
</body>
</html>
"#
    )
}

/// Create the book folder and document, then register it as most recent
pub fn create_book(
    form: &NewBookForm,
    recents: &mut dyn RecentsRepository,
) -> Result<RecentBook, BookError> {
    let (name, parent) = form.validate()?;

    let book_dir = parent.join(name);
    fs::create_dir_all(&book_dir).map_err(|source| BookError::Io {
        path: book_dir.clone(),
        source,
    })?;

    let html_path = book_dir.join(format!("{}.html", name));
    fs::write(&html_path, scaffold_html(name)).map_err(|source| BookError::Io {
        path: html_path.clone(),
        source,
    })?;

    let entry = RecentBook {
        name: name.to_string(),
        folder: book_dir,
        html_path,
        cover_path: form.cover.clone().unwrap_or_default(),
        created_at: chrono::Local::now().naive_local(),
    };
    recents.touch_or_insert(entry.clone(), RecentKey::CANONICAL)?;

    tracing::info!("Created book \"{}\" at {}", entry.name, entry.html_path.display());
    Ok(entry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::recents::MemoryRecents;
    use tempfile::TempDir;

    #[test]
    fn test_create_book_writes_scaffold_and_recents() {
        let dir = TempDir::new().unwrap();
        let mut recents = MemoryRecents::default();
        let form = NewBookForm {
            name: "Test".to_string(),
            folder: Some(dir.path().to_path_buf()),
            cover: None,
        };

        let entry = create_book(&form, &mut recents).unwrap();

        let html_path = dir.path().join("Test").join("Test.html");
        assert_eq!(entry.html_path, html_path);
        let html = fs::read_to_string(&html_path).unwrap();
        assert!(html.contains("<h1>Test</h1>"));
        assert_eq!(recents.books[0].folder, dir.path().join("Test"));
    }

    #[test]
    fn test_create_book_twice_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut recents = MemoryRecents::default();
        let form = NewBookForm {
            name: "  Saga ".to_string(),
            folder: Some(dir.path().to_path_buf()),
            cover: Some(PathBuf::from("/covers/saga.png")),
        };

        create_book(&form, &mut recents).unwrap();
        let entry = create_book(&form, &mut recents).unwrap();

        assert_eq!(entry.name, "Saga");
        assert_eq!(recents.books.len(), 1);
        assert_eq!(recents.books[0].cover(), Some(Path::new("/covers/saga.png")));
    }

    #[test]
    fn test_validation_happens_before_any_write() {
        let dir = TempDir::new().unwrap();
        let mut recents = MemoryRecents::default();

        for form in [
            NewBookForm {
                name: "   ".to_string(),
                folder: Some(dir.path().to_path_buf()),
                cover: None,
            },
            NewBookForm {
                name: "Book".to_string(),
                folder: None,
                cover: None,
            },
            NewBookForm {
                name: "Book".to_string(),
                folder: Some(PathBuf::new()),
                cover: None,
            },
            NewBookForm {
                name: "a/b".to_string(),
                folder: Some(dir.path().to_path_buf()),
                cover: None,
            },
        ] {
            let err = create_book(&form, &mut recents).unwrap_err();
            assert!(matches!(err, BookError::Validation(_)));
        }

        assert_eq!(recents.saves, 0);
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_unwritable_folder_leaves_recents_untouched() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("file");
        fs::write(&blocker, "").unwrap();

        let mut recents = MemoryRecents::default();
        let form = NewBookForm {
            name: "Book".to_string(),
            folder: Some(blocker),
            cover: None,
        };

        let err = create_book(&form, &mut recents).unwrap_err();
        assert!(matches!(err, BookError::Io { .. }));
        assert_eq!(recents.saves, 0);
    }

    #[test]
    fn test_scaffold_escapes_title() {
        let html = scaffold_html("Tom & Jerry <3");
        assert!(html.contains("<h1>Tom &amp; Jerry &lt;3</h1>"));
    }
}
