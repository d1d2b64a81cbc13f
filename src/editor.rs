//! Editor abstraction for composing responses.
//!
//! When the user prefers an editor, the prompt is written as a comment
//! header into a temporary file, the editor is launched on it, and whatever
//! remains below the header becomes the response.

use crate::errors::{AppError, AppResult, EditorError};
use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::Command;
use tempfile::Builder;
use tracing::debug;

/// Lines starting with this are dropped from the response.
const COMMENT_PREFIX: &str = "#>";

/// Trait defining the interface for an editor component.
///
/// # Examples
///
/// ```
/// use rflect::editor::Editor;
/// use rflect::errors::AppResult;
/// use std::path::Path;
///
/// struct DummyEditor;
///
/// impl Editor for DummyEditor {
///     fn edit_file(&self, path: &Path) -> AppResult<()> {
///         std::fs::write(path, "typed in the editor")?;
///         Ok(())
///     }
/// }
///
/// let response = rflect::editor::compose(&DummyEditor, "How was today?").unwrap();
/// assert_eq!(response, "typed in the editor");
/// ```
pub trait Editor {
    /// Opens `path` and returns once the user is done with it.
    fn edit_file(&self, path: &Path) -> AppResult<()>;
}

/// Launches an external editor command on the file.
pub struct SystemEditor {
    /// The command to use for opening files (e.g., "vim", "code", "nano").
    pub editor_cmd: String,
}

impl Editor for SystemEditor {
    /// # Errors
    ///
    /// Returns `AppError::Editor` if the command does not exist, cannot be
    /// run, or exits with a non-zero status.
    fn edit_file(&self, path: &Path) -> AppResult<()> {
        debug!("Launching editor: {} {:?}", self.editor_cmd, path);

        match Command::new(&self.editor_cmd).arg(path).status() {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(AppError::Editor(EditorError::CommandNotFound {
                    command: self.editor_cmd.clone(),
                    source: e,
                }))
            }
            Err(e) => Err(AppError::Editor(EditorError::ExecutionFailed {
                command: self.editor_cmd.clone(),
                source: e,
            })),
            Ok(status) if !status.success() => Err(AppError::Editor(EditorError::NonZeroExit {
                command: self.editor_cmd.clone(),
                status_code: status.code().unwrap_or(-1),
            })),
            Ok(_) => Ok(()),
        }
    }
}

/// Has the user write a response to `question` in `editor`. The returned
/// text is trimmed and has the comment header removed; it may be empty.
pub fn compose(editor: &dyn Editor, question: &str) -> AppResult<String> {
    let mut file = Builder::new()
        .prefix("rflect-response-")
        .suffix(".md")
        .tempfile()?;
    writeln!(file, "{} {}", COMMENT_PREFIX, question)?;
    writeln!(
        file,
        "{} Write your response below. Lines starting with {} are ignored.",
        COMMENT_PREFIX, COMMENT_PREFIX
    )?;
    file.flush()?;

    editor.edit_file(file.path())?;

    let raw = fs::read_to_string(file.path())?;
    Ok(strip_comments(&raw))
}

fn strip_comments(raw: &str) -> String {
    raw.lines()
        .filter(|line| !line.trim_start().starts_with(COMMENT_PREFIX))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
