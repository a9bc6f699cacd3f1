//! Line patch for the generated menu data file.
//!
//! The paginate stage names the menu variable after the document, so its
//! second line differs per upload. The front-end script expects one fixed
//! line there; we overwrite it instead of parsing the JavaScript.

use crate::error::BundleError;
use std::path::Path;

/// Replace the content of line `line_num` (1-based) with `text`.
///
/// The line keeps its original terminator (`\n`, `\r\n` or none at end of
/// file), so line count and every other line are unchanged.
pub fn replace_line(path: &Path, line_num: usize, text: &str) -> Result<(), BundleError> {
    let patch_err = |detail: String| BundleError::Patch {
        path: path.to_path_buf(),
        detail,
    };

    let content = std::fs::read_to_string(path).map_err(|e| patch_err(e.to_string()))?;
    let patched = replace_line_in(&content, line_num, text).ok_or_else(|| {
        patch_err(format!(
            "expected at least {} lines, found {}",
            line_num,
            content.lines().count()
        ))
    })?;
    std::fs::write(path, patched).map_err(|e| patch_err(e.to_string()))
}

/// Pure form of [`replace_line`]; `None` if there is no line `line_num`.
pub fn replace_line_in(content: &str, line_num: usize, text: &str) -> Option<String> {
    let idx = line_num.checked_sub(1)?;
    let lines: Vec<&str> = content.split_inclusive('\n').collect();
    let old = *lines.get(idx)?;

    let terminator = if old.ends_with("\r\n") {
        "\r\n"
    } else if old.ends_with('\n') {
        "\n"
    } else {
        ""
    };

    let mut out = String::with_capacity(content.len() + text.len());
    for (i, line) in lines.iter().enumerate() {
        if i == idx {
            out.push_str(text);
            out.push_str(terminator);
        } else {
            out.push_str(line);
        }
    }
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MENU_DATA_MARKER;

    const MENU: &str = "var menu_data = {\n    \"document123\": [\n        \"p1\",\n    ]\n};\n";

    #[test]
    fn replaces_second_line_only() {
        let out = replace_line_in(MENU, 2, MENU_DATA_MARKER).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), MENU.lines().count());
        assert_eq!(lines[1], MENU_DATA_MARKER);
        assert_eq!(lines[0], "var menu_data = {");
        assert_eq!(lines[2], "        \"p1\",");
        assert!(out.ends_with("};\n"));
    }

    #[test]
    fn keeps_crlf_terminator() {
        let out = replace_line_in("a\r\nb\r\nc", 2, "X").unwrap();
        assert_eq!(out, "a\r\nX\r\nc");
    }

    #[test]
    fn last_line_without_newline() {
        assert_eq!(replace_line_in("a\nb", 2, "X").unwrap(), "a\nX");
    }

    #[test]
    fn too_short_is_none() {
        assert!(replace_line_in("only one line\n", 2, "X").is_none());
        assert!(replace_line_in("", 2, "X").is_none());
        assert!(replace_line_in("a\nb\n", 0, "X").is_none());
    }

    #[test]
    fn file_patch_reports_short_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("menu_data.js");
        std::fs::write(&path, "var x = {};\n").unwrap();
        let err = replace_line(&path, 2, MENU_DATA_MARKER).unwrap_err();
        assert!(err.to_string().contains("found 1"), "got: {err}");
    }

    #[test]
    fn file_patch_rewrites_in_place() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("menu_data.js");
        std::fs::write(&path, MENU).unwrap();
        replace_line(&path, 2, MENU_DATA_MARKER).unwrap();
        let out = std::fs::read_to_string(&path).unwrap();
        assert_eq!(out.lines().nth(1), Some(MENU_DATA_MARKER));
        assert_eq!(out.lines().count(), 5);
    }
}
