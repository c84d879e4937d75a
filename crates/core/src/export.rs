//! Front-end import script derived from the trainer's network export.
//!
//! The front-end has an import text box; loading the generated script
//! fills it with the exported network so the user can visualise it.

/// Element id of the front-end import box.
pub const IMPORT_BOX_ID: &str = "importBox";

/// Build the import script for the given export contents.
///
/// Line breaks are replaced by the two-character escape `\n` so the whole
/// export fits in one JavaScript string literal. The content is not
/// otherwise escaped.
pub fn render_import_script(export: &str) -> String {
    let body = export.split_terminator('\n').collect::<Vec<_>>().join("\\n");
    format!("document.getElementById(\"{IMPORT_BOX_ID}\").value = \"{body}\";")
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
