// Copyright (c) 2026 relaygate contributors
// SPDX-License-Identifier: AGPL-3.0
//! Command Template Expander
//!
//! Substitutes the fixed transfer markers in a command template.
//!
//! # Supported Markers
//!
//! - `#USER#` - authenticated user
//! - `#ACCOUNT#` - account of the session
//! - `#BASEPATH#` - base directory of the session
//! - `#FILE#` - file path relative to the base directory
//! - `#COMMAND#` - protocol command that triggered the hook (RETR, STOR, ...)
//!
//! Substitution repeats until no marker is left. A context value that itself
//! contains a marker never converges; callers must reject such a context with
//! [`TemplateExpander::field_with_marker`] before expanding.

use crate::domain::transfer::TransferContext;

pub const USER_MARKER: &str = "#USER#";
pub const ACCOUNT_MARKER: &str = "#ACCOUNT#";
pub const BASEPATH_MARKER: &str = "#BASEPATH#";
pub const FILE_MARKER: &str = "#FILE#";
pub const COMMAND_MARKER: &str = "#COMMAND#";

pub const MARKERS: [&str; 5] = [
    USER_MARKER,
    ACCOUNT_MARKER,
    BASEPATH_MARKER,
    FILE_MARKER,
    COMMAND_MARKER,
];

pub struct TemplateExpander;

impl TemplateExpander {
    pub fn expand(template: &str, context: &TransferContext) -> String {
        let substitutions: [(&str, &str); 5] = [
            (USER_MARKER, &context.user),
            (ACCOUNT_MARKER, &context.account),
            (BASEPATH_MARKER, &context.base_directory),
            (FILE_MARKER, &context.relative_file_path),
            (COMMAND_MARKER, context.operation_code.as_str()),
        ];

        let mut expanded = template.to_string();
        while Self::contains_marker(&expanded) {
            for (marker, value) in substitutions {
                if expanded.contains(marker) {
                    expanded = expanded.replace(marker, value);
                }
            }
        }
        expanded
    }

    pub fn contains_marker(text: &str) -> bool {
        MARKERS.iter().any(|marker| text.contains(marker))
    }

    /// First context field whose value carries a marker, if any
    pub fn field_with_marker(context: &TransferContext) -> Option<&'static str> {
        [
            ("user", context.user.as_str()),
            ("account", context.account.as_str()),
            ("base directory", context.base_directory.as_str()),
            ("file", context.relative_file_path.as_str()),
        ]
        .into_iter()
        .find(|(_, value)| Self::contains_marker(value))
        .map(|(field, _)| field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::transfer::OperationCode;

    fn context() -> TransferContext {
        TransferContext::new("alice", "billing", "/srv/ftp/alice", "out/report.pdf", OperationCode::Retr)
    }

    #[test]
    fn test_expand_all_markers() {
        let expanded = TemplateExpander::expand(
            "/opt/hooks/check.sh #USER# #ACCOUNT# #BASEPATH# #FILE# #COMMAND#",
            &context(),
        );
        assert_eq!(
            expanded,
            "/opt/hooks/check.sh alice billing /srv/ftp/alice out/report.pdf RETR"
        );
    }

    #[test]
    fn test_expand_repeated_markers() {
        let expanded = TemplateExpander::expand("#FILE#:#FILE#:#USER##USER#", &context());
        assert_eq!(expanded, "out/report.pdf:out/report.pdf:alicealice");
        assert!(!TemplateExpander::contains_marker(&expanded));
    }

    #[test]
    fn test_markers_are_case_sensitive() {
        let expanded = TemplateExpander::expand("echo #user# #USER#", &context());
        assert_eq!(expanded, "echo #user# alice");
    }

    #[test]
    fn test_template_without_markers_is_unchanged() {
        assert_eq!(TemplateExpander::expand("/bin/true", &context()), "/bin/true");
    }

    #[test]
    fn test_field_with_marker() {
        assert_eq!(TemplateExpander::field_with_marker(&context()), None);

        let mut ctx = context();
        ctx.relative_file_path = "evil#FILE#".to_string();
        assert_eq!(TemplateExpander::field_with_marker(&ctx), Some("file"));

        let mut ctx = context();
        ctx.account = "#USER#".to_string();
        assert_eq!(TemplateExpander::field_with_marker(&ctx), Some("account"));

        // Lowercase is not a marker
        let mut ctx = context();
        ctx.relative_file_path = "a#file#b".to_string();
        assert_eq!(TemplateExpander::field_with_marker(&ctx), None);
    }

    #[test]
    fn test_expansion_leaves_no_marker_for_any_combination() {
        let ctx = context();
        for mask in 0u32..32 {
            let template: String = MARKERS
                .iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, m)| format!("a{}b", m))
                .collect::<Vec<_>>()
                .join(" ");
            let expanded = TemplateExpander::expand(&template, &ctx);
            assert!(!TemplateExpander::contains_marker(&expanded), "mask {}", mask);
        }
    }
}
