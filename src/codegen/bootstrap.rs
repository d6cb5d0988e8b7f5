//! Bootstrap script generation.
//!
//! The scripting runtime resolves native requires through a redirect table
//! installed at startup. The bootstrap is rebuilt from the full generated set
//! on every run, warm or cold, so a stale table can never survive an
//! incremental build. Redirect lines are sorted to keep the file byte-stable
//! across runs.

use std::fmt::Write;

use crate::codegen::context::require_path;

/// File name of the bootstrap script, at the output root.
pub const BOOTSTRAP_FILENAME: &str = "bridge.bootstrap.js";

/// Accumulates redirect entries for one build.
#[derive(Debug, Clone, Default)]
pub struct Bootstrap {
    redirects: Vec<(String, String)>,
}

impl Bootstrap {
    /// Create an empty bootstrap.
    #[must_use]
    pub fn new() -> Bootstrap {
        Bootstrap::default()
    }

    /// Redirect `Framework/Name` to the generated wrapper. A type named like
    /// its framework is covered by the module redirect and skipped.
    pub fn add_type(&mut self, framework: &str, name: &str) {
        if framework == name {
            return;
        }
        self.redirects.push((
            format!("{framework}/{name}"),
            require_path(framework, name),
        ));
    }

    /// Redirect a bare framework name to its module wrapper.
    pub fn add_module(&mut self, framework: &str) {
        self.redirects
            .push((framework.to_string(), require_path(framework, framework)));
    }

    /// Redirect a wildcard spelling to the package root.
    pub fn add_wildcard(&mut self, spelling: &str) {
        let package = spelling.trim_end_matches(".*");
        self.redirects.push((
            spelling.to_string(),
            format!("/bridge/{}", package.to_lowercase()),
        ));
    }

    /// Number of redirect entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.redirects.len()
    }

    /// `true` when no redirects were added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.redirects.is_empty()
    }

    /// Render the bootstrap script.
    #[must_use]
    pub fn render(&self) -> String {
        let mut redirects = self.redirects.clone();
        redirects.sort();
        redirects.dedup();

        let mut contents = String::new();
        let _ = writeln!(contents, "/**");
        let _ = writeln!(contents, " * Bridge bootstrap. Generated. Do not edit.");
        let _ = writeln!(contents, " */");
        let _ = writeln!(contents, "'use strict';");
        let _ = writeln!(contents);
        let _ = writeln!(contents, "var binding = global.binding;");
        let _ = writeln!(contents);
        for (from, to) in &redirects {
            let _ = writeln!(contents, "binding.redirect('{from}', '{to}');");
        }
        contents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_and_module_redirects() {
        let mut bootstrap = Bootstrap::new();
        bootstrap.add_type("UIKit", "UIView");
        bootstrap.add_module("UIKit");
        let rendered = bootstrap.render();
        assert!(rendered.contains("binding.redirect('UIKit/UIView', '/bridge/uikit/uiview');"));
        assert!(rendered.contains("binding.redirect('UIKit', '/bridge/uikit/uikit');"));
    }

    #[test]
    fn test_type_named_like_framework_is_skipped() {
        let mut bootstrap = Bootstrap::new();
        bootstrap.add_type("CoreGraphics", "CoreGraphics");
        assert!(bootstrap.is_empty());
    }

    #[test]
    fn test_wildcard_redirect() {
        let mut bootstrap = Bootstrap::new();
        bootstrap.add_wildcard("com.example.widgets.*");
        assert!(bootstrap.render().contains(
            "binding.redirect('com.example.widgets.*', '/bridge/com.example.widgets');"
        ));
    }

    #[test]
    fn test_output_is_sorted_and_deduplicated() {
        let mut bootstrap = Bootstrap::new();
        bootstrap.add_type("UIKit", "UIView");
        bootstrap.add_type("Foundation", "NSString");
        bootstrap.add_type("UIKit", "UIView");
        let rendered = bootstrap.render();
        let foundation = rendered.find("Foundation/NSString").unwrap();
        let uikit = rendered.find("UIKit/UIView").unwrap();
        assert!(foundation < uikit);
        assert_eq!(rendered.matches("UIKit/UIView").count(), 1);
    }
}
