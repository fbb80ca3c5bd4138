use morph_core::{Highlighter, Stage, TransformError};
use syntect::html::{ClassStyle, ClassedHTMLGenerator};
use syntect::parsing::SyntaxSet;
use syntect::util::LinesWithEndings;

/// Class-based HTML highlighting. Colours come from the page stylesheet, so
/// the markup carries scope classes only.
pub struct SyntectHighlighter {
    syntaxes: SyntaxSet,
}

impl SyntectHighlighter {
    /// Loads the bundled syntax definitions. Slow enough to keep off the
    /// async executor.
    pub fn load() -> Self {
        Self {
            syntaxes: SyntaxSet::load_defaults_newlines(),
        }
    }
}

impl std::fmt::Debug for SyntectHighlighter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyntectHighlighter")
            .field("syntaxes", &self.syntaxes.syntaxes().len())
            .finish()
    }
}

impl Highlighter for SyntectHighlighter {
    fn highlight(&self, source: &str, lang: &str) -> Result<String, TransformError> {
        let syntax = self
            .syntaxes
            .find_syntax_by_token(lang)
            .unwrap_or_else(|| self.syntaxes.find_syntax_plain_text());
        let mut html =
            ClassedHTMLGenerator::new_with_class_style(syntax, &self.syntaxes, ClassStyle::Spaced);
        for line in LinesWithEndings::from(source.trim()) {
            html.parse_html_for_line_which_includes_newline(line)
                .map_err(|err| TransformError::new(Stage::Highlight, err.to_string()))?;
        }
        Ok(html.finalize())
    }
}
