//! Pure-Rust JavaScript minifier backing the `Minifier` capability.
//!
//! One pass over the source that drops comments and collapses whitespace.
//! String, template and regex literals are copied verbatim; template
//! substitutions are minified recursively.
//!
//! A run of whitespace containing a line break stays a single `\n` unless
//! the surrounding tokens make automatic semicolon insertion impossible
//! (after `{`, `,`, `=` and similar, or before `}`, `)`, `;` and similar).
//! Otherwise a single space is kept only where two tokens would merge.
//!
//! Output is deterministic. Input that ends inside a literal or a block
//! comment is rejected rather than guessed at.

use morph_core::{Minifier, Stage, TransformError};

#[derive(Debug, Clone, Copy, Default)]
pub struct JsMinifier;

impl JsMinifier {
    pub fn new() -> Self {
        Self
    }
}

impl Minifier for JsMinifier {
    fn minify(&self, source: &str) -> Result<String, TransformError> {
        minify_js(source)
    }
}

pub fn minify_js(input: &str) -> Result<String, TransformError> {
    let mut lexer = Lexer::new(input);
    lexer.run(false)?;
    Ok(lexer.out)
}

fn fail(message: &str) -> TransformError {
    TransformError::new(Stage::Minify, message)
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_' || ch == '$'
}

fn is_line_break(ch: char) -> bool {
    matches!(ch, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

/// Keywords after which `/` starts a regex rather than a division.
const REGEX_KEYWORDS: &[&str] = &[
    "return", "typeof", "instanceof", "in", "of", "new", "delete", "void", "throw", "case", "do",
    "else", "yield", "await",
];

/// A statement cannot end on these, so a following line break is noise.
const OPEN_BEFORE_BREAK: &[char] = &[
    '{', '(', '[', ',', ';', ':', '?', '=', '<', '>', '*', '%', '&', '|', '^', '!', '~',
];

/// A statement cannot start with these, so a preceding line break is noise.
const CLOSE_AFTER_BREAK: &[char] = &['}', ')', ']', ',', ';'];

#[derive(Clone, Copy, PartialEq, Eq)]
enum Gap {
    None,
    Space,
    Break,
}

enum Last {
    Nothing,
    Word(String),
    Punct { ch: char, doubled: bool },
    /// String, template or regex literal.
    Literal,
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    out: String,
    gap: Gap,
    last: Last,
}

impl Lexer {
    fn new(input: &str) -> Self {
        Self {
            chars: input.chars().collect(),
            pos: 0,
            out: String::with_capacity(input.len()),
            gap: Gap::None,
            last: Last::Nothing,
        }
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn widen_gap(&mut self, gap: Gap) {
        if gap == Gap::Break || self.gap == Gap::None {
            self.gap = gap;
        }
    }

    /// Lexes until end of input, or until the `}` closing a template
    /// substitution when `in_substitution` is set. That `}` is left unread.
    fn run(&mut self, in_substitution: bool) -> Result<(), TransformError> {
        let mut depth = 0usize;

        while let Some(ch) = self.peek(0) {
            if ch.is_whitespace() {
                self.widen_gap(if is_line_break(ch) { Gap::Break } else { Gap::Space });
                self.pos += 1;
                continue;
            }

            if ch == '/' && self.peek(1) == Some('/') {
                while self.peek(0).is_some_and(|c| !is_line_break(c)) {
                    self.pos += 1;
                }
                continue;
            }

            if ch == '/' && self.peek(1) == Some('*') {
                self.skip_block_comment()?;
                continue;
            }

            if ch == '}' && depth == 0 && in_substitution {
                return Ok(());
            }

            self.flush_gap(ch);

            match ch {
                '"' | '\'' => self.copy_string(ch)?,
                '`' => self.copy_template()?,
                '/' if self.regex_allowed() => self.copy_regex()?,
                c if is_word_char(c) => self.copy_word(),
                _ => {
                    match ch {
                        '{' => depth += 1,
                        '}' => depth = depth.saturating_sub(1),
                        _ => {}
                    }
                    let doubled = matches!(
                        self.last,
                        Last::Punct { ch: prev, doubled: false } if prev == ch
                    );
                    self.out.push(ch);
                    self.pos += 1;
                    self.last = Last::Punct { ch, doubled };
                }
            }
        }

        if in_substitution {
            return Err(fail("unterminated template literal"));
        }
        Ok(())
    }

    fn skip_block_comment(&mut self) -> Result<(), TransformError> {
        self.pos += 2;
        let mut gap = Gap::Space;
        loop {
            match self.peek(0) {
                None => return Err(fail("unterminated block comment")),
                Some('*') if self.peek(1) == Some('/') => {
                    self.pos += 2;
                    break;
                }
                Some(c) => {
                    if is_line_break(c) {
                        gap = Gap::Break;
                    }
                    self.pos += 1;
                }
            }
        }
        self.widen_gap(gap);
        Ok(())
    }

    fn flush_gap(&mut self, next: char) {
        let gap = std::mem::replace(&mut self.gap, Gap::None);
        let Some(prev) = self.out.chars().last() else {
            return;
        };
        if gap == Gap::None {
            return;
        }

        if gap == Gap::Break && !self.break_is_noise(prev, next) {
            self.out.push('\n');
            return;
        }

        let merges_word = is_word_char(prev) && is_word_char(next);
        // `a + +b`, `a - -b` and `a / /re/` must stay apart
        let merges_operator = (prev == '+' && next == '+')
            || (prev == '-' && next == '-')
            || (prev == '/' && (next == '/' || next == '*'));
        // `/re/ in x` would read `in` as flags
        let merges_flags =
            prev == '/' && is_word_char(next) && matches!(self.last, Last::Literal);
        // `1 .toString()` is not `1.toString()`
        let merges_number = prev.is_ascii_digit() && next == '.';
        if merges_word || merges_operator || merges_flags || merges_number {
            self.out.push(' ');
        }
    }

    fn break_is_noise(&self, prev: char, next: char) -> bool {
        if matches!(self.last, Last::Punct { .. }) && OPEN_BEFORE_BREAK.contains(&prev) {
            return true;
        }
        if CLOSE_AFTER_BREAK.contains(&next) {
            return true;
        }
        next == '.' && !self.peek(1).is_some_and(|c| c.is_ascii_digit())
    }

    fn regex_allowed(&self) -> bool {
        match &self.last {
            Last::Nothing => true,
            Last::Word(word) => REGEX_KEYWORDS.contains(&word.as_str()),
            Last::Literal => false,
            Last::Punct { ch, doubled } => match ch {
                ')' | ']' => false,
                '+' | '-' => !doubled,
                _ => true,
            },
        }
    }

    fn copy_word(&mut self) {
        let mut word = String::new();
        while let Some(c) = self.peek(0).filter(|c| is_word_char(*c)) {
            word.push(c);
            self.pos += 1;
        }
        self.out.push_str(&word);
        self.last = Last::Word(word);
    }

    fn copy_string(&mut self, quote: char) -> Result<(), TransformError> {
        self.out.push(quote);
        self.pos += 1;
        let mut escaped = false;
        loop {
            let Some(c) = self.peek(0) else {
                return Err(fail("unterminated string literal"));
            };
            if !escaped && is_line_break(c) {
                return Err(fail("unterminated string literal"));
            }
            self.out.push(c);
            self.pos += 1;
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == quote {
                break;
            }
        }
        self.last = Last::Literal;
        Ok(())
    }

    fn copy_template(&mut self) -> Result<(), TransformError> {
        self.out.push('`');
        self.pos += 1;
        let mut escaped = false;
        loop {
            let Some(c) = self.peek(0) else {
                return Err(fail("unterminated template literal"));
            };
            if !escaped && c == '$' && self.peek(1) == Some('{') {
                self.out.push_str("${");
                self.pos += 2;
                let outer = std::mem::replace(&mut self.last, Last::Nothing);
                self.gap = Gap::None;
                self.run(true)?;
                self.gap = Gap::None;
                self.last = outer;
                self.out.push('}');
                self.pos += 1;
                continue;
            }
            self.out.push(c);
            self.pos += 1;
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '`' {
                break;
            }
        }
        self.last = Last::Literal;
        Ok(())
    }

    fn copy_regex(&mut self) -> Result<(), TransformError> {
        self.out.push('/');
        self.pos += 1;
        let mut escaped = false;
        let mut in_class = false;
        loop {
            let Some(c) = self.peek(0) else {
                return Err(fail("unterminated regular expression"));
            };
            if is_line_break(c) {
                return Err(fail("unterminated regular expression"));
            }
            self.out.push(c);
            self.pos += 1;
            if escaped {
                escaped = false;
                continue;
            }
            match c {
                '\\' => escaped = true,
                '[' => in_class = true,
                ']' => in_class = false,
                '/' if !in_class => break,
                _ => {}
            }
        }
        self.last = Last::Literal;
        Ok(())
    }
}
