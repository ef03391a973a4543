//! Snippet grammar
//!
//! A small statement grammar used to decide whether a falling snippet is
//! well-formed. A snippet is valid if it is one of the seed literals, or if
//! the structural parser consumes every token as exactly one statement:
//!
//! ```text
//! stmt  := ("const" | "let" | "var") ident "=" expr ";"
//!        | "return" expr ";"
//!        | "if" "(" expr ")" block ("else" block)?
//!        | expr ";"
//! block := "{" stmt* "}"
//! expr  := unary (binop unary)*
//! unary := ("!" | "-" | "+" | "await")* postfix
//! postfix := primary ("." ident | "(" args ")" | "[" expr "]")* ("++" | "--")?
//! primary := ident | number | string | "(" expr ")"
//! ```
//!
//! Broken snippets are produced by corrupting a valid literal and checking
//! the corruption really fails validation.

use rand::Rng;

use super::{ProceduralGenerator, Tiered};
use crate::sim::entity::SnippetClass;

/// Operators recognised as single tokens, longest first
const MULTI_CHAR_OPS: &[&str] = &[
    "===", "!==", "==", "!=", "<=", ">=", "&&", "||", "=>", "++", "--", "+=", "-=", "*=", "/=",
];

const KEYWORDS: &[&str] = &[
    "const", "let", "var", "return", "if", "else", "for", "while", "function", "await", "new",
];

const BINARY_OPS: &[&str] = &[
    "+", "-", "*", "/", "%", "===", "!==", "==", "!=", "<", ">", "<=", ">=", "&&", "||", "=",
    "+=", "-=", "*=", "/=",
];

/// Replacement used when no corruption of a literal fails validation
const FALLBACK_BROKEN: &str = "let = ;";

/// Percent chance a snippet is a bonus snippet
const BONUS_PERCENT: u32 = 8;

/// Percent chance a snippet is broken at tier 1; grows 5 per tier
const BROKEN_BASE_PERCENT: u32 = 35;

struct Literal {
    text: &'static str,
    tier: u32,
}

impl Tiered for Literal {
    fn tier(&self) -> u32 {
        self.tier
    }
}

const fn lit(text: &'static str, tier: u32) -> Literal {
    Literal { text, tier }
}

/// Known-good statements
const LITERALS: &[Literal] = &[
    lit("let x = 5;", 1),
    lit("const name = 'ada';", 1),
    lit("var count = 0;", 1),
    lit("return total;", 1),
    lit("x++;", 1),
    lit("console.log(x);", 1),
    lit("if (ok) { }", 1),
    lit("let sum = a + b;", 2),
    lit("return a * b;", 2),
    lit("if (x > 0) { }", 2),
    lit("const ready = done && ok;", 2),
    lit("items.push(item);", 2),
    lit("while (i < n) { i++; }", 2),
    lit("const area = w * h / 2;", 3),
    lit("if (a === b) { return a; }", 3),
    lit("return (a + b) * c;", 3),
    lit("for (let i = 0; i < n; i++) { }", 3),
    lit("let double = (x) => x * 2;", 3),
    lit("const user = await fetch(url);", 4),
    lit("if (a && (b || c)) { } else { }", 4),
    lit("return items.map((x) => x + 1);", 4),
    lit("function add(a, b) { return a + b; }", 4),
];

/// Ways to break a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Corruption {
    /// Remove the final `;` or `}`
    DropTerminator,
    /// Swap the first bracket with its partner
    SwapBrackets,
    /// Remove the token after the first `=`
    DropOperand,
    /// Misspell the leading keyword
    Misspell,
}

impl Corruption {
    pub const ALL: [Corruption; 4] = [
        Corruption::DropTerminator,
        Corruption::SwapBrackets,
        Corruption::DropOperand,
        Corruption::Misspell,
    ];
}

/// A snippet ready to spawn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedSnippet {
    pub text: String,
    pub class: SnippetClass,
    pub tier: u32,
}

/// Split source text into tokens
pub fn tokenize(src: &str) -> Vec<String> {
    let chars: Vec<char> = src.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    'outer: while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
            continue;
        }
        if is_word_char(c) {
            let start = i;
            while i < chars.len() && is_word_char(chars[i]) {
                i += 1;
            }
            tokens.push(chars[start..i].iter().collect());
            continue;
        }
        if c == '\'' || c == '"' {
            let start = i;
            i += 1;
            while i < chars.len() && chars[i] != c {
                i += 1;
            }
            i = (i + 1).min(chars.len());
            tokens.push(chars[start..i].iter().collect());
            continue;
        }
        for len in [3, 2] {
            if i + len <= chars.len() {
                let op: String = chars[i..i + len].iter().collect();
                if MULTI_CHAR_OPS.contains(&op.as_str()) {
                    tokens.push(op);
                    i += len;
                    continue 'outer;
                }
            }
        }
        tokens.push(c.to_string());
        i += 1;
    }
    tokens
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

fn is_identifier(tok: &str) -> bool {
    let mut chars = tok.chars();
    match chars.next() {
        Some(c) if c.is_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    !KEYWORDS.contains(&tok) && chars.all(is_word_char)
}

fn is_number(tok: &str) -> bool {
    tok.chars().next().is_some_and(|c| c.is_ascii_digit()) && tok.chars().all(|c| c.is_ascii_alphanumeric())
}

fn is_string(tok: &str) -> bool {
    let bytes = tok.as_bytes();
    bytes.len() >= 2
        && (bytes[0] == b'\'' || bytes[0] == b'"')
        && bytes[bytes.len() - 1] == bytes[0]
}

struct Parser<'a> {
    tokens: &'a [String],
    pos: usize,
}

impl<'a> Parser<'a> {
    fn peek(&self) -> Option<&'a str> {
        self.tokens.get(self.pos).map(String::as_str)
    }

    fn bump(&mut self) {
        self.pos += 1;
    }

    fn eat(&mut self, expected: &str) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    fn statement(&mut self) -> bool {
        match self.peek() {
            Some("const" | "let" | "var") => {
                self.bump();
                self.identifier() && self.eat("=") && self.expr() && self.eat(";")
            }
            Some("return") => {
                self.bump();
                self.expr() && self.eat(";")
            }
            Some("if") => {
                self.bump();
                if !(self.eat("(") && self.expr() && self.eat(")") && self.block()) {
                    return false;
                }
                if self.eat("else") {
                    return self.block();
                }
                true
            }
            Some(_) => self.expr() && self.eat(";"),
            None => false,
        }
    }

    fn block(&mut self) -> bool {
        if !self.eat("{") {
            return false;
        }
        loop {
            match self.peek() {
                Some("}") => {
                    self.bump();
                    return true;
                }
                Some(_) => {
                    if !self.statement() {
                        return false;
                    }
                }
                None => return false,
            }
        }
    }

    fn identifier(&mut self) -> bool {
        match self.peek() {
            Some(tok) if is_identifier(tok) => {
                self.bump();
                true
            }
            _ => false,
        }
    }

    fn expr(&mut self) -> bool {
        if !self.unary() {
            return false;
        }
        while let Some(op) = self.peek() {
            if !BINARY_OPS.contains(&op) {
                break;
            }
            self.bump();
            if !self.unary() {
                return false;
            }
        }
        true
    }

    fn unary(&mut self) -> bool {
        while matches!(self.peek(), Some("!" | "-" | "+" | "await")) {
            self.bump();
        }
        self.postfix()
    }

    fn postfix(&mut self) -> bool {
        if !self.primary() {
            return false;
        }
        loop {
            match self.peek() {
                Some(".") => {
                    self.bump();
                    if !self.identifier() {
                        return false;
                    }
                }
                Some("(") => {
                    self.bump();
                    if !self.arguments() {
                        return false;
                    }
                }
                Some("[") => {
                    self.bump();
                    if !(self.expr() && self.eat("]")) {
                        return false;
                    }
                }
                Some("++" | "--") => {
                    self.bump();
                    return true;
                }
                _ => return true,
            }
        }
    }

    /// Argument list after the opening paren
    fn arguments(&mut self) -> bool {
        if self.eat(")") {
            return true;
        }
        loop {
            if !self.expr() {
                return false;
            }
            if self.eat(")") {
                return true;
            }
            if !self.eat(",") {
                return false;
            }
        }
    }

    fn primary(&mut self) -> bool {
        match self.peek() {
            Some("(") => {
                self.bump();
                self.expr() && self.eat(")")
            }
            Some(tok) if is_identifier(tok) || is_number(tok) || is_string(tok) => {
                self.bump();
                true
            }
            _ => false,
        }
    }
}

fn is_literal(tokens: &[String]) -> bool {
    LITERALS.iter().any(|l| tokenize(l.text) == tokens)
}

/// Whether a token sequence is a well-formed statement
pub fn validate(tokens: &[String]) -> bool {
    if tokens.is_empty() {
        return false;
    }
    if is_literal(tokens) {
        return true;
    }
    let mut parser = Parser { tokens, pos: 0 };
    parser.statement() && parser.pos == tokens.len()
}

pub fn validate_str(src: &str) -> bool {
    validate(&tokenize(src))
}

/// Apply one corruption; `None` if it does not apply to these tokens
pub fn corrupt(tokens: &[String], corruption: Corruption) -> Option<Vec<String>> {
    let mut out = tokens.to_vec();
    match corruption {
        Corruption::DropTerminator => {
            out.pop()?;
        }
        Corruption::SwapBrackets => {
            let open = out.iter().position(|t| t == "(" || t == "{" || t == "[")?;
            let close_tok = match out[open].as_str() {
                "(" => ")",
                "{" => "}",
                _ => "]",
            };
            let close = open + out[open..].iter().position(|t| t == close_tok)?;
            out.swap(open, close);
        }
        Corruption::DropOperand => {
            let eq = out.iter().position(|t| t == "=")?;
            if eq + 1 >= out.len() {
                return None;
            }
            out.remove(eq + 1);
        }
        Corruption::Misspell => {
            let idx = out.iter().position(|t| KEYWORDS.contains(&t.as_str()))?;
            let mut chars: Vec<char> = out[idx].chars().collect();
            if chars.len() < 2 {
                return None;
            }
            let n = chars.len();
            chars.swap(n - 2, n - 1);
            out[idx] = chars.into_iter().collect();
        }
    }
    Some(out)
}

/// Join tokens back into display text
pub fn render(tokens: &[String]) -> String {
    tokens.join(" ")
}

/// Corrupt `text`, starting with `first` and trying the others in order,
/// until the result fails validation
pub fn break_snippet(text: &str, first: Corruption) -> String {
    let tokens = tokenize(text);
    let start = Corruption::ALL.iter().position(|c| *c == first).unwrap_or(0);
    for offset in 0..Corruption::ALL.len() {
        let corruption = Corruption::ALL[(start + offset) % Corruption::ALL.len()];
        if let Some(broken) = corrupt(&tokens, corruption) {
            if !validate(&broken) {
                return render(&broken);
            }
        }
    }
    log::warn!("no corruption broke {text:?}, using fallback");
    FALLBACK_BROKEN.to_string()
}

pub(super) fn generate_snippet(generator: &mut ProceduralGenerator, max_tier: u32) -> GeneratedSnippet {
    let Some(literal) = generator.pick_tiered(LITERALS, max_tier) else {
        return GeneratedSnippet {
            text: FALLBACK_BROKEN.to_string(),
            class: SnippetClass::Broken,
            tier: 1,
        };
    };

    let roll: u32 = generator.rng().random_range(0..100);
    let broken_percent = BROKEN_BASE_PERCENT + 5 * max_tier.saturating_sub(1);

    let class = if roll < BONUS_PERCENT {
        SnippetClass::Bonus
    } else if roll < BONUS_PERCENT + broken_percent {
        SnippetClass::Broken
    } else {
        SnippetClass::Valid
    };

    let text = match class {
        SnippetClass::Broken => {
            let first = Corruption::ALL[generator.index(Corruption::ALL.len())];
            break_snippet(literal.text, first)
        }
        _ => literal.text.to_string(),
    };

    GeneratedSnippet {
        text,
        class,
        tier: literal.tier,
    }
}

/// Every seed literal, for tests and tooling
pub fn literals() -> impl Iterator<Item = (&'static str, u32)> {
    LITERALS.iter().map(|l| (l.text, l.tier))
}
