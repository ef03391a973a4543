//! Content pools: regex challenges and call-stack signatures
//!
//! Challenges are multiple choice: "which string matches this pattern?".
//! A challenge is only handed out after the pattern is checked against every
//! choice and exactly the declared answer matches.

use serde::{Deserialize, Serialize};

use super::{ProceduralGenerator, Tiered};

/// Regex subset: `^ $ . * + ?`, `\d \w \s`, escapes and `[...]` classes
#[derive(Debug, Clone, PartialEq)]
pub struct Regex {
    anchored_start: bool,
    anchored_end: bool,
    items: Vec<(Atom, Quant)>,
}

#[derive(Debug, Clone, PartialEq)]
enum Atom {
    Any,
    Char(char),
    Digit,
    Word,
    Space,
    Class { negated: bool, ranges: Vec<(char, char)> },
}

impl Atom {
    fn matches(&self, c: char) -> bool {
        match self {
            Atom::Any => true,
            Atom::Char(want) => c == *want,
            Atom::Digit => c.is_ascii_digit(),
            Atom::Word => c.is_ascii_alphanumeric() || c == '_',
            Atom::Space => c.is_whitespace(),
            Atom::Class { negated, ranges } => {
                let hit = ranges.iter().any(|&(lo, hi)| lo <= c && c <= hi);
                hit != *negated
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quant {
    One,
    Star,
    Plus,
    Maybe,
}

impl Regex {
    /// Compile a pattern; `None` if it uses anything outside the subset
    pub fn parse(pattern: &str) -> Option<Regex> {
        let mut chars = pattern.chars().peekable();
        let anchored_start = chars.next_if_eq(&'^').is_some();
        let mut items = Vec::new();
        let mut anchored_end = false;

        while let Some(c) = chars.next() {
            let atom = match c {
                '$' if chars.peek().is_none() => {
                    anchored_end = true;
                    break;
                }
                '.' => Atom::Any,
                '\\' => match chars.next()? {
                    'd' => Atom::Digit,
                    'w' => Atom::Word,
                    's' => Atom::Space,
                    other => Atom::Char(other),
                },
                '[' => {
                    let negated = chars.next_if_eq(&'^').is_some();
                    let mut ranges = Vec::new();
                    loop {
                        let lo = chars.next()?;
                        if lo == ']' {
                            break;
                        }
                        if chars.next_if_eq(&'-').is_some() {
                            let hi = chars.next()?;
                            ranges.push((lo, hi));
                        } else {
                            ranges.push((lo, lo));
                        }
                    }
                    Atom::Class { negated, ranges }
                }
                '*' | '+' | '?' | '(' | ')' | '{' | '}' | '|' | '^' | '$' => return None,
                other => Atom::Char(other),
            };
            let quant = match chars.peek() {
                Some('*') => Quant::Star,
                Some('+') => Quant::Plus,
                Some('?') => Quant::Maybe,
                _ => Quant::One,
            };
            if quant != Quant::One {
                chars.next();
            }
            items.push((atom, quant));
        }

        Some(Regex {
            anchored_start,
            anchored_end,
            items,
        })
    }

    pub fn is_match(&self, text: &str) -> bool {
        let chars: Vec<char> = text.chars().collect();
        if self.anchored_start {
            return self.match_here(&self.items, &chars);
        }
        (0..=chars.len()).any(|start| self.match_here(&self.items, &chars[start..]))
    }

    fn match_here(&self, items: &[(Atom, Quant)], text: &[char]) -> bool {
        let Some(((atom, quant), rest)) = items.split_first() else {
            return !self.anchored_end || text.is_empty();
        };
        let first = text.first().is_some_and(|c| atom.matches(*c));
        match quant {
            Quant::One => first && self.match_here(rest, &text[1..]),
            Quant::Maybe => {
                (first && self.match_here(rest, &text[1..])) || self.match_here(rest, text)
            }
            Quant::Star | Quant::Plus => {
                let min = usize::from(*quant == Quant::Plus);
                let run = text.iter().take_while(|c| atom.matches(**c)).count();
                (min..=run).rev().any(|n| self.match_here(rest, &text[n..]))
            }
        }
    }
}

/// Multiple-choice pattern question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Challenge {
    pub prompt: String,
    pub pattern: String,
    pub choices: Vec<String>,
    pub answer: usize,
    pub tier: u32,
}

impl Challenge {
    pub fn new(pattern: &str, choices: &[&str], answer: usize, tier: u32) -> Self {
        Self {
            prompt: format!("Which string matches /{pattern}/ ?"),
            pattern: pattern.to_string(),
            choices: choices.iter().map(|c| c.to_string()).collect(),
            answer,
            tier,
        }
    }

    pub fn is_correct(&self, choice: usize) -> bool {
        choice == self.answer
    }

    /// The pattern compiles and matches the declared answer and nothing else
    pub fn validate(&self) -> bool {
        let Some(regex) = Regex::parse(&self.pattern) else {
            return false;
        };
        let matching: Vec<usize> = self
            .choices
            .iter()
            .enumerate()
            .filter(|(_, c)| regex.is_match(c))
            .map(|(i, _)| i)
            .collect();
        matching == [self.answer]
    }

    /// Always-valid replacement for a rejected challenge
    pub fn fallback() -> Self {
        Challenge::new("^ok$", &["ok", "no", "okay"], 0, 1)
    }
}

struct ChallengeSeed {
    pattern: &'static str,
    choices: [&'static str; 4],
    answer: usize,
    tier: u32,
}

impl Tiered for ChallengeSeed {
    fn tier(&self) -> u32 {
        self.tier
    }
}

const fn seed(pattern: &'static str, choices: [&'static str; 4], answer: usize, tier: u32) -> ChallengeSeed {
    ChallengeSeed {
        pattern,
        choices,
        answer,
        tier,
    }
}

const CHALLENGES: &[ChallengeSeed] = &[
    seed("^a+b$", ["aab", "abb", "ba", "b"], 0, 1),
    seed("^cat$", ["cats", "cat", "scat", "ca"], 1, 1),
    seed("^\\d\\d$", ["7", "a1", "42", "123"], 2, 1),
    seed("^colou?r$", ["colour", "colr", "coulor", "colouur"], 0, 2),
    seed("^[a-c]+$", ["abcd", "cab", "ABC", ""], 1, 2),
    seed("^h.t$", ["hot", "ht", "heat", "hoot"], 0, 2),
    seed("^\\w+@\\w+\\.com$", ["me@site.org", "@site.com", "me@site.com", "me site.com"], 2, 3),
    seed("^[^0-9]+$", ["abc1", "hello", "123", "a2c"], 1, 3),
    seed("^x*y?z$", ["xxyyz", "z", "xy", "yzz"], 1, 3),
    seed("^[A-Z][a-z]*\\d?$", ["alice1", "Bob", "BOB2", "Eve12"], 1, 4),
    seed("^\\s*return\\s+\\w+;$", ["return x;", "returnx;", "return ;", " return"], 0, 4),
    seed("^[^aeiou]+$", ["rhythm", "vowel", "aa", "quiet"], 0, 4),
];

pub(super) fn generate_challenge(generator: &mut ProceduralGenerator, max_tier: u32) -> Challenge {
    let Some(picked) = generator.pick_tiered(CHALLENGES, max_tier) else {
        return Challenge::fallback();
    };
    let challenge = Challenge::new(picked.pattern, &picked.choices, picked.answer, picked.tier);
    if challenge.validate() {
        challenge
    } else {
        log::warn!("rejected challenge /{}/, using fallback", challenge.pattern);
        Challenge::fallback()
    }
}

struct Signature {
    text: &'static str,
    tier: u32,
}

impl Tiered for Signature {
    fn tier(&self) -> u32 {
        self.tier
    }
}

const SIGNATURES: &[Signature] = &[
    Signature { text: "main()", tier: 1 },
    Signature { text: "init()", tier: 1 },
    Signature { text: "draw()", tier: 1 },
    Signature { text: "update(dt)", tier: 1 },
    Signature { text: "render(view)", tier: 2 },
    Signature { text: "fetchUser(id)", tier: 2 },
    Signature { text: "parse(src)", tier: 2 },
    Signature { text: "validate(form)", tier: 2 },
    Signature { text: "reduce(acc, item)", tier: 3 },
    Signature { text: "walk(node, depth)", tier: 3 },
    Signature { text: "resolve(path, base)", tier: 3 },
    Signature { text: "dispatch(action, store, next)", tier: 4 },
    Signature { text: "compile(ast, scope, opts)", tier: 4 },
];

pub(super) fn generate_signature(generator: &mut ProceduralGenerator, max_tier: u32) -> (String, u32) {
    match generator.pick_tiered(SIGNATURES, max_tier) {
        Some(sig) => (sig.text.to_string(), sig.tier),
        None => ("main()".to_string(), 1),
    }
}
