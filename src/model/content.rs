//! Content expressions.
//!
//! A content expression constrains the children a node type accepts. The
//! language is a sequence of terms, each naming a node type, a group, or a
//! parenthesized `|`-alternation, optionally followed by `*`, `+` or `?`:
//!
//! ```text
//! inline*            any number of inline nodes
//! block+             at least one block
//! paragraph block*   a paragraph followed by any blocks
//! (text | image)*    text and images only
//! ```
//!
//! An empty expression describes a leaf.

use super::ModelError;
use std::collections::BTreeSet;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Quantifier {
    One,
    Optional,
    ZeroOrMore,
    OneOrMore,
}

impl Quantifier {
    pub fn min(self) -> usize {
        match self {
            Quantifier::One | Quantifier::OneOrMore => 1,
            Quantifier::Optional | Quantifier::ZeroOrMore => 0,
        }
    }

    pub fn repeats(self) -> bool {
        matches!(self, Quantifier::ZeroOrMore | Quantifier::OneOrMore)
    }
}

/// One position in a content expression. `names` holds resolved node type
/// names in schema order; the first one is the default used when filling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentTerm {
    pub names: Vec<String>,
    pub quantifier: Quantifier,
}

impl ContentTerm {
    fn allows(&self, name: &str) -> bool {
        self.names.iter().any(|candidate| candidate == name)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentExpr {
    terms: Vec<ContentTerm>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Name(String),
    Open,
    Close,
    Pipe,
    Quantifier(Quantifier),
}

impl ContentExpr {
    /// Parses `expr`, resolving every name through `resolve`, which maps a
    /// node type or group name to the node type names it stands for.
    pub fn parse<F>(expr: &str, resolve: F) -> Result<Self, ModelError>
    where
        F: Fn(&str) -> Option<Vec<String>>,
    {
        let invalid = |reason: String| ModelError::InvalidContentExpr {
            expr: expr.to_string(),
            reason,
        };

        let tokens = tokenize(expr).map_err(invalid)?;
        let mut terms = Vec::new();
        let mut index = 0;
        while index < tokens.len() {
            let mut raw_names = Vec::new();
            match &tokens[index] {
                Token::Name(name) => {
                    raw_names.push(name.clone());
                    index += 1;
                }
                Token::Open => {
                    index += 1;
                    loop {
                        match tokens.get(index) {
                            Some(Token::Name(name)) => raw_names.push(name.clone()),
                            other => return Err(invalid(format!("expected a name, found {other:?}"))),
                        }
                        index += 1;
                        match tokens.get(index) {
                            Some(Token::Pipe) => index += 1,
                            Some(Token::Close) => {
                                index += 1;
                                break;
                            }
                            other => {
                                return Err(invalid(format!("expected `|` or `)`, found {other:?}")));
                            }
                        }
                    }
                }
                other => return Err(invalid(format!("unexpected {other:?}"))),
            }

            let quantifier = match tokens.get(index) {
                Some(Token::Quantifier(quantifier)) => {
                    index += 1;
                    *quantifier
                }
                _ => Quantifier::One,
            };

            let mut names = Vec::new();
            for raw in &raw_names {
                let resolved =
                    resolve(raw).ok_or_else(|| invalid(format!("no node type or group `{raw}`")))?;
                for name in resolved {
                    if !names.contains(&name) {
                        names.push(name);
                    }
                }
            }
            terms.push(ContentTerm { names, quantifier });
        }

        Ok(Self { terms })
    }

    /// True for the empty expression, i.e. a leaf node type.
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn terms(&self) -> &[ContentTerm] {
        &self.terms
    }

    /// Whether `name` may appear anywhere in this expression.
    pub fn allows(&self, name: &str) -> bool {
        self.terms.iter().any(|term| term.allows(name))
    }

    /// Every node type name mentioned by the expression, deduplicated.
    pub fn mentioned(&self) -> BTreeSet<&str> {
        self.terms
            .iter()
            .flat_map(|term| term.names.iter().map(String::as_str))
            .collect()
    }

    /// Runs the expression as an NFA over a sequence of child type names.
    pub fn accepts<'a, I>(&self, names: I) -> bool
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.run(names)
            .is_some_and(|states| states.contains(&(self.terms.len(), false)))
    }

    /// Default type names to insert after `prefix` so that `name` can come
    /// next. Empty when `name` fits right away, `None` when no run of
    /// mandatory terms makes room for it.
    pub fn fill_before<'n, I>(&self, prefix: I, name: &str) -> Option<Vec<&str>>
    where
        I: IntoIterator<Item = &'n str>,
    {
        let mut states = self.run(prefix)?;
        let mut fill = Vec::new();
        for _ in 0..=self.terms.len() {
            if !self.step(&states, name).is_empty() {
                return Some(fill);
            }
            let default = states.iter().find_map(|&(index, used)| {
                let term = self.terms.get(index)?;
                if used || term.quantifier.min() == 0 {
                    return None;
                }
                term.names.first()
            })?;
            fill.push(default.as_str());
            states = self.step(&states, default);
        }
        None
    }

    /// Matcher states after reading `names`; `None` once a name is rejected.
    /// A state is (term index, term already matched at least once).
    fn run<'a, I>(&self, names: I) -> Option<BTreeSet<(usize, bool)>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut states = self.closure(BTreeSet::from([(0usize, false)]));
        for name in names {
            states = self.step(&states, name);
            if states.is_empty() {
                return None;
            }
        }
        Some(states)
    }

    fn step(&self, states: &BTreeSet<(usize, bool)>, name: &str) -> BTreeSet<(usize, bool)> {
        let mut next = BTreeSet::new();
        for &(index, used) in states {
            let Some(term) = self.terms.get(index) else {
                continue;
            };
            if term.allows(name) && (term.quantifier.repeats() || !used) {
                next.insert((index, true));
            }
        }
        self.closure(next)
    }

    /// Type names required to satisfy the expression with no other content,
    /// one per mandatory term.
    pub fn required(&self) -> Vec<&str> {
        self.terms
            .iter()
            .filter(|term| term.quantifier.min() > 0)
            .filter_map(|term| term.names.first().map(String::as_str))
            .collect()
    }

    fn closure(&self, mut states: BTreeSet<(usize, bool)>) -> BTreeSet<(usize, bool)> {
        let mut pending: Vec<_> = states.iter().copied().collect();
        while let Some((index, used)) = pending.pop() {
            let Some(term) = self.terms.get(index) else {
                continue;
            };
            if (used || term.quantifier.min() == 0) && states.insert((index + 1, false)) {
                pending.push((index + 1, false));
            }
        }
        states
    }
}

fn tokenize(expr: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = expr.char_indices().peekable();
    while let Some((start, ch)) = chars.next() {
        match ch {
            c if c.is_whitespace() => {}
            '(' => tokens.push(Token::Open),
            ')' => tokens.push(Token::Close),
            '|' => tokens.push(Token::Pipe),
            '*' => tokens.push(Token::Quantifier(Quantifier::ZeroOrMore)),
            '+' => tokens.push(Token::Quantifier(Quantifier::OneOrMore)),
            '?' => tokens.push(Token::Quantifier(Quantifier::Optional)),
            c if c.is_alphanumeric() || c == '_' => {
                let mut end = start + c.len_utf8();
                while let Some(&(next_start, next)) = chars.peek() {
                    if next.is_alphanumeric() || next == '_' {
                        end = next_start + next.len_utf8();
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push(Token::Name(expr[start..end].to_string()));
            }
            other => return Err(format!("unexpected character `{other}`")),
        }
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve(name: &str) -> Option<Vec<String>> {
        match name {
            "inline" => Some(vec!["text".into(), "image".into(), "hard_break".into()]),
            "block" => Some(vec!["paragraph".into(), "heading".into()]),
            "text" | "image" | "hard_break" | "paragraph" | "heading" => Some(vec![name.into()]),
            _ => None,
        }
    }

    #[test]
    fn test_star_accepts_empty_and_many() {
        let expr = ContentExpr::parse("inline*", resolve).unwrap();
        assert!(expr.accepts([]));
        assert!(expr.accepts(["text", "image", "text"]));
        assert!(!expr.accepts(["paragraph"]));
    }

    #[test]
    fn test_plus_requires_one() {
        let expr = ContentExpr::parse("block+", resolve).unwrap();
        assert!(!expr.accepts([]));
        assert!(expr.accepts(["heading", "paragraph"]));
        assert_eq!(expr.required(), vec!["paragraph"]);
    }

    #[test]
    fn test_sequence_and_alternation() {
        let expr = ContentExpr::parse("paragraph (text | image)?", resolve).unwrap();
        assert!(expr.accepts(["paragraph"]));
        assert!(expr.accepts(["paragraph", "image"]));
        assert!(!expr.accepts(["paragraph", "image", "text"]));
        assert!(!expr.accepts(["image"]));
    }

    #[test]
    fn test_empty_expression_is_leaf() {
        let expr = ContentExpr::parse("", resolve).unwrap();
        assert!(expr.is_empty());
        assert!(expr.accepts([]));
        assert!(!expr.accepts(["text"]));
    }

    #[test]
    fn test_unknown_name_is_rejected() {
        let err = ContentExpr::parse("widget*", resolve).unwrap_err();
        assert!(matches!(err, ModelError::InvalidContentExpr { .. }));
    }

    #[test]
    fn test_unbalanced_parens_are_rejected() {
        assert!(ContentExpr::parse("(text | image*", resolve).is_err());
        assert!(ContentExpr::parse("text)", resolve).is_err());
        assert!(ContentExpr::parse("text & image", resolve).is_err());
    }

    #[test]
    fn test_fill_before_inserts_mandatory_terms() {
        let expr = ContentExpr::parse("paragraph block*", resolve).unwrap();
        assert_eq!(expr.fill_before([], "heading"), Some(vec!["paragraph"]));
        assert_eq!(expr.fill_before([], "paragraph"), Some(vec![]));
        assert_eq!(expr.fill_before(["paragraph"], "heading"), Some(vec![]));
        assert_eq!(expr.fill_before([], "text"), None);
        assert_eq!(expr.fill_before(["text"], "paragraph"), None);

        let expr = ContentExpr::parse("heading? paragraph", resolve).unwrap();
        assert_eq!(expr.fill_before(["paragraph"], "paragraph"), None);
        assert_eq!(expr.fill_before([], "heading"), Some(vec![]));
    }
}
