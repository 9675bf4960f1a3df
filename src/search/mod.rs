//! Query parsing and text folding shared between the write-side index
//! triggers in `store::operations::index` and the read-side ranked search.

use unicode_normalization::UnicodeNormalization;

/// Lowercases and strips combining diacritics so `"Élève"` and `"eleve"`
/// fold to the same key.
pub fn fold(text: &str) -> String {
    text.nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

fn is_combining_mark(c: char) -> bool {
    matches!(c as u32,
        0x0300..=0x036F | 0x1AB0..=0x1AFF | 0x1DC0..=0x1DFF | 0x20D0..=0x20FF)
}

/// Splits folded text on anything that is not alphanumeric.
pub fn tokenize(text: &str) -> Vec<String> {
    fold(text)
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Term {
    Word(String),
    Prefix(String),
    Phrase(Vec<String>),
}

/// Parses the operators supported in a search query: a trailing `*` marks
/// a prefix term, `"…"` marks an exact phrase over `lemma` only, and bare
/// tokens are ANDed. Unknown syntax is treated as a plain term.
pub fn parse_query(q: &str) -> Vec<Term> {
    let mut terms = Vec::new();
    let mut chars = q.trim().chars().peekable();
    let mut buf = String::new();

    while let Some(&c) = chars.peek() {
        if c == '"' {
            chars.next();
            let mut phrase = String::new();
            for pc in chars.by_ref() {
                if pc == '"' {
                    break;
                }
                phrase.push(pc);
            }
            let words = tokenize(&phrase);
            if !words.is_empty() {
                terms.push(Term::Phrase(words));
            }
        } else if c.is_whitespace() {
            chars.next();
            flush_buf(&mut buf, &mut terms);
        } else {
            buf.push(c);
            chars.next();
        }
    }
    flush_buf(&mut buf, &mut terms);

    terms
}

fn flush_buf(buf: &mut String, terms: &mut Vec<Term>) {
    if buf.is_empty() {
        return;
    }
    if let Some(stripped) = buf.strip_suffix('*') {
        let folded = fold(stripped);
        if !folded.is_empty() {
            terms.push(Term::Prefix(folded));
        }
    } else {
        for token in tokenize(buf) {
            terms.push(Term::Word(token));
        }
    }
    buf.clear();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fold_strips_diacritics_and_lowercases() {
        assert_eq!(fold("Élève"), "eleve");
    }

    #[test]
    fn tokenize_splits_on_punctuation() {
        assert_eq!(tokenize("chat noir!"), vec!["chat", "noir"]);
    }

    #[test]
    fn parse_query_recognizes_prefix_and_phrase() {
        let terms = parse_query(r#"chat* "bon appetit" noir"#);
        assert_eq!(
            terms,
            vec![
                Term::Prefix("chat".to_string()),
                Term::Phrase(vec!["bon".to_string(), "appetit".to_string()]),
                Term::Word("noir".to_string()),
            ]
        );
    }

    #[test]
    fn plain_term_falls_back_to_word() {
        assert_eq!(parse_query("chien"), vec![Term::Word("chien".to_string())]);
    }
}
