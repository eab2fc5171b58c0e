use regex::Regex;

/// Decision-point vocabulary for the regex-fallback complexity counter.
/// JS/TS complexity is computed from the AST directly inside `dsm-lang-js`;
/// every other language shares this module.
#[derive(Debug, Clone, Copy)]
pub enum Dialect {
    /// C, C++, Java, C#, Go. `extra_keywords` carries the per-language
    /// additions (`foreach` for C#, `switch`/`select` for Go).
    CLike { extra_keywords: &'static [&'static str] },
    Python,
}

const CLIKE_KEYWORDS: &[&str] = &["if", "for", "while", "do", "case", "catch"];
const PYTHON_KEYWORDS: &[&str] = &["if", "elif", "for", "while", "except", "and", "or", "else"];

/// Strip comments and string/char literals so keywords that merely appear
/// inside them don't inflate the count.
fn strip_noise(source: &str, dialect: Dialect) -> String {
    match dialect {
        Dialect::CLike { .. } => strip_c_like(source),
        Dialect::Python => strip_python(source),
    }
}

fn strip_c_like(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let bytes = source.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        let c = bytes[i] as char;
        if c == '/' && bytes.get(i + 1) == Some(&b'/') {
            while i < bytes.len() && bytes[i] != b'\n' {
                i += 1;
            }
        } else if c == '/' && bytes.get(i + 1) == Some(&b'*') {
            i += 2;
            while i + 1 < bytes.len() && !(bytes[i] == b'*' && bytes[i + 1] == b'/') {
                i += 1;
            }
            i = (i + 2).min(bytes.len());
        } else if c == '"' || c == '\'' {
            let quote = bytes[i];
            i += 1;
            while i < bytes.len() && bytes[i] != quote {
                if bytes[i] == b'\\' {
                    i += 1;
                }
                i += 1;
            }
            i += 1;
            out.push(' ');
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}

fn strip_python(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let chars: Vec<char> = source.chars().collect();
    let mut i = 0;
    while i < chars.len() {
        let c = chars[i];
        if c == '#' {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
        } else if c == '"' || c == '\'' {
            let triple = chars.get(i + 1) == Some(&c) && chars.get(i + 2) == Some(&c);
            if triple {
                i += 3;
                while i + 2 < chars.len() && !(chars[i] == c && chars[i + 1] == c && chars[i + 2] == c)
                {
                    i += 1;
                }
                i = (i + 3).min(chars.len());
            } else {
                i += 1;
                while i < chars.len() && chars[i] != c {
                    if chars[i] == '\\' {
                        i += 1;
                    }
                    i += 1;
                }
                i += 1;
            }
            out.push(' ');
        } else {
            out.push(c);
            i += 1;
        }
    }
    out
}

fn count_whole_word(stripped: &str, word: &str) -> u32 {
    let pattern = format!(r"\b{}\b", regex::escape(word));
    Regex::new(&pattern)
        .map(|re| re.find_iter(stripped).count() as u32)
        .unwrap_or(0)
}

/// 1 + decision-point count, clamped to >= 0 (always true for unsigned).
/// A parse/read failure is not modelled here — callers return complexity 0
/// for those, bypassing this function entirely.
pub fn cyclomatic_complexity(source: &str, dialect: Dialect) -> u32 {
    let stripped = strip_noise(source, dialect);

    let keywords: Vec<&str> = match dialect {
        Dialect::CLike { extra_keywords } => CLIKE_KEYWORDS
            .iter()
            .chain(extra_keywords.iter())
            .copied()
            .collect(),
        Dialect::Python => PYTHON_KEYWORDS.to_vec(),
    };

    let mut decisions: u32 = keywords
        .iter()
        .map(|kw| count_whole_word(&stripped, kw))
        .sum();

    if let Dialect::CLike { .. } = dialect {
        decisions += stripped.matches("&&").count() as u32;
        decisions += stripped.matches("||").count() as u32;
        decisions += Regex::new(r"\?[^?.:]")
            .map(|re| re.find_iter(&stripped).count() as u32)
            .unwrap_or(0);
    }

    1 + decisions
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_branch_go_file() {
        let source = "package main\nfunc f(x int) int {\n  if x > 0 {\n    return x\n  }\n  return 0\n}\n";
        let score = cyclomatic_complexity(
            source,
            Dialect::CLike {
                extra_keywords: &["switch", "select"],
            },
        );
        assert_eq!(score, 2);
    }

    #[test]
    fn ignores_keywords_inside_strings_and_comments() {
        let source = r#"
// if this were real: for while
func f() {
  msg := "if for while"
}
"#;
        let score = cyclomatic_complexity(source, Dialect::CLike { extra_keywords: &[] });
        assert_eq!(score, 1);
    }

    #[test]
    fn python_boolean_operators_count() {
        let source = "if a and b or c:\n    pass\n";
        let score = cyclomatic_complexity(source, Dialect::Python);
        assert_eq!(score, 4);
    }

    #[test]
    fn csharp_foreach_counts_via_extra_keywords() {
        let source = "void M() { foreach (var x in xs) { } }";
        let score = cyclomatic_complexity(
            source,
            Dialect::CLike {
                extra_keywords: &["foreach"],
            },
        );
        assert_eq!(score, 2);
    }
}
