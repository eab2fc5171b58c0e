use std::collections::HashMap;

use regex::Regex;
use tree_sitter::{Language, Node, Parser, Query, QueryCursor, StreamingIterator, Tree};

use dsm_core::analyzer::{AnalyzerOptions, FileAnalysis, LanguageAnalysis, LanguageAnalyzer};
use dsm_core::symbols::wildcard_weight;
use dsm_core::types::LanguageTag;

const EXPORT_NAME_QUERY_SRC: &str = r#"
(export_statement
  declaration: [
    (function_declaration name: (identifier) @name)
    (class_declaration name: (_) @name)
    (lexical_declaration (variable_declarator name: (identifier) @name))
    (variable_declaration (variable_declarator name: (identifier) @name))
  ])
(export_statement (export_clause (export_specifier name: (identifier) @name)))
"#;

const EXPORT_STATEMENT_QUERY_SRC: &str = r#"(export_statement) @stmt"#;

const IMPORT_STATEMENT_QUERY_SRC: &str = r#"
(import_statement source: (string) @source) @stmt
"#;

const SCRIPT_BLOCK: &str = r#"(?s)<script[^>]*>(.*?)</script>"#;

/// A file's exported surface, as seen by the index pass: named top-level
/// exports plus whether it has a
/// default export.
#[derive(Default, Clone)]
struct ExportSet {
    named: Vec<String>,
    has_default: bool,
}

enum Specifier {
    Default,
    Namespace,
    Named(String),
}

struct ImportClause {
    source: String,
    specifiers: Vec<Specifier>,
    type_only: bool,
}

/// Queries compiled against one specific grammar (ts vs tsx). A `Query` is
/// tied to the `Language` it was compiled from, so ts and tsx files each
/// need their own set rather than sharing one compiled against either.
struct QuerySet {
    export_name_query: Query,
    export_stmt_query: Query,
    import_query: Query,
}

fn compile_queries(language: &Language) -> anyhow::Result<QuerySet> {
    Ok(QuerySet {
        export_name_query: Query::new(language, EXPORT_NAME_QUERY_SRC)?,
        export_stmt_query: Query::new(language, EXPORT_STATEMENT_QUERY_SRC)?,
        import_query: Query::new(language, IMPORT_STATEMENT_QUERY_SRC)?,
    })
}

pub struct JsAnalyzer {
    ts_language: Language,
    tsx_language: Language,
    ts_queries: QuerySet,
    tsx_queries: QuerySet,
    script_block: Regex,
}

impl JsAnalyzer {
    pub fn new() -> anyhow::Result<Self> {
        let ts_language: Language = tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into();
        let tsx_language: Language = tree_sitter_typescript::LANGUAGE_TSX.into();
        let ts_queries = compile_queries(&ts_language)?;
        let tsx_queries = compile_queries(&tsx_language)?;
        Ok(Self {
            ts_language,
            tsx_language,
            ts_queries,
            tsx_queries,
            script_block: Regex::new(SCRIPT_BLOCK).expect("valid regex"),
        })
    }

    fn language_for(&self, path: &str) -> &Language {
        if path.ends_with(".tsx") || path.ends_with(".jsx") {
            &self.tsx_language
        } else {
            &self.ts_language
        }
    }

    fn queries_for(&self, path: &str) -> &QuerySet {
        if path.ends_with(".tsx") || path.ends_with(".jsx") {
            &self.tsx_queries
        } else {
            &self.ts_queries
        }
    }

    /// `.vue` single-file components wrap their logic in a `<script>`
    /// block; everything else parses directly.
    fn source_for<'a>(&self, path: &str, content: &'a str) -> Option<&'a str> {
        if path.ends_with(".vue") {
            self.script_block
                .captures(content)
                .and_then(|c| c.get(1))
                .map(|m| m.as_str())
        } else {
            Some(content)
        }
    }

    fn parse(&self, path: &str, source: &str) -> Option<Tree> {
        let mut parser = Parser::new();
        parser.set_language(self.language_for(path)).ok()?;
        parser.parse(source, None)
    }

    fn exports(&self, path: &str, tree: &Tree, source: &str) -> ExportSet {
        let queries = self.queries_for(path);
        let mut set = ExportSet::default();

        let mut cursor = QueryCursor::new();
        let mut matches =
            cursor.matches(&queries.export_name_query, tree.root_node(), source.as_bytes());
        while let Some(m) = matches.next() {
            for capture in m.captures {
                set.named.push(source[capture.node.byte_range()].to_string());
            }
        }

        let mut cursor = QueryCursor::new();
        let mut matches =
            cursor.matches(&queries.export_stmt_query, tree.root_node(), source.as_bytes());
        while let Some(m) = matches.next() {
            for capture in m.captures {
                let text = &source[capture.node.byte_range()];
                if text.trim_start().starts_with("export default") {
                    set.has_default = true;
                }
            }
        }

        set
    }

    fn imports(&self, path: &str, tree: &Tree, source: &str) -> Vec<ImportClause> {
        let queries = self.queries_for(path);
        let mut cursor = QueryCursor::new();
        let mut clauses = Vec::new();
        let mut matches = cursor.matches(&queries.import_query, tree.root_node(), source.as_bytes());
        while let Some(m) = matches.next() {
            let mut stmt_node = None;
            let mut raw_source = None;
            for capture in m.captures {
                let name = queries.import_query.capture_names()[capture.index as usize];
                match name {
                    "stmt" => stmt_node = Some(capture.node),
                    "source" => {
                        raw_source = Some(
                            source[capture.node.byte_range()]
                                .trim_matches('"')
                                .trim_matches('\'')
                                .to_string(),
                        )
                    }
                    _ => {}
                }
            }
            let (Some(stmt), Some(import_source)) = (stmt_node, raw_source) else {
                continue;
            };
            let stmt_text = &source[stmt.byte_range()];
            let type_only = stmt_text.trim_start().starts_with("import type");
            let specifiers = collect_specifiers(stmt, source);
            clauses.push(ImportClause {
                source: import_source,
                specifiers,
                type_only,
            });
        }
        clauses
    }
}

fn collect_specifiers(stmt: Node, source: &str) -> Vec<Specifier> {
    let mut specifiers = Vec::new();
    let Some(clause) = find_child_of_kind(stmt, "import_clause") else {
        return specifiers;
    };
    let mut cursor = clause.walk();
    if cursor.goto_first_child() {
        loop {
            let child = cursor.node();
            match child.kind() {
                "identifier" => specifiers.push(Specifier::Default),
                "namespace_import" => specifiers.push(Specifier::Namespace),
                "named_imports" => {
                    let mut inner = child.walk();
                    if inner.goto_first_child() {
                        loop {
                            let spec = inner.node();
                            if spec.kind() == "import_specifier" {
                                if let Some(name_node) = spec.child_by_field_name("name") {
                                    specifiers.push(Specifier::Named(
                                        source[name_node.byte_range()].to_string(),
                                    ));
                                }
                            }
                            if !inner.goto_next_sibling() {
                                break;
                            }
                        }
                    }
                }
                _ => {}
            }
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }
    specifiers
}

fn find_child_of_kind<'a>(node: Node<'a>, kind: &str) -> Option<Node<'a>> {
    let mut cursor = node.walk();
    if !cursor.goto_first_child() {
        return None;
    }
    loop {
        if cursor.node().kind() == kind {
            return Some(cursor.node());
        }
        if !cursor.goto_next_sibling() {
            return None;
        }
    }
}

const RESOLUTION_SUFFIXES: &[&str] = &[
    "", ".ts", ".tsx", ".js", ".jsx", "/index.ts", "/index.tsx", "/index.js", "/index.jsx",
];

fn dir_of(path: &str) -> &str {
    path.rsplit_once('/').map(|(d, _)| d).unwrap_or("")
}

fn normalize_join(base: &str, rel: &str) -> String {
    let mut segments: Vec<&str> = base.split('/').filter(|s| !s.is_empty()).collect();
    for part in rel.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                segments.pop();
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}

/// Alias table loaded from `tsconfig.json`'s `compilerOptions.paths`:
/// `"<alias>/*": ["<dir>/*"]` normalised to
/// `(alias-prefix-with-trailing-slash, dir-prefix-with-trailing-slash)`.
fn load_aliases(contents: &HashMap<String, String>) -> Vec<(String, String)> {
    let Some(raw) = contents
        .iter()
        .find(|(p, _)| p.rsplit('/').next() == Some("tsconfig.json"))
        .map(|(_, c)| c)
    else {
        return Vec::new();
    };
    let Ok(json) = serde_json::from_str::<serde_json::Value>(raw) else {
        return Vec::new();
    };
    let Some(paths) = json
        .get("compilerOptions")
        .and_then(|c| c.get("paths"))
        .and_then(|p| p.as_object())
    else {
        return Vec::new();
    };

    let mut aliases = Vec::new();
    for (key, value) in paths {
        let Some(first) = value.as_array().and_then(|a| a.first()).and_then(|v| v.as_str()) else {
            continue;
        };
        if let (Some(alias_prefix), Some(dir_prefix)) = (key.strip_suffix("/*"), first.strip_suffix("/*")) {
            aliases.push((format!("{alias_prefix}/"), format!("{dir_prefix}/")));
        }
    }
    aliases
}

/// Resolve one import source against the admitted js/ts file list.
/// Returns `None` for third-party specifiers and for relative/alias
/// specifiers with no match.
fn resolve<'a>(
    files: &'a [String],
    importer: &str,
    import_path: &str,
    aliases: &[(String, String)],
) -> Option<&'a str> {
    let base = if let Some(rest) = import_path.strip_prefix("./") {
        normalize_join(dir_of(importer), rest)
    } else if import_path.starts_with("../") {
        normalize_join(dir_of(importer), import_path)
    } else if let Some((alias_prefix, dir_prefix)) =
        aliases.iter().find(|(alias, _)| import_path.starts_with(alias.as_str()))
    {
        format!("{dir_prefix}{}", &import_path[alias_prefix.len()..])
    } else {
        return None;
    };

    RESOLUTION_SUFFIXES.iter().find_map(|suffix| {
        let candidate = format!("{base}{suffix}");
        files.iter().find(|f| f.as_str() == candidate).map(String::as_str)
    })
}

fn is_function_kind(kind: &str) -> bool {
    matches!(
        kind,
        "function_declaration"
            | "function_expression"
            | "generator_function"
            | "generator_function_declaration"
            | "arrow_function"
            | "method_definition"
    )
}

/// Cyclomatic complexity via AST walk: each function starts at 1,
/// decision points increment the innermost enclosing
/// function's score, file score is the sum of function scores (module-
/// level code counts as an implicit function), clamped to a minimum of 1.
fn complexity_via_ast(tree: &Tree, source: &str) -> u32 {
    // The base frame represents decision points encountered outside any
    // function; it has no "starts at 1" floor of its own, only real
    // functions do.
    let mut stack = vec![0u32];
    let mut scores = Vec::new();
    walk_complexity(tree.root_node(), source, &mut stack, &mut scores);
    scores.push(stack.pop().unwrap_or(0));
    scores.iter().sum::<u32>().max(1)
}

fn walk_complexity(node: Node, source: &str, stack: &mut Vec<u32>, scores: &mut Vec<u32>) {
    let pushed = is_function_kind(node.kind());
    if pushed {
        stack.push(1);
    }

    match node.kind() {
        "if_statement" | "ternary_expression" | "for_statement" | "for_in_statement"
        | "while_statement" | "do_statement" | "catch_clause" => {
            if let Some(top) = stack.last_mut() {
                *top += 1;
            }
        }
        "switch_case" => {
            if node.child_by_field_name("value").is_some() {
                if let Some(top) = stack.last_mut() {
                    *top += 1;
                }
            }
        }
        "binary_expression" => {
            if let Some(op) = node.child_by_field_name("operator") {
                let op_text = &source[op.byte_range()];
                if op_text == "&&" || op_text == "||" {
                    if let Some(top) = stack.last_mut() {
                        *top += 1;
                    }
                }
            }
        }
        _ => {}
    }

    let mut cursor = node.walk();
    if cursor.goto_first_child() {
        loop {
            walk_complexity(cursor.node(), source, stack, scores);
            if !cursor.goto_next_sibling() {
                break;
            }
        }
    }

    if pushed {
        if let Some(score) = stack.pop() {
            scores.push(score);
        }
    }
}

impl LanguageAnalyzer for JsAnalyzer {
    fn tag(&self) -> LanguageTag {
        LanguageTag::Js
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["ts", "tsx", "js", "jsx", "mjs", "cjs", "vue"]
    }

    fn analyze_all(
        &self,
        files: &[String],
        contents: &HashMap<String, String>,
        opts: &AnalyzerOptions,
    ) -> LanguageAnalysis {
        let mut result = LanguageAnalysis::default();
        let aliases = load_aliases(contents);
        let mut trees: HashMap<String, (Tree, String)> = HashMap::new();
        let mut exports_by_file: HashMap<String, ExportSet> = HashMap::new();

        for path in files {
            if path.rsplit('/').next() == Some("tsconfig.json") {
                continue;
            }
            let Some(content) = contents.get(path) else {
                continue;
            };
            let Some(source) = self.source_for(path, content) else {
                result
                    .parse_errors
                    .push((path.clone(), "no <script> block found".to_string()));
                continue;
            };
            let Some(tree) = self.parse(path, source) else {
                result
                    .parse_errors
                    .push((path.clone(), "failed to parse js/ts source".to_string()));
                continue;
            };
            exports_by_file.insert(path.clone(), self.exports(path, &tree, source));
            trees.insert(path.clone(), (tree, source.to_string()));
        }

        for path in files {
            let Some((tree, source)) = trees.get(path) else {
                continue;
            };
            let mut dependencies: HashMap<String, u32> = HashMap::new();

            for clause in self.imports(path, tree, source) {
                if clause.type_only && !opts.include_type_only_imports {
                    continue;
                }
                let Some(target) = resolve(files, path, &clause.source, &aliases) else {
                    continue;
                };
                if target == path {
                    continue;
                }

                let weight = if !opts.symbol_counting {
                    1
                } else if clause.specifiers.iter().any(|s| matches!(s, Specifier::Namespace)) {
                    let exports = exports_by_file.get(target).cloned().unwrap_or_default();
                    wildcard_weight(source, &exports.named)
                } else if clause.specifiers.is_empty() {
                    1
                } else {
                    let exports = exports_by_file.get(target).cloned().unwrap_or_default();
                    clause
                        .specifiers
                        .iter()
                        .map(|s| match s {
                            Specifier::Default => u32::from(exports.has_default),
                            Specifier::Named(name) => u32::from(exports.named.contains(name)),
                            Specifier::Namespace => 0,
                        })
                        .sum()
                };

                if weight > 0 {
                    *dependencies.entry(target.to_string()).or_insert(0) += weight;
                }
            }

            let complexity = complexity_via_ast(tree, source);
            result.per_file.insert(
                path.clone(),
                FileAnalysis {
                    complexity,
                    dependencies,
                },
            );
        }

        result
    }
}
