use regex::Regex;

/// Count whole-word occurrences of `word` in `source` — the count of a
/// target's exported symbols appearing as whole-word tokens in the
/// importing file's source. Shared across every language analyzer's
/// resolution pass rather than reimplemented six times.
pub fn count_whole_word_occurrences(source: &str, word: &str) -> u32 {
    if word.is_empty() {
        return 0;
    }
    let pattern = format!(r"\b{}\b", regex::escape(word));
    Regex::new(&pattern)
        .map(|re| re.find_iter(source).count() as u32)
        .unwrap_or(0)
}

/// Weight for a single resolved target under the wildcard/package-level
/// rule: the whole-word occurrence count of its exported symbols, summed,
/// falling back to 1 if none of them appear but the import still resolved.
pub fn wildcard_weight(importer_source: &str, target_exports: &[String]) -> u32 {
    let total: u32 = target_exports
        .iter()
        .map(|sym| count_whole_word_occurrences(importer_source, sym))
        .sum();
    if total == 0 {
        1
    } else {
        total
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_whole_word_occurrences_only() {
        let source = "util.Help(); util.Help(); util.HelpMe();";
        assert_eq!(count_whole_word_occurrences(source, "Help"), 2);
    }

    #[test]
    fn falls_back_to_one_when_no_symbol_matches() {
        let source = "nothing relevant here";
        let weight = wildcard_weight(source, &["Help".to_string()]);
        assert_eq!(weight, 1);
    }

    #[test]
    fn sums_across_multiple_exports() {
        let source = "Foo(); bar(); bar();";
        let weight = wildcard_weight(source, &["Foo".to_string(), "bar".to_string()]);
        assert_eq!(weight, 3);
    }
}
