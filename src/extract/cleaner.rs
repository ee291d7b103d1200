//! Line normalization and structural reformatting of judgment text
//!
//! Judgment documents arrive as a flat run of text nodes. Reformatting is an
//! ordered list of rules; the first rule whose predicate accepts a line decides
//! how that line is laid out. Line content is never altered or reordered.

use regex::Regex;
use std::sync::LazyLock;

/// How a line is separated from its neighbours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineLayout {
    /// Blank line before (unless at start or already blank) and after
    Isolated,
    /// Blank line before (unless at start or already blank)
    BreakBefore,
    /// Appended as is
    Plain,
}

struct LayoutRule {
    matches: fn(&str) -> bool,
    layout: LineLayout,
}

const TITLE_KEYWORDS: &[&str] = &["人民法院", "裁定书", "判决书", "决定书"];
const SECTION_PREFIXES: &[&str] = &["原告", "被告", "本院认为", "判决如下", "裁定如下"];
const SIGNATURE_ROLES: &[&str] = &["审判员", "审判长", "书记员"];

static CASE_NUMBER_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^（\d{4}）.*号$").expect("valid case number pattern"));

static CJK_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[一二三四五六七八九十○〇]{4}年.*[一二三四五六七八九十○〇]月.*[一二三四五六七八九十○〇]日")
        .expect("valid CJK date pattern")
});

static ARABIC_DATE_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4}年\d{1,2}月\d{1,2}日$").expect("valid date pattern"));

fn is_title(line: &str) -> bool {
    TITLE_KEYWORDS.iter().any(|k| line.contains(k))
}

fn is_case_number(line: &str) -> bool {
    CASE_NUMBER_LINE.is_match(line)
}

fn is_section_start(line: &str) -> bool {
    SECTION_PREFIXES.iter().any(|k| line.starts_with(k))
}

fn is_signature(line: &str) -> bool {
    SIGNATURE_ROLES.iter().any(|k| line.contains(k))
        || CJK_DATE.is_match(line)
        || ARABIC_DATE_LINE.is_match(line)
}

static RULES: &[LayoutRule] = &[
    LayoutRule {
        matches: is_title,
        layout: LineLayout::Isolated,
    },
    LayoutRule {
        matches: is_case_number,
        layout: LineLayout::Isolated,
    },
    LayoutRule {
        matches: is_section_start,
        layout: LineLayout::BreakBefore,
    },
    LayoutRule {
        matches: is_signature,
        layout: LineLayout::BreakBefore,
    },
];

/// Layout of a single line; first matching rule wins
pub fn classify_line(line: &str) -> LineLayout {
    RULES
        .iter()
        .find(|rule| (rule.matches)(line))
        .map(|rule| rule.layout)
        .unwrap_or(LineLayout::Plain)
}

/// Splits text nodes on newlines, trims each piece and drops empties
pub fn normalize_lines<'a, I>(texts: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    texts
        .into_iter()
        .flat_map(|text| text.split('\n'))
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

/// Applies the layout rules and joins the result with `\n`
pub fn format_paragraphs(lines: &[&str]) -> String {
    let mut out: Vec<&str> = Vec::with_capacity(lines.len() * 2);

    for &line in lines {
        let layout = classify_line(line);

        if layout != LineLayout::Plain && out.last().is_some_and(|last| !last.is_empty()) {
            out.push("");
        }

        out.push(line);

        if layout == LineLayout::Isolated {
            out.push("");
        }
    }

    out.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rule_order() {
        // Title keyword beats the section prefix
        assert_eq!(classify_line("原告上海市某某人民法院"), LineLayout::Isolated);
        assert_eq!(classify_line("（2023）京01民初456号"), LineLayout::Isolated);
        assert_eq!(classify_line("被告：某公司"), LineLayout::BreakBefore);
        assert_eq!(classify_line("书记员  王五"), LineLayout::BreakBefore);
        assert_eq!(classify_line("二〇二四年三月四日"), LineLayout::BreakBefore);
        assert_eq!(classify_line("2024年3月4日"), LineLayout::BreakBefore);
        assert_eq!(classify_line("经审理查明，2024年3月4日双方签订合同。"), LineLayout::Plain);
        assert_eq!(classify_line("事实与理由"), LineLayout::Plain);
    }

    #[test]
    fn test_case_number_must_span_line() {
        assert_eq!(classify_line("案号（2023）京01民初456号"), LineLayout::Plain);
    }

    #[test]
    fn test_normalize_lines() {
        let lines = normalize_lines(vec!["  第一行 \n\n 第二行", "   ", "第三行\n"]);
        assert_eq!(lines, vec!["第一行", "第二行", "第三行"]);
    }

    #[test]
    fn test_no_leading_blank() {
        assert_eq!(format_paragraphs(&["原告：张三", "事实"]), "原告：张三\n事实");
    }

    #[test]
    fn test_no_double_blank_between_isolated() {
        let text = format_paragraphs(&["XX人民法院", "民事判决书", "正文"]);
        assert_eq!(text, "XX人民法院\n\n民事判决书\n\n正文");
    }

    #[test]
    fn test_content_preserved_in_order() {
        let lines = ["甲", "原告：乙", "丙", "审判长 丁", "戊"];
        let text = format_paragraphs(&lines);
        let kept: Vec<&str> = text.split('\n').filter(|l| !l.is_empty()).collect();
        assert_eq!(kept, lines);
    }
}
