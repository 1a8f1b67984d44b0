//! Input and merchant-name normalization
//!
//! All matching happens over normalized text: lowercased, whitespace and
//! punctuation removed, sentence-final particles stripped from the end.
//! Everything here is `char`-based; byte offsets are never used.

/// Punctuation removed wherever it appears
const PUNCTUATION: &[char] = &[
    '，', '。', '！', '？', '、', '；', '：', '“', '”', '‘', '’', '（', '）', '…', '～',
    ',', '.', '!', '?', ';', ':', '(', ')', '"', '\'', '~',
];

/// Sentence-final particles stripped only from the end of the input
const FINAL_PARTICLES: &[char] = &['吗', '呢', '吧', '啊', '呀', '哦', '嘛', '啦'];

/// Category-style name suffixes, longest first so the most specific wins
const NAME_SUFFIXES: &[&str] = &[
    "旗舰店", "专卖店", "便利店", "体验店", "服饰店", "童装坊", "火锅", "餐厅", "饭店",
    "咖啡", "超市", "影城", "专柜", "金店", "ktv", "店", "坊", "屋", "馆", "阁",
];

/// Normalize free text for matching.
pub fn normalize(text: &str) -> String {
    let mut out: String = text
        .chars()
        .filter(|c| !c.is_whitespace() && !PUNCTUATION.contains(c))
        .flat_map(|c| c.to_lowercase())
        .collect();

    while let Some(last) = out.chars().last() {
        if FINAL_PARTICLES.contains(&last) {
            out.pop();
        } else {
            break;
        }
    }
    out
}

/// Strip trailing category-style suffixes from a normalized merchant name.
///
/// Suffixes are removed repeatedly ("体验店" then "咖啡", etc.) but never
/// below a two-char base, so short names survive intact.
pub fn strip_name_suffix(name: &str) -> String {
    let mut base = name.to_string();
    loop {
        let mut stripped = false;
        for suffix in NAME_SUFFIXES {
            if let Some(rest) = base.strip_suffix(suffix) {
                if rest.chars().count() >= 2 {
                    base = rest.to_string();
                    stripped = true;
                    break;
                }
            }
        }
        if !stripped {
            return base;
        }
    }
}

/// Char count, the length unit used for all thresholds.
pub fn char_len(s: &str) -> usize {
    s.chars().count()
}
