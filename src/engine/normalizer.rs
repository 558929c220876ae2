// ==========================================
// 价格目录去重系统 - 文本归一化规则
// ==========================================
// 职责: 货号 / 品牌 / 名称的确定性规范化 + 指纹用深度清洗
// 红线: 纯函数,无 I/O,从不失败（空串合法）
// ==========================================

/// 货号中直接删除的分隔符
pub const ARTICLE_SEPARATORS: [char; 7] = ['-', '_', '.', '/', '+', ' ', ','];

/// 归一化货号: TRIM → 小写 → 删除分隔符
pub fn normalize_article(raw: &str) -> String {
    raw.trim()
        .to_lowercase()
        .chars()
        .filter(|c| !ARTICLE_SEPARATORS.contains(c))
        .collect()
}

/// 归一化品牌: TRIM → 小写（保留标点与内部空格）
pub fn normalize_brand(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// 归一化名称: 仅 TRIM
pub fn normalize_name(raw: &str) -> String {
    raw.trim().to_string()
}

/// 深度清洗（仅用作指纹输入，不落库）
///
/// 步骤: TRIM → 删除空白（空格/制表/换行/回车）→ 小写 → 仅保留 `[a-z0-9]`
pub fn deep_clean(raw: &str) -> String {
    raw.trim()
        .chars()
        .filter(|c| !matches!(c, ' ' | '\t' | '\n' | '\r'))
        .flat_map(char::to_lowercase)
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_article_strips_separators() {
        assert_eq!(normalize_article("  X-100 "), "x100");
        assert_eq!(normalize_article("ab_c.d/e+f g,h"), "abcdefgh");
        assert_eq!(normalize_article("A#1"), "a#1"); // 非分隔符保留
    }

    #[test]
    fn test_normalize_brand_keeps_inner_punctuation() {
        assert_eq!(normalize_brand("  ACME Co. "), "acme co.");
        assert_eq!(normalize_brand("Bosch"), "bosch");
    }

    #[test]
    fn test_normalize_name_trims_only() {
        assert_eq!(normalize_name("  Widget, Deluxe! "), "Widget, Deluxe!");
    }

    #[test]
    fn test_deep_clean() {
        assert_eq!(deep_clean("  AB\t-12\r\n3 "), "ab123");
        assert_eq!(deep_clean("Ärger #5"), "rger5");
        assert_eq!(deep_clean("acme co."), "acmeco");
    }

    #[test]
    fn test_empty_input_is_legal() {
        assert_eq!(normalize_article("  - "), "");
        assert_eq!(normalize_brand(""), "");
        assert_eq!(deep_clean(" \t\n"), "");
    }
}
