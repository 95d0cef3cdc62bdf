//! Wish rendering and export composition.
//!
//! Everything here is pure string work: HTML-escaped display blocks,
//! category grouping for lists, and the TXT/CSV export payloads.

use std::collections::BTreeMap;

use crate::wish::Wish;

pub const DEFAULT_CATEGORY_TITLE: &str = "Uncategorized";
pub const DEFAULT_CATEGORY_EMOJI: &str = "🎁";

// Category keyword → emoji, matched as a case-insensitive substring.
const CATEGORY_EMOJI_MAP: &[(&str, &str)] = &[
    ("book", "📚"),
    ("tech", "💻"),
    ("gadget", "📱"),
    ("music", "🎵"),
    ("food", "🍽"),
    ("coffee", "☕"),
    ("sport", "🏃"),
    ("game", "🎮"),
    ("shoe", "👟"),
    ("clothes", "👕"),
    ("home", "🏠"),
    ("travel", "✈️"),
    ("trip", "✈️"),
    ("car", "🚗"),
    ("beauty", "💄"),
    ("hobby", "🎨"),
    ("kid", "🧸"),
];

pub fn category_to_emoji(category: &str) -> &'static str {
    if category.trim().is_empty() {
        return DEFAULT_CATEGORY_EMOJI;
    }
    let key = category.trim().to_lowercase();
    for (needle, emoji) in CATEGORY_EMOJI_MAP {
        if key.contains(needle) {
            return emoji;
        }
    }
    DEFAULT_CATEGORY_EMOJI
}

pub fn escape_html(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Shortened link text for display: scheme dropped, long paths elided.
/// The full URL stays in the href.
fn shorten_link_for_display(link: &str) -> String {
    let link = link.trim();
    let display = link
        .strip_prefix("https://")
        .or_else(|| link.strip_prefix("http://"))
        .unwrap_or(link);

    const MAX_LEN: usize = 40;
    if display.chars().count() <= MAX_LEN {
        return display.to_string();
    }
    let truncated: String = display.chars().take(MAX_LEN - 1).collect();
    format!("{truncated}…")
}

/// One wish as a display block: `(priority) title` plus link and
/// description lines when present.
pub fn build_wish_block(wish: &Wish) -> String {
    let mut lines = vec![format!("({}) {}", wish.priority, escape_html(&wish.title))];
    if !wish.link.is_empty() {
        let href = escape_html(&wish.link);
        let display = escape_html(&shorten_link_for_display(&wish.link));
        lines.push(format!("   🔗 <a href=\"{href}\">{display}</a>"));
    }
    if !wish.description.is_empty() {
        lines.push(format!("   💬 {}", escape_html(&wish.description)));
    }
    lines.join("\n")
}

/// The edit-card header: category line plus the wish block.
pub fn build_wish_card(wish: &Wish) -> String {
    let emoji = category_to_emoji(&wish.category);
    let category = if wish.category.is_empty() {
        DEFAULT_CATEGORY_TITLE.to_string()
    } else {
        escape_html(&wish.category)
    };
    format!("{emoji} {category}\n{}", build_wish_block(wish))
}

/// Group wishes by category for display: categories in case-insensitive
/// order, wishes inside a category by descending priority.
pub fn sort_wishes_for_display(wishes: &[Wish]) -> Vec<(String, Vec<Wish>)> {
    let mut grouped: BTreeMap<String, (String, Vec<Wish>)> = BTreeMap::new();
    for wish in wishes {
        let category = if wish.category.trim().is_empty() {
            DEFAULT_CATEGORY_TITLE.to_string()
        } else {
            wish.category.trim().to_string()
        };
        grouped
            .entry(category.to_lowercase())
            .or_insert_with(|| (category, Vec::new()))
            .1
            .push(wish.clone());
    }

    grouped
        .into_values()
        .map(|(category, mut items)| {
            items.sort_by(|a, b| b.priority.cmp(&a.priority));
            (category, items)
        })
        .collect()
}

/// Button label helper: at most `limit` characters, ellipsis when cut.
pub fn truncate(text: &str, limit: usize) -> String {
    if text.chars().count() <= limit {
        return text.to_string();
    }
    let kept: String = text.chars().take(limit.saturating_sub(1)).collect();
    format!("{kept}…")
}

/// Plain-text export, grouped the same way the list view is.
pub fn compose_export_txt(wishes: &[Wish]) -> String {
    if wishes.is_empty() {
        return "The wishlist is empty.\n".to_string();
    }

    let mut lines: Vec<String> = Vec::new();
    for (category, items) in sort_wishes_for_display(wishes) {
        let emoji = if category == DEFAULT_CATEGORY_TITLE {
            DEFAULT_CATEGORY_EMOJI
        } else {
            category_to_emoji(&category)
        };
        lines.push(format!("{emoji} {category}"));
        for wish in items {
            lines.push(build_wish_block(&wish));
            lines.push(String::new());
        }
        lines.push(String::new());
    }
    format!("{}\n", lines.join("\n").trim())
}

fn csv_field(value: &str) -> String {
    if value.contains(['"', ',', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

/// CSV export with a header row; one row per wish.
pub fn compose_export_csv(wishes: &[Wish]) -> String {
    let mut out = String::from("Title,Link,Category,Description,Priority\r\n");
    for wish in wishes {
        out.push_str(&format!(
            "{},{},{},{},{}\r\n",
            csv_field(&wish.title),
            csv_field(&wish.link),
            csv_field(&wish.category),
            csv_field(&wish.description),
            wish.priority
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wish(id: i64, title: &str, category: &str, priority: u8) -> Wish {
        Wish {
            id,
            title: title.to_string(),
            link: String::new(),
            category: category.to_string(),
            description: String::new(),
            priority,
            photo_file_id: None,
            photo: None,
        }
    }

    #[test]
    fn test_wish_block_escapes_html() {
        let mut w = wish(1, "Speakers <big & loud>", "", 4);
        w.description = "2x \"studio\"".to_string();
        let block = build_wish_block(&w);
        assert!(block.contains("(4) Speakers &lt;big &amp; loud&gt;"));
        assert!(block.contains("💬 2x &quot;studio&quot;"));
    }

    #[test]
    fn test_wish_block_link_display() {
        let mut w = wish(1, "Boots", "", 2);
        w.link = "https://shop.example/boots/winter".to_string();
        let block = build_wish_block(&w);
        assert!(block.contains("href=\"https://shop.example/boots/winter\""));
        assert!(block.contains(">shop.example/boots/winter</a>"));
    }

    #[test]
    fn test_display_grouping_and_ordering() {
        let wishes = vec![
            wish(1, "a", "books", 1),
            wish(2, "b", "Books", 5),
            wish(3, "c", "", 3),
            wish(4, "d", "art", 2),
        ];
        let grouped = sort_wishes_for_display(&wishes);
        let names: Vec<&str> = grouped.iter().map(|(c, _)| c.as_str()).collect();
        // "art" < "books" case-insensitively; Uncategorized sorts by its title.
        assert_eq!(names, vec!["art", "books", DEFAULT_CATEGORY_TITLE]);

        let (_, books) = &grouped[1];
        assert_eq!(books.len(), 2, "case-insensitive categories merge");
        assert!(books[0].priority >= books[1].priority);
    }

    #[test]
    fn test_category_emoji_substring_match() {
        assert_eq!(category_to_emoji("Tech stuff"), "💻");
        assert_eq!(category_to_emoji("cookBOOKs"), "📚");
        assert_eq!(category_to_emoji(""), DEFAULT_CATEGORY_EMOJI);
        assert_eq!(category_to_emoji("misc"), DEFAULT_CATEGORY_EMOJI);
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("short", 10), "short");
        assert_eq!(truncate("a very long title", 8), "a very …");
    }

    #[test]
    fn test_export_csv_escaping() {
        let mut w = wish(1, "Mug, big", "kitchen", 2);
        w.description = "says \"hello\"".to_string();
        let csv = compose_export_csv(&[w]);
        let mut lines = csv.lines();
        assert_eq!(lines.next(), Some("Title,Link,Category,Description,Priority"));
        assert_eq!(
            lines.next(),
            Some("\"Mug, big\",,kitchen,\"says \"\"hello\"\"\",2")
        );
    }

    #[test]
    fn test_export_txt_empty() {
        assert_eq!(compose_export_txt(&[]), "The wishlist is empty.\n");
    }

    #[test]
    fn test_export_txt_grouped() {
        let wishes = vec![wish(1, "a", "books", 1), wish(2, "b", "", 3)];
        let txt = compose_export_txt(&wishes);
        assert!(txt.contains("📚 books"));
        assert!(txt.contains(&format!("{DEFAULT_CATEGORY_EMOJI} {DEFAULT_CATEGORY_TITLE}")));
        assert!(txt.ends_with('\n'));
    }
}
