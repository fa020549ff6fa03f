use serde_json::Value;

use crate::notion::transform::file_url;

/// Convert top-level Notion blocks into Markdown.
///
/// Unsupported block types are skipped. Consecutive list items are kept
/// together so they render as one list.
pub fn blocks_to_markdown(blocks: &[Value]) -> String {
    let mut out = String::new();
    let mut previous_was_list = false;

    for block in blocks {
        let kind = block.get("type").and_then(Value::as_str).unwrap_or("");
        let body = block.get(kind).unwrap_or(&Value::Null);
        let text = || rich_text_to_markdown(body.get("rich_text").unwrap_or(&Value::Null));

        let (chunk, is_list) = match kind {
            "paragraph" => (text(), false),
            "heading_1" => (format!("# {}", text()), false),
            "heading_2" => (format!("## {}", text()), false),
            "heading_3" => (format!("### {}", text()), false),
            "bulleted_list_item" => (format!("- {}", text()), true),
            "numbered_list_item" => (format!("1. {}", text()), true),
            "to_do" => {
                let checked = body.get("checked").and_then(Value::as_bool).unwrap_or(false);
                (format!("- [{}] {}", if checked { "x" } else { " " }, text()), true)
            }
            "quote" => (format!("> {}", text()), false),
            "callout" => {
                let emoji = body
                    .get("icon")
                    .and_then(|i| i.get("emoji"))
                    .and_then(Value::as_str)
                    .map(|e| format!("{e} "))
                    .unwrap_or_default();
                (format!("> {emoji}{}", text()), false)
            }
            "code" => {
                let language = body.get("language").and_then(Value::as_str).unwrap_or("");
                let code = crate::notion::transform::plain_text(
                    body.get("rich_text").unwrap_or(&Value::Null),
                );
                (format!("```{language}\n{code}\n```"), false)
            }
            "divider" => ("---".to_string(), false),
            "image" => match file_url(body) {
                Some(url) => {
                    let caption = crate::notion::transform::plain_text(
                        body.get("caption").unwrap_or(&Value::Null),
                    );
                    (format!("![{caption}]({url})"), false)
                }
                None => continue,
            },
            "bookmark" | "embed" | "link_preview" => {
                match body.get("url").and_then(Value::as_str) {
                    Some(url) => (format!("[{url}]({url})"), false),
                    None => continue,
                }
            }
            _ => continue,
        };

        if !out.is_empty() {
            out.push_str(if is_list && previous_was_list { "\n" } else { "\n\n" });
        }
        out.push_str(&chunk);
        previous_was_list = is_list;
    }

    out
}

/// Render rich text runs with their annotations and links.
pub fn rich_text_to_markdown(runs: &Value) -> String {
    let Some(runs) = runs.as_array() else {
        return String::new();
    };

    runs.iter()
        .map(|run| {
            let text = run.get("plain_text").and_then(Value::as_str).unwrap_or("");
            if text.is_empty() {
                return String::new();
            }
            let annotations = run.get("annotations").unwrap_or(&Value::Null);
            let flag = |name: &str| annotations.get(name).and_then(Value::as_bool).unwrap_or(false);

            let mut rendered = text.to_string();
            if flag("code") {
                rendered = format!("`{rendered}`");
            }
            if flag("bold") {
                rendered = format!("**{rendered}**");
            }
            if flag("italic") {
                rendered = format!("*{rendered}*");
            }
            if flag("strikethrough") {
                rendered = format!("~~{rendered}~~");
            }
            if let Some(href) = run.get("href").and_then(Value::as_str) {
                rendered = format!("[{rendered}]({href})");
            }
            rendered
        })
        .collect()
}
