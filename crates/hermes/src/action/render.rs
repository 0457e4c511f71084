//! Message rendering for chat-style executors.

use serde_json::Value;

/// Render the message text for a payload.
///
/// Without a template the payload is wrapped in a JSON code block. A
/// template may contain placeholders:
///
/// - `{{payload}}` - the raw payload text
/// - `{{a.b.c}}` - a dotted path into the payload parsed as JSON; strings
///   are inserted unquoted, other values as JSON, missing paths as nothing
///
/// # Example
///
/// ```
/// use hermes::action::render_message;
///
/// let text = render_message(Some("New order {{order.id}}"), br#"{"order":{"id":"A-7"}}"#);
/// assert_eq!(text, "New order A-7");
/// ```
pub fn render_message(template: Option<&str>, payload: &[u8]) -> String {
    let raw = String::from_utf8_lossy(payload);
    let Some(template) = template.filter(|t| !t.is_empty()) else {
        return format!("Payload:\n```json\n{raw}\n```");
    };

    let parsed: Option<Value> = serde_json::from_slice(payload).ok();
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find("}}") else {
            out.push_str(&rest[start..]);
            return out;
        };

        let key = after[..end].trim();
        if key == "payload" {
            out.push_str(&raw);
        } else if let Some(value) = parsed.as_ref().and_then(|v| lookup(v, key)) {
            match value {
                Value::String(s) => out.push_str(s),
                Value::Null => {}
                other => out.push_str(&other.to_string()),
            }
        }
        rest = &after[end + 2..];
    }

    out.push_str(rest);
    out
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| match current {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}
