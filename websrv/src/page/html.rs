// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::borrow::Cow;

/// Escapes text for both element content and quoted attribute values.
#[must_use]
pub(crate) fn escape(text: &str) -> Cow<'_, str> {
    if !text
        .chars()
        .any(|c| matches!(c, '&' | '<' | '>' | '"' | '\''))
    {
        return Cow::Borrowed(text);
    }
    let mut escaped = String::with_capacity(text.len() + 16);
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#39;"),
            c => escaped.push(c),
        }
    }
    Cow::Owned(escaped)
}

/// Makes serialized JSON safe for embedding into a `<script>` element.
#[must_use]
pub(crate) fn escape_script_json(json: &str) -> String {
    json.replace("</", "<\\/")
}

#[cfg(test)]
mod tests {
    use std::borrow::Cow;

    use super::*;

    #[test]
    fn escape_borrows_plain_text() {
        assert!(matches!(escape("محمد"), Cow::Borrowed("محمد")));
    }

    #[test]
    fn escape_markup() {
        assert_eq!(
            "&lt;b title=&quot;x&quot;&gt;Tom &amp; Jerry&#39;s&lt;/b&gt;",
            escape("<b title=\"x\">Tom & Jerry's</b>")
        );
    }

    #[test]
    fn escape_script_json_closing_tags() {
        assert_eq!(
            r#"{"assetKey":"repo:<\/script>.mp3"}"#,
            escape_script_json(r#"{"assetKey":"repo:</script>.mp3"}"#)
        );
    }
}
