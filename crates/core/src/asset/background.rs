// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

use std::{fs, path::Path};

use mime::Mime;

use super::encode_data_url;

const FALLBACK_CSS: &str = "html, body { background: #0d1117; }\n";

fn guess_image_content_type(path: &Path) -> Mime {
    mime_guess::from_path(path)
        .iter()
        .find(|mime| mime.type_() == mime::IMAGE)
        .unwrap_or(mime::IMAGE_PNG)
}

/// Style sheet rules for the page background.
///
/// The image is embedded into the rules. Without a readable image
/// a solid dark background is used instead.
#[must_use]
pub fn background_css(image_path: Option<&Path>) -> String {
    let Some(image_path) = image_path else {
        return FALLBACK_CSS.to_owned();
    };
    let content = match fs::read(image_path) {
        Ok(content) => content,
        Err(err) => {
            log::debug!(
                "Background image {} not available: {err}",
                image_path.display()
            );
            return FALLBACK_CSS.to_owned();
        }
    };
    let data_url = encode_data_url(&guess_image_content_type(image_path), &content);
    format!(
        r"html, body {{ background: #000; }}
body {{
  background-image: url('{data_url}');
  background-size: cover;
  background-position: center center;
  background-attachment: fixed;
}}
.page {{ background: rgba(255, 255, 255, 0.86); }}
"
    )
}
