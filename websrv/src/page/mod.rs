// SPDX-FileCopyrightText: Copyright (C) 2018-2026 Uwe Klotz <uwedotklotzatgmaildotcom> et al.
// SPDX-License-Identifier: AGPL-3.0-or-later

//! Composes the single page of the application.
//!
//! [`assemble()`] performs all the blocking file I/O that is needed
//! for a render. [`Page::render()`] only formats the collected data.

use std::fmt::{self, Write as _};

use takrar_core::{
    asset::{
        AudioAsset, AudioFormat,
        background::background_css,
        catalog::{AssetKey, Candidate, Catalog, scan_directory},
    },
    dedication::{self, DedicationList},
    playback::{ResumePolicy, TransportCommand},
    repeat::{PRESETS, RepeatCount},
};

use crate::{config::ContentConfig, session::Session};

use self::{html::escape, player::PlaybackUnit};

pub(crate) mod html;

mod player;

const TITLE: &str = "أدعية صوتية";

static STYLE_CSS: &str = include_str!("../../res/style.css");

#[derive(Debug)]
struct PlayerSection {
    /// Only populated if there is something to choose from.
    choices: Vec<(AssetKey, String)>,
    selected_key: AssetKey,
    label: String,
    repeat_count: RepeatCount,
    unit: PlaybackUnit,
}

#[derive(Debug)]
enum PageBody {
    MissingAsset,
    Player(Box<PlayerSection>),
}

#[derive(Debug)]
pub(crate) struct Page {
    background_css: String,
    dedications: DedicationList,
    audio_dir: String,
    uploads_left: usize,
    body: PageBody,
}

/// Resolves the selected candidate or otherwise the first candidate
/// that could be resolved.
fn resolve_selected<'a>(
    catalog: &'a Catalog,
    selected_key: Option<&AssetKey>,
) -> Option<(&'a Candidate, AudioAsset)> {
    let selected = catalog.select(selected_key)?;
    let others = catalog
        .candidates()
        .iter()
        .filter(|candidate| candidate.key != selected.key);
    std::iter::once(selected)
        .chain(others)
        .find_map(|candidate| match candidate.source.resolve() {
            Ok(asset) => Some((candidate, asset)),
            Err(err) => {
                log::warn!("Failed to resolve audio asset {}: {err}", candidate.key);
                None
            }
        })
}

/// Collects everything that is needed for rendering the page.
///
/// Reads files from disk and must not be invoked on an async executor.
#[must_use]
pub(crate) fn assemble(
    config: &ContentConfig,
    session: &Session,
    command: Option<TransportCommand>,
    policy: ResumePolicy,
    uploads_left: usize,
) -> Page {
    let background_css = background_css(config.background_image.as_deref());
    let dedications = dedication::load(config.dedications_file.as_deref());
    let catalog = Catalog::new(scan_directory(&config.audio_dir), &session.uploads);
    let body = if let Some((candidate, asset)) =
        resolve_selected(&catalog, session.selected.as_ref())
    {
        let repeat_count = session.repeat_count.current_value();
        let choices = if catalog.len() > 1 {
            catalog
                .candidates()
                .iter()
                .map(|candidate| (candidate.key.clone(), candidate.label()))
                .collect()
        } else {
            Vec::new()
        };
        let unit = PlaybackUnit::new(
            candidate.key.to_string(),
            &asset,
            repeat_count,
            command,
            policy,
        );
        PageBody::Player(Box::new(PlayerSection {
            choices,
            selected_key: candidate.key.clone(),
            label: asset.identifier,
            repeat_count,
            unit,
        }))
    } else {
        log::info!("No audio asset available");
        PageBody::MissingAsset
    };
    Page {
        background_css,
        dedications,
        audio_dir: config.audio_dir.display().to_string(),
        uploads_left,
        body,
    }
}

impl Page {
    pub(crate) fn render(&self) -> anyhow::Result<String> {
        let mut html = String::with_capacity(64 * 1024);
        html.push_str(&format!(
            r#"<!DOCTYPE html>
<html lang="ar" dir="rtl">
<head>
<meta charset="utf-8">
<meta name="viewport" content="width=device-width, initial-scale=1">
<title>{TITLE}</title>
<style>
{STYLE_CSS}
{background_css}
</style>
</head>
<body>
<main class="page">
<h2>{TITLE}</h2>
"#,
            background_css = self.background_css,
        ));
        self.render_dedications(&mut html)?;
        self.render_upload_form(&mut html)?;
        match &self.body {
            PageBody::MissingAsset => {
                html.push_str(&format!(
                    r#"<div class="notice">لا يوجد ملف صوتي متاح في <b>{audio_dir}</b>. أضف ملفًا إلى المجلد أو ارفع ملفًا صوتيًا.</div>
"#,
                    audio_dir = escape(&self.audio_dir),
                ));
            }
            PageBody::Player(section) => {
                render_player_section(section, &mut html)?;
                html.push_str(&format!(
                    r#"<footer class="small">التسجيلات مدمجة ضمن المستودع ({audio_dir}) وكذلك الخلفية. لا يمكن للمستخدمين تعديلها.</footer>
"#,
                    audio_dir = escape(&self.audio_dir),
                ));
            }
        }
        html.push_str("</main>\n</body>\n</html>\n");
        Ok(html)
    }

    fn render_dedications(&self, html: &mut impl fmt::Write) -> fmt::Result {
        html.write_str(
            r#"<div class="dedication">
<div class="title">صدقة جارية</div>
<div>لأرواح</div>
<div class="names">
"#,
        )?;
        for name in self.dedications.names() {
            writeln!(html, "<div>{}</div>", escape(name))?;
        }
        html.write_str("</div>\n</div>\n")
    }

    fn render_upload_form(&self, html: &mut impl fmt::Write) -> fmt::Result {
        if self.uploads_left == 0 {
            return html.write_str(
                r#"<p class="small">تم بلوغ الحد الأقصى لعدد الملفات المرفوعة في هذه الجلسة.</p>
"#,
            );
        }
        let accept = AudioFormat::ALL
            .iter()
            .map(|format| format!(".{}", format.file_ext()))
            .collect::<Vec<_>>()
            .join(",");
        write!(
            html,
            r#"<form method="post" action="/upload" enctype="multipart/form-data">
<label for="file">ارفع ملفًا صوتيًا (حتى {uploads_left} ملفات):</label>
<input type="file" id="file" name="file" accept="{accept}" multiple>
<button type="submit">رفع</button>
</form>
"#,
            uploads_left = self.uploads_left,
        )
    }
}

fn render_player_section(section: &PlayerSection, html: &mut String) -> anyhow::Result<()> {
    let PlayerSection {
        choices,
        selected_key,
        label,
        repeat_count,
        unit,
    } = section;
    if !choices.is_empty() {
        html.push_str(
            r#"<form method="post" action="/">
<label for="asset">اختر التسجيل:</label>
<select id="asset" name="asset" onchange="this.form.submit()">
"#,
        );
        for (key, label) in choices {
            let selected = if key == selected_key { " selected" } else { "" };
            writeln!(
                html,
                r#"<option value="{key}"{selected}>{label}</option>"#,
                key = escape(key.as_str()),
                label = escape(label),
            )?;
        }
        html.push_str(
            r#"</select>
<noscript><button type="submit">اختيار</button></noscript>
</form>
"#,
        );
    }
    writeln!(html, "<h4>التسجيل: {}</h4>", escape(label))?;
    html.push_str(
        r#"<form method="post" action="/" class="chips">
"#,
    );
    for preset in PRESETS {
        writeln!(
            html,
            r#"<button type="submit" name="preset" value="{preset}">{preset}</button>"#
        )?;
    }
    html.push_str("</form>\n");
    write!(
        html,
        r#"<form method="post" action="/">
<label for="reps">عدد مرات التكرار (يمكن تغييره يدويًا):</label>
<input type="number" id="reps" name="reps" min="{min}" step="1" value="{repeat_count}">
<button type="submit">تطبيق</button>
</form>
<form method="post" action="/" class="transport">
<button type="submit" name="command" value="{play}">▶ تشغيل</button>
<button type="submit" name="command" value="{pause}">⏸ إيقاف مؤقت</button>
<button type="submit" name="command" value="{restart}" class="restart">⟲ من البداية</button>
</form>
"#,
        min = RepeatCount::MIN,
        play = TransportCommand::Play,
        pause = TransportCommand::Pause,
        restart = TransportCommand::Restart,
    )?;
    unit.render_into(html)
}
