use std::fmt::Write;
use url::Url;

use crate::{
    config::Features,
    i18n::{locale_for, Translator},
    models::{DesiredEmotion, GenerationStatus, Notice, NoticeLevel, SalesPlatform, Step},
    state::StateSnapshot,
};

/// Colors offered on the preferences step.
pub const COLOR_CHOICES: [&str; 7] = ["green", "brown", "yellow", "orange", "red", "blue", "white"];

const DEFAULT_CONCEPT_KEYS: [&str; 3] = [
    "defaultConcepts.premium",
    "defaultConcepts.fresh",
    "defaultConcepts.trust",
];

pub struct RenderContext<'a> {
    pub snapshot: &'a StateSnapshot,
    pub translator: &'a Translator,
    pub features: &'a Features,
    pub story_limit: usize,
    pub notices: &'a [Notice],
}

impl RenderContext<'_> {
    fn t(&self, key: &str) -> String {
        escape_html(&self.translator.t(&self.snapshot.language, key))
    }

    fn tp(&self, key: &str, params: &[(&str, &str)]) -> String {
        escape_html(&self.translator.translate(&self.snapshot.language, key, params))
    }
}

/// Escapes text for use in element content and quoted attributes.
pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for c in raw.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Accepts `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa` or a plain color name.
/// Anything else could break out of a `style` attribute.
pub fn css_color(raw: &str) -> Option<&str> {
    let raw = raw.trim();
    let valid = match raw.strip_prefix('#') {
        Some(hex) => matches!(hex.len(), 3 | 4 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit()),
        None => !raw.is_empty() && raw.len() <= 32 && raw.chars().all(|c| c.is_ascii_alphabetic()),
    };
    valid.then_some(raw)
}

/// Accepts `http`, `https` and `data:image/*` URLs for `src` and `href`.
/// Escaping alone does not stop `javascript:` and friends.
pub fn safe_url(raw: &str) -> Option<&str> {
    let raw = raw.trim();
    let url = Url::parse(raw).ok()?;
    let allowed = match url.scheme() {
        "http" | "https" => true,
        "data" => url.path().to_ascii_lowercase().starts_with("image/"),
        _ => false,
    };
    allowed.then_some(raw)
}

pub fn render_step(ctx: &RenderContext) -> String {
    let step = ctx.snapshot.step;
    let mut html = String::new();
    let _ = write!(
        html,
        r#"<div class="wizard" data-step="{}" lang="{}">"#,
        step,
        locale_for(&ctx.snapshot.language)
    );
    html.push_str(&progress_bar(ctx));
    html.push_str(&toasts(ctx.notices));
    html.push_str(r#"<div class="step-content">"#);
    html.push_str(&match step {
        Step::Upload => upload_step(ctx),
        Step::Story => story_step(ctx),
        Step::Preferences => preferences_step(ctx),
        Step::Generating => generating_step(ctx),
        Step::Preview => preview_step(ctx),
        Step::Download => download_step(ctx),
    });
    html.push_str("</div></div>");
    html
}

fn progress_bar(ctx: &RenderContext) -> String {
    let current = ctx.snapshot.step.index();
    let percent = (current + 1) as f32 / Step::ALL.len() as f32 * 100.0;
    let mut html = format!(
        r#"<div class="progress-bar"><div class="progress-fill" style="width: {percent:.0}%"></div><ol class="progress-steps">"#
    );
    for (i, step) in Step::ALL.iter().enumerate() {
        let class = match i.cmp(&current) {
            std::cmp::Ordering::Less => "step completed",
            std::cmp::Ordering::Equal => "step active",
            std::cmp::Ordering::Greater => "step",
        };
        let _ = write!(
            html,
            r#"<li class="{class}" data-step="{step}">{}</li>"#,
            ctx.t(&format!("steps.{step}"))
        );
    }
    html.push_str("</ol></div>");
    html
}

fn toasts(notices: &[Notice]) -> String {
    let mut html = String::new();
    for notice in notices {
        let level = match notice.level {
            NoticeLevel::Success => "success",
            NoticeLevel::Error => "error",
            NoticeLevel::Info => "info",
        };
        let _ = write!(
            html,
            r#"<div class="toast toast-{level}" role="status"><span>{}</span></div>"#,
            escape_html(&notice.message)
        );
    }
    html
}

fn header(ctx: &RenderContext, section: &str) -> String {
    format!(
        r#"<div class="step-header"><h2>{}</h2><p>{}</p></div>"#,
        ctx.t(&format!("{section}.title")),
        ctx.t(&format!("{section}.subtitle"))
    )
}

fn actions(ctx: &RenderContext, back: bool, next_label: &str) -> String {
    let mut html = String::from(r#"<div class="step-actions">"#);
    if back {
        let _ = write!(
            html,
            r#"<button type="button" class="btn-secondary" data-action="back">{}</button>"#,
            ctx.t("common.back")
        );
    }
    let _ = write!(
        html,
        r#"<button type="button" class="btn-primary" data-action="next">{}</button></div>"#,
        ctx.t(next_label)
    );
    html
}

fn upload_step(ctx: &RenderContext) -> String {
    let mut html = header(ctx, "step1");
    match ctx.snapshot.form.image.as_ref().filter(|image| safe_url(&image.preview).is_some()) {
        Some(image) => {
            let _ = write!(
                html,
                r#"<div class="upload-preview"><img src="{}" alt="{}" class="preview-image"/><button type="button" class="btn-secondary" data-action="change-image">{}</button></div>"#,
                escape_html(&image.preview),
                escape_html(&image.file_name),
                ctx.t("step1.change")
            );
        }
        None => {
            let _ = write!(
                html,
                r#"<div class="upload-area"><p>{}</p><span>{}</span><label class="btn-secondary">{}<input type="file" name="image" accept="image/*" hidden/></label><p class="upload-tip">{}</p></div>"#,
                ctx.t("step1.dragDrop"),
                ctx.t("step1.or"),
                ctx.t("step1.browse"),
                ctx.t("step1.tip")
            );
        }
    }
    html.push_str(&actions(ctx, false, "common.next"));
    html
}

fn story_step(ctx: &RenderContext) -> String {
    let form = &ctx.snapshot.form;
    let mut html = header(ctx, "step2");
    html.push_str(r#"<div class="form-container">"#);
    let _ = write!(
        html,
        r#"<div class="form-group"><label for="productName">{}</label><input type="text" id="productName" name="productName" value="{}" placeholder="{}"/></div>"#,
        ctx.t("step2.productName"),
        escape_html(&form.product_name),
        ctx.t("step2.productNamePlaceholder")
    );
    let _ = write!(
        html,
        r#"<div class="form-group"><label for="tagline">{}</label><input type="text" id="tagline" name="tagline" value="{}" placeholder="{}"/></div>"#,
        ctx.t("step2.tagline"),
        escape_html(&form.tagline),
        ctx.t("step2.taglinePlaceholder")
    );
    let count = form.product_story.chars().count().to_string();
    let max = ctx.story_limit.to_string();
    let _ = write!(
        html,
        r#"<div class="form-group"><label for="productStory">{}</label><textarea id="productStory" name="productStory" rows="4" maxlength="{max}" placeholder="{}">{}</textarea><small class="char-counter">{}</small></div>"#,
        ctx.t("step2.story"),
        ctx.t("step2.storyPlaceholder"),
        escape_html(&form.product_story),
        ctx.tp("step2.storyCounter", &[("count", count.as_str()), ("max", max.as_str())])
    );
    html.push_str("</div>");
    html.push_str(&actions(ctx, true, "common.next"));
    html
}

fn preferences_step(ctx: &RenderContext) -> String {
    let form = &ctx.snapshot.form;
    let mut html = header(ctx, "step3");

    let _ = write!(html, r#"<fieldset class="color-options"><legend>{}</legend>"#, ctx.t("step3.colors"));
    for color in COLOR_CHOICES {
        let checked = if form.preferred_colors.contains(color) { " checked" } else { "" };
        let _ = write!(
            html,
            r#"<label class="color-option" style="background-color: {color}" title="{color}"><input type="checkbox" name="preferredColors" value="{color}"{checked}/></label>"#
        );
    }
    html.push_str("</fieldset>");

    let _ = write!(html, r#"<label for="salesPlatform">{}</label><select id="salesPlatform" name="salesPlatform">"#, ctx.t("step3.platform"));
    for platform in SalesPlatform::ALL {
        html.push_str(&option(ctx, "platforms", platform.as_str(), platform == form.sales_platform));
    }
    html.push_str("</select>");

    let _ = write!(html, r#"<label for="desiredEmotion">{}</label><select id="desiredEmotion" name="desiredEmotion">"#, ctx.t("step3.emotion"));
    for emotion in DesiredEmotion::ALL {
        html.push_str(&option(ctx, "emotions", emotion.as_str(), emotion == form.desired_emotion));
    }
    html.push_str("</select>");

    html.push_str(&actions(ctx, true, "step3.create"));
    html
}

fn option(ctx: &RenderContext, group: &str, value: &str, selected: bool) -> String {
    format!(
        r#"<option value="{value}"{}>{}</option>"#,
        if selected { " selected" } else { "" },
        ctx.t(&format!("{group}.{value}"))
    )
}

fn generating_step(ctx: &RenderContext) -> String {
    let loading = &ctx.snapshot.loading;
    let mut html = String::from(r#"<div class="loading-container">"#);
    let _ = write!(html, "<h3>{}</h3>", ctx.t("magic.title"));

    if let GenerationStatus::Failed { message } = &ctx.snapshot.status {
        let _ = write!(
            html,
            r#"<div class="generation-error"><p>{}</p><p class="error-detail">{}</p><button type="button" class="btn-primary" data-action="next">{}</button><button type="button" class="btn-secondary" data-action="back">{}</button></div>"#,
            ctx.t("magic.failed"),
            escape_html(message),
            ctx.t("common.retry"),
            ctx.t("common.back")
        );
    } else {
        let percent = format!("{:.0}", loading.progress);
        let _ = write!(
            html,
            r#"<div class="progress-track"><div class="progress-fill" style="width: {percent}%"></div></div><p class="progress-text">{}</p><p class="loading-message">{}</p>"#,
            ctx.tp("magic.progress", &[("percent", percent.as_str())]),
            escape_html(&loading.message)
        );
    }
    html.push_str("</div>");
    html
}

fn preview_step(ctx: &RenderContext) -> String {
    let preview = &ctx.snapshot.preview;
    let mut html = header(ctx, "preview");
    html.push_str(r#"<div class="design-preview"><div class="design-mockup">"#);
    let _ = write!(html, "<h3>{}</h3>", ctx.t("preview.packaging"));
    match preview.mockup_url.as_deref().and_then(safe_url) {
        Some(url) => {
            let _ = write!(
                html,
                r#"<img src="{}" alt="{}" class="mockup-image"/>"#,
                escape_html(url),
                escape_html(&ctx.snapshot.form.product_name)
            );
        }
        None => {
            let _ = write!(html, r#"<div class="mockup-placeholder"><p>{}</p></div>"#, ctx.t("preview.mockupPlaceholder"));
        }
    }
    html.push_str(r#"</div><div class="design-details">"#);

    let _ = write!(html, r#"<h3>{}</h3><div class="concepts-list">"#, ctx.t("preview.concepts"));
    if preview.concepts.is_empty() {
        for key in DEFAULT_CONCEPT_KEYS {
            let _ = write!(html, r#"<div class="concept-item">• {}</div>"#, ctx.t(key));
        }
    } else {
        for concept in &preview.concepts {
            let _ = write!(html, r#"<div class="concept-item">• {}</div>"#, escape_html(concept));
        }
    }
    html.push_str("</div>");

    let swatches: Vec<&str> = preview.color_palette.iter().filter_map(|c| css_color(c)).collect();
    if !swatches.is_empty() {
        let _ = write!(html, r#"<h4>{}</h4><div class="color-palette">"#, ctx.t("preview.palette"));
        for color in swatches {
            let _ = write!(
                html,
                r#"<div class="color-swatch" style="background-color: {color}" title="{color}"></div>"#
            );
        }
        html.push_str("</div>");
    }

    if !preview.styles_suggestions.is_empty() {
        let _ = write!(html, r#"<h4>{}</h4><div class="styles-list">"#, ctx.t("preview.styles"));
        for style in &preview.styles_suggestions {
            let _ = write!(html, r#"<div class="style-item">• {}</div>"#, escape_html(style));
        }
        html.push_str("</div>");
    }

    if let Some(advice) = &preview.professional_advice {
        let _ = write!(
            html,
            r#"<h4>{}</h4><p class="professional-advice">{}</p>"#,
            ctx.t("preview.advice"),
            escape_html(advice)
        );
    }

    if let Some(design_id) = &preview.design_id {
        let _ = write!(
            html,
            r#"<div class="design-info"><small>{}</small>"#,
            ctx.tp("preview.designId", &[("id", design_id.as_str())])
        );
        if let Some(confidence) = preview.ai_confidence {
            let value = format!("{:.1}", confidence * 100.0);
            let _ = write!(html, "<small>{}</small>", ctx.tp("preview.confidence", &[("value", value.as_str())]));
        }
        html.push_str("</div>");
    }
    html.push_str("</div></div>");

    html.push_str(r#"<div class="preview-actions">"#);
    let _ = write!(
        html,
        r#"<button type="button" class="btn-secondary" data-action="goto" data-step="story">{}</button><button type="button" class="btn-secondary" data-action="goto" data-step="preferences">{}</button>"#,
        ctx.t("preview.backToEdit"),
        ctx.t("preview.editPreferences")
    );
    if ctx.features.design_regeneration {
        let _ = write!(
            html,
            r#"<button type="button" class="btn-primary" data-action="regenerate">{}</button>"#,
            ctx.t("preview.regenerate")
        );
    }
    let _ = write!(
        html,
        r#"<button type="button" class="btn-accent" data-action="next">{}</button></div>"#,
        ctx.t("preview.download")
    );
    html
}

fn download_step(ctx: &RenderContext) -> String {
    let preview = &ctx.snapshot.preview;
    let mut html = header(ctx, "download");
    html.push_str(r#"<div class="download-container">"#);
    if let Some(url) = preview.mockup_url.as_deref().and_then(safe_url) {
        let _ = write!(
            html,
            r#"<a class="btn-primary" href="{}" download>{}</a>"#,
            escape_html(url),
            ctx.t("download.mockup")
        );
    }
    if let Some(url) = preview.pdf_url.as_deref().and_then(safe_url) {
        let _ = write!(
            html,
            r#"<a class="btn-secondary" href="{}" target="_blank" rel="noopener">{}</a>"#,
            escape_html(url),
            ctx.t("download.report")
        );
    }
    let _ = write!(
        html,
        r#"<a class="btn-secondary" href="report.pdf" download>{}</a>"#,
        ctx.t("download.summary")
    );

    if ctx.features.social_sharing {
        let text = ctx
            .translator
            .translate(&ctx.snapshot.language, "download.shareText", &[("product", ctx.snapshot.form.product_name.as_str())]);
        let encoded: String = url::form_urlencoded::byte_serialize(text.as_bytes()).collect();
        let _ = write!(
            html,
            r#"<div class="share-links"><span>{}</span><a href="https://wa.me/?text={encoded}" target="_blank" rel="noopener">WhatsApp</a><a href="https://twitter.com/intent/tweet?text={encoded}" target="_blank" rel="noopener">X</a></div>"#,
            ctx.t("download.share")
        );
    }
    html.push_str("</div>");
    html
}
