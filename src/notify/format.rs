//! Chat and email renderings of a result list.

use chrono::{DateTime, FixedOffset};

use crate::models::Listing;
use crate::scrapers::extract::truncate_chars;

pub const APP_NAME: &str = "Listing Watch";

/// Telegram rejects messages longer than this
pub const CHAT_MAX_CHARS: usize = 4096;
pub const CHAT_DESCRIPTION_MAX_CHARS: usize = 150;
pub const EMAIL_DESCRIPTION_MAX_CHARS: usize = 300;

const HEAVY_RULE: &str = "━━━━━━━━━━━━━━━━━━━━";
const LIGHT_RULE: &str = "━━━━━━━━━━━━━━";

const EMAIL_STYLE: &str = r#"
body { font-family: Arial, sans-serif; direction: rtl; background: #f5f5f5; padding: 20px; }
.container { max-width: 600px; margin: 0 auto; background: white; border-radius: 10px; padding: 20px; box-shadow: 0 2px 10px rgba(0,0,0,0.1); }
h2 { color: #333; border-bottom: 2px solid #007bff; padding-bottom: 10px; }
.result { border: 1px solid #e0e0e0; padding: 15px; margin: 15px 0; border-radius: 8px; background: #fafafa; }
.site { color: #007bff; font-size: 12px; font-weight: bold; text-transform: uppercase; letter-spacing: 1px; }
.title { font-size: 18px; font-weight: bold; margin: 10px 0; color: #333; }
.price { color: #28a745; font-size: 20px; font-weight: bold; margin: 10px 0; }
.description { color: #666; font-size: 14px; margin: 10px 0; line-height: 1.5; }
.link { display: inline-block; background: #007bff; color: white !important; padding: 10px 20px; border-radius: 5px; text-decoration: none; margin-top: 10px; }
.footer { color: #888; font-size: 12px; margin-top: 20px; padding-top: 15px; border-top: 1px solid #eee; text-align: center; }
"#;

/// Rendered email, with a plain-text alternative
#[derive(Debug, Clone, PartialEq)]
pub struct EmailContent {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// One notification, rendered for every channel that may carry it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Alert {
    /// Chat messages, each within `CHAT_MAX_CHARS`
    pub chat: Vec<String>,
    /// `None` for chat-only notifications
    pub email: Option<EmailContent>,
}

impl Alert {
    pub fn new_results(listings: &[Listing], now: DateTime<FixedOffset>) -> Self {
        Self {
            chat: render_chat(listings, now),
            email: Some(render_email(listings, now)),
        }
    }

    pub fn status(ui_url: &str, now: DateTime<FixedOffset>) -> Self {
        Self {
            chat: vec![render_status(ui_url, now)],
            email: None,
        }
    }
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(c),
        }
    }
    out
}

fn shorten(text: &str, max_chars: usize) -> String {
    if text.chars().count() > max_chars {
        format!("{}...", truncate_chars(text, max_chars))
    } else {
        text.to_string()
    }
}

fn stamp(now: DateTime<FixedOffset>) -> String {
    now.format("%d/%m/%Y %H:%M").to_string()
}

fn chat_block(index: usize, listing: &Listing) -> String {
    let mut block = format!(
        "<b>📍 [{}] {}</b>\n{}\n📦 <b>{}</b>\n",
        index,
        listing.site,
        LIGHT_RULE,
        escape_html(&listing.title)
    );
    if !listing.price.is_unknown() {
        block.push_str(&format!("💰 <b>{}</b>\n", escape_html(&listing.price.to_string())));
    }
    if !listing.description.is_empty() {
        block.push_str(&format!(
            "📝 {}\n",
            escape_html(&shorten(&listing.description, CHAT_DESCRIPTION_MAX_CHARS))
        ));
    }
    if !listing.location.is_empty() {
        block.push_str(&format!("📍 {}\n", escape_html(&listing.location)));
    }
    if !listing.phone.is_empty() {
        block.push_str(&format!("📞 {}\n", escape_html(&listing.phone)));
    }
    block.push_str(&format!(
        "\n🔗 <a href=\"{}\">לצפייה במודעה</a>\n\n",
        escape_html(&listing.url)
    ));
    block
}

/// Chat rendering, split between listing blocks so no message exceeds `CHAT_MAX_CHARS`
pub fn render_chat(listings: &[Listing], now: DateTime<FixedOffset>) -> Vec<String> {
    if listings.is_empty() {
        return Vec::new();
    }

    let header = format!(
        "🔔 <b>התראה: נמצאו {} תוצאות!</b>\n⏰ {}\n{}\n\n",
        listings.len(),
        stamp(now),
        HEAVY_RULE
    );
    let footer = format!("{}\n🤖 {} - סריקה אוטומטית", HEAVY_RULE, APP_NAME);

    let mut messages = Vec::new();
    let mut current = header;
    for (i, listing) in listings.iter().enumerate() {
        let block = chat_block(i + 1, listing);
        let len = current.chars().count();
        if len > 0 && len + block.chars().count() > CHAT_MAX_CHARS {
            messages.push(std::mem::take(&mut current));
        }
        current.push_str(&block);
    }

    if current.chars().count() + footer.chars().count() > CHAT_MAX_CHARS {
        messages.push(std::mem::take(&mut current));
    }
    current.push_str(&footer);
    messages.push(current);
    messages
}

pub fn render_email(listings: &[Listing], now: DateTime<FixedOffset>) -> EmailContent {
    let mut body = format!(
        "<h2>🔔 התראה: נמצאו {} תוצאות!</h2>\n<p style=\"color: #666;\">⏰ {}</p>\n",
        listings.len(),
        stamp(now)
    );

    for listing in listings {
        body.push_str("<div class=\"result\">\n");
        body.push_str(&format!("<div class=\"site\">📍 {}</div>\n", listing.site));
        body.push_str(&format!("<div class=\"title\">📦 {}</div>\n", escape_html(&listing.title)));
        if !listing.price.is_unknown() {
            body.push_str(&format!(
                "<div class=\"price\">💰 {}</div>\n",
                escape_html(&listing.price.to_string())
            ));
        }
        if !listing.description.is_empty() {
            body.push_str(&format!(
                "<div class=\"description\">📝 {}</div>\n",
                escape_html(&shorten(&listing.description, EMAIL_DESCRIPTION_MAX_CHARS))
            ));
        }
        if !listing.location.is_empty() {
            body.push_str(&format!(
                "<div class=\"description\">📍 מיקום: {}</div>\n",
                escape_html(&listing.location)
            ));
        }
        if !listing.phone.is_empty() {
            body.push_str(&format!(
                "<div class=\"description\">📞 טלפון: {}</div>\n",
                escape_html(&listing.phone)
            ));
        }
        body.push_str(&format!(
            "<a href=\"{}\" class=\"link\" target=\"_blank\">🔗 לצפייה במודעה</a>\n</div>\n",
            escape_html(&listing.url)
        ));
    }

    body.push_str(&format!(
        "<div class=\"footer\">🤖 {} - סריקה אוטומטית<br>לשינוי הגדרות, ערוך את קובץ ההגדרות</div>\n",
        APP_NAME
    ));

    let html = format!(
        "<!DOCTYPE html>\n<html dir=\"rtl\" lang=\"he\">\n<head>\n<meta charset=\"utf-8\">\n<style>{}</style>\n</head>\n<body>\n<div class=\"container\">\n{}</div>\n</body>\n</html>\n",
        EMAIL_STYLE, body
    );

    EmailContent {
        subject: format!("🔔 {}: נמצאו {} תוצאות חדשות!", APP_NAME, listings.len()),
        text: html_to_text(&body),
        html,
    }
}

pub fn render_status(ui_url: &str, now: DateTime<FixedOffset>) -> String {
    format!(
        "✅ <b>{} - פעיל</b>\n\n📅 {}\n🔍 הסורק רץ ומחפש עבורך\n\n⚙️ <a href=\"{}\">ניהול | ON/OFF</a>",
        APP_NAME,
        stamp(now),
        escape_html(ui_url)
    )
}

/// Plain-text version of an HTML body: line breaks kept, tags dropped, blank runs collapsed
pub fn html_to_text(html: &str) -> String {
    let with_breaks = html
        .replace("<br />", "\n")
        .replace("<br/>", "\n")
        .replace("<br>", "\n");
    let fragment = scraper::Html::parse_fragment(&with_breaks);
    let raw: String = fragment.root_element().text().collect();

    let mut lines: Vec<&str> = Vec::new();
    for line in raw.lines().map(str::trim) {
        if line.is_empty() && lines.last().map_or(true, |prev| prev.is_empty()) {
            continue;
        }
        lines.push(line);
    }
    lines.join("\n").trim().to_string()
}
