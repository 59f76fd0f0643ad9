// src/digest/mod.rs
//! Template digests in DejiRyu's voice.
//!
//! Everything here is a pure function of its inputs and `now`; the empty-input
//! filler rotates by ISO week so the same week always yields the same text.

pub mod prompts;

use chrono::{DateTime, Datelike, FixedOffset, Utc};

use crate::config::{ConsultationConfig, ExclusiveItem};
use crate::discord::Message;
use crate::news::NewsItem;

pub const ACHIEVEMENT_EXCERPT_CHARS: usize = 120;
pub const INTRO_EXCERPT_CHARS: usize = 160;

/// Which digest a filler belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillerKind {
    Achievements,
    SelfIntro,
    AiNews,
}

const ACHIEVEMENT_FILLERS: &[&str] = &[
    "デジリュー通信！この期間は「できた！」報告が見当たらなかったぞ…。みんなの挑戦を聞かせてくれ！",
    "今回は「できた！」報告がゼロだったぞ。小さな一歩でも立派な成果だ、遠慮なく書き込んでくれよな！",
    "デジリュー、報告を待ちわびて尻尾がしょんぼりしてるぞ…。次は「できた！」をドカンと頼む！",
    "静かな期間だったな！準備期間も大事だ。形になったらすぐ報告してくれよ🔥",
];

const INTRO_FILLERS: &[&str] = &[
    "デジリューが巡回完了！この期間に新しい自己紹介はなかったぞ。まだ名乗ってない仲間は、どしどし自己紹介してくれよな！",
    "自己紹介チャンネルは今日も静かだ…。好きなこと、やりたいこと、一言からでも大歓迎だぞ！",
    "新顔はいなかったけど、デジリューはいつでも待ってるぞ！はじめましての一言、気軽にどうぞ！",
];

const NEWS_FILLERS: &[&str] = &[
    "デジリュー速報…今日は新しいAIニュースが拾えなかった。面白いネタを見つけたらみんなも教えてくれ！",
    "今朝のAIニュースは在庫切れだぞ！その分、自分の学びをアウトプットしてみようぜ☀️",
    "ニュース巡回したけど新ネタなしだ…。明日の朝はもっと熱いトピックを届けるからな！",
];

fn fillers(kind: FillerKind) -> &'static [&'static str] {
    match kind {
        FillerKind::Achievements => ACHIEVEMENT_FILLERS,
        FillerKind::SelfIntro => INTRO_FILLERS,
        FillerKind::AiNews => NEWS_FILLERS,
    }
}

/// ISO week of `now` in the configured local offset.
pub fn week_of_year(now: DateTime<Utc>, offset: FixedOffset) -> u32 {
    now.with_timezone(&offset).iso_week().week()
}

/// Rotate through a fixed list by week number.
pub fn pick_by_week<T>(options: &[T], now: DateTime<Utc>, offset: FixedOffset) -> Option<&T> {
    if options.is_empty() {
        return None;
    }
    let idx = week_of_year(now, offset) as usize % options.len();
    options.get(idx)
}

pub fn filler(kind: FillerKind, now: DateTime<Utc>, offset: FixedOffset) -> &'static str {
    pick_by_week(fillers(kind), now, offset)
        .copied()
        .unwrap_or_default()
}

/// Single-line excerpt of at most `max_chars` characters, `…` when cut.
pub fn excerpt(text: &str, max_chars: usize) -> String {
    let flat = text.replace(['\r', '\n'], " ");
    let flat = flat.trim();
    if flat.chars().count() <= max_chars {
        return flat.to_string();
    }
    let mut out: String = flat.chars().take(max_chars).collect();
    out.push('…');
    out
}

fn range_label(start: DateTime<Utc>, now: DateTime<Utc>, offset: FixedOffset) -> String {
    format!(
        "{}〜{}",
        start.with_timezone(&offset).format("%m/%d"),
        now.with_timezone(&offset).format("%m/%d")
    )
}

/// Header used both for the template and to frame an AI-written body.
pub fn achievement_header(start: DateTime<Utc>, now: DateTime<Utc>, offset: FixedOffset) -> String {
    format!(
        "{}の「できた！」報告まとめだぞ💪",
        range_label(start, now, offset)
    )
}

/// One bullet per message, in input order.
pub fn achievement_digest(
    messages: &[Message],
    start: DateTime<Utc>,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> String {
    if messages.is_empty() {
        return filler(FillerKind::Achievements, now, offset).to_string();
    }
    let mut lines = vec![
        achievement_header(start, now, offset),
        "みんなの成長、デジリューがしっかり見届けた！".to_string(),
    ];
    for m in messages {
        let text = excerpt(&m.content, ACHIEVEMENT_EXCERPT_CHARS);
        let text = if text.is_empty() {
            "（添付で報告してくれたぞ！）".to_string()
        } else {
            text
        };
        lines.push(format!("- {}：{}", m.author_mention(), text));
    }
    lines.push("次もド派手な「できた！」を待ってるぞ🔥".to_string());
    lines.join("\n")
}

pub fn intro_header(start: DateTime<Utc>, now: DateTime<Utc>, offset: FixedOffset) -> String {
    format!(
        "デジリューの自己紹介パトロールだぞ！{}のニューフェイスをまとめたぜ🔥",
        range_label(start, now, offset)
    )
}

/// Latest message per author, authors in order of first appearance.
pub fn latest_per_author(messages: &[Message]) -> Vec<&Message> {
    let mut out: Vec<&Message> = Vec::new();
    for m in messages {
        match out.iter_mut().find(|seen| seen.author.id == m.author.id) {
            Some(slot) => {
                if m.timestamp >= slot.timestamp {
                    *slot = m;
                }
            }
            None => out.push(m),
        }
    }
    out
}

pub fn intro_digest(
    messages: &[Message],
    start: DateTime<Utc>,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> String {
    let latest = latest_per_author(messages);
    if latest.is_empty() {
        return filler(FillerKind::SelfIntro, now, offset).to_string();
    }
    let mut lines = vec![intro_header(start, now, offset)];
    for m in latest {
        let text = excerpt(&m.content, INTRO_EXCERPT_CHARS);
        let text = if text.is_empty() {
            "自己紹介をしてくれたぞ！".to_string()
        } else {
            text
        };
        lines.push(format!("- {} さん：{}", m.author_mention(), text));
    }
    lines.push(String::new());
    lines.push("仲良くなるチャンスを逃すなよ！気になった子にはスレッドで声をかけてみてくれ！".to_string());
    lines.join("\n")
}

pub fn news_header(now: DateTime<Utc>, offset: FixedOffset) -> String {
    format!(
        "おはデジー！{}のAIトピックをお届けだぞ☀️🤖",
        now.with_timezone(&offset).format("%m月%d日")
    )
}

pub fn news_digest(items: &[NewsItem], now: DateTime<Utc>, offset: FixedOffset) -> String {
    if items.is_empty() {
        return filler(FillerKind::AiNews, now, offset).to_string();
    }
    let mut lines = vec![
        news_header(now, offset),
        "朝のアウトプットに使ってくれよな！".to_string(),
        String::new(),
    ];
    for it in items {
        let mut block = vec![format!("- **{}**", it.title)];
        if !it.summary.is_empty() {
            block.push(format!("  {}", it.summary));
        }
        block.push(format!("  {}", it.url));
        lines.push(block.join("\n"));
    }
    lines.join("\n")
}

/// Frame an AI-written body with the template header; news keeps its links.
pub fn with_ai_body(header: &str, body: &str, links: &[&str]) -> String {
    let mut out = format!("{header}\n\n{body}");
    if !links.is_empty() {
        out.push_str("\n\n");
        out.push_str(
            &links
                .iter()
                .map(|l| format!("<{l}>"))
                .collect::<Vec<_>>()
                .join("\n"),
        );
    }
    out
}

/// Prompt for the consultation channel, optionally pinging a role.
pub fn consultation_message(
    cfg: &ConsultationConfig,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> String {
    let variation = pick_by_week(&cfg.message_variations, now, offset)
        .map(String::as_str)
        .unwrap_or_default();
    let ping = cfg
        .ping_role_id
        .as_deref()
        .map(|id| format!("<@&{id}>\n"))
        .unwrap_or_default();
    format!(
        "{ping}デジリューからのおたずねタイム！\n{variation}\n疑問が浮かんだ瞬間に投げてくれていいんだぞ。"
    )
}

/// Days since 0001-01-01 in the configured offset.
fn local_day(now: DateTime<Utc>, offset: FixedOffset) -> i64 {
    i64::from(now.with_timezone(&offset).date_naive().num_days_from_ce())
}

/// Item on show for the current `rotation_days`-long slot; stable within a slot.
pub fn pick_exclusive<'a>(
    items: &'a [ExclusiveItem],
    rotation_days: u32,
    now: DateTime<Utc>,
    offset: FixedOffset,
) -> Option<&'a ExclusiveItem> {
    if items.is_empty() {
        return None;
    }
    let slot = local_day(now, offset).div_euclid(i64::from(rotation_days.max(1)));
    let idx = slot.rem_euclid(items.len() as i64) as usize;
    items.get(idx)
}

pub fn exclusive_message(item: &ExclusiveItem) -> String {
    let mut lines = vec![
        "デジリューの極秘コンテンツ搬入だぞ🔥".to_string(),
        format!("**{}**", item.title),
    ];
    if !item.description.is_empty() {
        lines.push(item.description.clone());
    }
    if let Some(url) = &item.url {
        lines.push(format!("アクセスはこちら👉 {url}"));
    }
    lines.push("感想や活用例をスレッドで自慢してくれよな！".to_string());
    lines.join("\n")
}
