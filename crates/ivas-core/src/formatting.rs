//! Telegram HTML rendering for portal results.

use chrono::Local;

use crate::portal::{NumberRecord, SmsMessage};

/// Escape HTML special characters for Telegram HTML parse mode.
pub fn escape_html(text: &str) -> String {
    escape_html_within(text, usize::MAX)
}

fn sms_block(number: &str, message: &str, date: &str) -> String {
    format!(
        "———\n📞 <b>From:</b> <code>{number}</code>\n💬 <b>Message:</b> {message}\n⏰ <b>Date:</b> {date}"
    )
}

/// Escape `text`, keeping at most `max_bytes` of escaped output.
///
/// Cuts only between source characters, so entities are never split.
fn escape_html_within(text: &str, max_bytes: usize) -> String {
    let mut out = String::new();
    let mut buf = [0u8; 4];
    for c in text.chars() {
        let piece = match c {
            '&' => "&amp;",
            '<' => "&lt;",
            '>' => "&gt;",
            '"' => "&quot;",
            _ => &*c.encode_utf8(&mut buf),
        };
        if out.len().saturating_add(piece.len()) > max_bytes {
            break;
        }
        out.push_str(piece);
    }
    out
}

/// One rendered SMS, at most `limit` bytes when the number and date allow it.
///
/// Only the message body is shortened, so the markup and the date line stay intact.
fn render_sms(msg: &SmsMessage, limit: usize) -> String {
    let number = escape_html(&msg.number);
    let date = escape_html(&msg.date);
    let overhead = sms_block(&number, "", &date).len();
    let message = escape_html_within(&msg.message, limit.saturating_sub(overhead));
    sms_block(&number, &message, &date)
}

/// Render an SMS batch for the group chat, split into messages of at most
/// `limit` bytes.
///
/// Blocks are never split across messages. A message body too long for one
/// block is shortened before escaping.
pub fn format_sms_batches(messages: &[SmsMessage], limit: usize) -> Vec<String> {
    let header = format!(
        "📩 <b>New SMS Messages</b> ({}, {})",
        messages.len(),
        Local::now().format("%Y-%m-%d %H:%M")
    );
    let mut out = Vec::new();
    let mut chunk = truncate_utf8(&header, limit).to_string();

    for msg in messages {
        let block = render_sms(msg, limit);
        if !chunk.is_empty() && chunk.len() + 1 + block.len() > limit {
            out.push(std::mem::take(&mut chunk));
        }
        if !chunk.is_empty() {
            chunk.push('\n');
        }
        chunk.push_str(&block);
    }

    if !chunk.is_empty() {
        out.push(chunk);
    }
    out
}

fn truncate_utf8(s: &str, max_bytes: usize) -> &str {
    if s.len() <= max_bytes {
        return s;
    }
    let mut end = max_bytes;
    while end > 0 && !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

/// Plain-text numbers file: one number per line.
pub fn render_numbers_file(records: &[NumberRecord]) -> String {
    let mut out = String::new();
    for r in records {
        out.push_str(&r.number);
        out.push('\n');
    }
    out
}

/// `numbers_<id>.txt`, with anything but `[A-Za-z0-9_-]` replaced by `_`.
pub fn numbers_file_name(termination_id: &str) -> String {
    let safe: String = termination_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!("numbers_{safe}.txt")
}
