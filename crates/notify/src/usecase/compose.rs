//! # メッセージ構築
//!
//! レンダリング済みのフィールドと解決済み添付から、送信可能な
//! マルチパートメッセージを組み立てる。ネットワーク・ディスク I/O は行わない。
//!
//! ## MIME 構造
//!
//! ```text
//! multipart/mixed
//! └─ multipart/related
//!    ├─ multipart/alternative
//!    │  ├─ text/plain（固定のフォールバック文）
//!    │  └─ text/html （優先される本文）
//!    └─ 埋め込み画像（content-id で HTML から参照、inline 表示）
//! └─ 添付ファイル（ダウンロード提示、宣言順）
//! ```
//!
//! 埋め込み画像・添付がない場合、対応する階層は省略される。
//!
//! ## アドレスリスト
//!
//! `to` / `cc` は `;` 区切りの複数アドレス。各トークンは前後の空白を除去した
//! うえで RFC 2822 mailbox 構文として検証し、最初の不正トークンで
//! `InvalidAddress` を返す。変数展開（`{{recipient}}` 等）の後に呼ぶこと。

use lettre::{
    Message,
    message::{
        Attachment as AttachmentPart,
        Mailbox,
        MultiPart,
        SinglePart,
        header::{ContentType, Header, HeaderName, HeaderValue},
    },
};
use mailflow_domain::{MailError, TransportStage, mail::ResolvedAttachment};

/// HTML を表示できないクライアント向けの固定フォールバック文
pub const PLAIN_TEXT_FALLBACK: &str = "Please view this email in a modern email client!";

/// アドレスリストの区切り文字
const ADDRESS_DELIMITER: char = ';';

/// 開封確認（return receipt）要求ヘッダ
///
/// lettre に定義がないため独自ヘッダとして実装する。
/// すべての送信メッセージに付与される。
#[derive(Debug, Clone)]
struct DispositionNotificationTo(String);

impl Header for DispositionNotificationTo {
    fn name() -> HeaderName {
        HeaderName::new_from_ascii_str("Disposition-Notification-To")
    }

    fn parse(s: &str) -> Result<Self, Box<dyn std::error::Error + Send + Sync>> {
        Ok(Self(s.to_string()))
    }

    fn display(&self) -> HeaderValue {
        HeaderValue::new(Self::name(), self.0.clone())
    }
}

/// レンダリング済みのメールフィールド
///
/// 変数展開を終えた値のみを保持する。生の `{{ }}` プレースホルダを
/// この構造体に入れてはならない。
#[derive(Debug, Clone)]
pub struct RenderedMail {
    /// 送信元アドレス
    pub from:      String,
    /// 宛先アドレス（`;` 区切り、1 件以上）
    pub to:        String,
    /// Cc アドレス（`;` 区切り）。`None` と空文字列は同値
    pub cc:        Option<String>,
    /// 件名
    pub subject:   String,
    /// HTML 本文
    pub html_body: String,
}

/// `;` 区切りのアドレスリストをパースする
///
/// 空トークン（末尾の `;` 等）は無視する。最初の不正トークンで
/// `InvalidAddress` を返す。
pub fn parse_address_list(raw: &str) -> Result<Vec<Mailbox>, MailError> {
    raw.split(ADDRESS_DELIMITER)
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(|token| {
            token
                .parse::<Mailbox>()
                .map_err(|_| MailError::invalid_address(token))
        })
        .collect()
}

/// メッセージを構築する
///
/// 添付・埋め込み画像は渡された順序のまま配置される。
/// 宛先が 1 件も得られない場合は `InvalidAddress` を返す。
pub fn compose(
    mail: &RenderedMail,
    attachments: Vec<ResolvedAttachment>,
    embedded_images: Vec<ResolvedAttachment>,
) -> Result<Message, MailError> {
    let from: Mailbox = mail
        .from
        .trim()
        .parse()
        .map_err(|_| MailError::invalid_address(mail.from.trim()))?;

    let to = parse_address_list(&mail.to)?;
    if to.is_empty() {
        return Err(MailError::invalid_address(&mail.to));
    }

    let cc = match &mail.cc {
        Some(raw) => parse_address_list(raw)?,
        None => Vec::new(),
    };

    let mut builder = Message::builder()
        .subject(mail.subject.as_str())
        .header(DispositionNotificationTo(from.to_string()))
        .from(from);

    for mailbox in to {
        builder = builder.to(mailbox);
    }
    for mailbox in cc {
        builder = builder.cc(mailbox);
    }

    let body = assemble_body(mail, attachments, embedded_images)?;

    builder
        .multipart(body)
        .map_err(|e| MailError::transport(TransportStage::Send, format!("メッセージ構築失敗: {e}")))
}

/// 本文のマルチパート階層を組み立てる
fn assemble_body(
    mail: &RenderedMail,
    attachments: Vec<ResolvedAttachment>,
    embedded_images: Vec<ResolvedAttachment>,
) -> Result<MultiPart, MailError> {
    let alternative = MultiPart::alternative()
        .singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_PLAIN)
                .body(PLAIN_TEXT_FALLBACK.to_string()),
        )
        .singlepart(
            SinglePart::builder()
                .header(ContentType::TEXT_HTML)
                .body(mail.html_body.clone()),
        );

    let body = if embedded_images.is_empty() {
        alternative
    } else {
        let mut related = MultiPart::related().multipart(alternative);
        for image in embedded_images {
            related = related.singlepart(inline_image_part(image)?);
        }
        related
    };

    if attachments.is_empty() {
        return Ok(body);
    }

    let mut mixed = MultiPart::mixed().multipart(body);
    for attachment in attachments {
        mixed = mixed.singlepart(attachment_part(attachment)?);
    }
    Ok(mixed)
}

/// ダウンロード提示される添付パートを構築する
fn attachment_part(attachment: ResolvedAttachment) -> Result<SinglePart, MailError> {
    let content_type = parse_content_type(&attachment.content_type)?;
    Ok(AttachmentPart::new(attachment.name).body(attachment.bytes, content_type))
}

/// HTML から `cid:名前` で参照される inline パートを構築する
///
/// content-id はレンダリング済みの表示名をそのまま使う。
fn inline_image_part(image: ResolvedAttachment) -> Result<SinglePart, MailError> {
    let content_type = parse_content_type(&image.content_type)?;
    Ok(AttachmentPart::new_inline(image.name).body(image.bytes, content_type))
}

fn parse_content_type(raw: &str) -> Result<ContentType, MailError> {
    // リゾルバで検証済みのため通常は成功する
    ContentType::parse(raw).map_err(|e| {
        MailError::transport(
            TransportStage::Send,
            format!("メッセージ構築失敗: MIME タイプ {raw} が不正: {e}"),
        )
    })
}

#[cfg(test)]
mod tests {
    use mailflow_domain::MailErrorKind;
    use pretty_assertions::assert_eq;

    use super::*;

    fn make_mail() -> RenderedMail {
        RenderedMail {
            from:      "noreply@example.com".to_string(),
            to:        "tanaka@example.com".to_string(),
            cc:        None,
            subject:   "Execution EX-0042 finished".to_string(),
            html_body: "<p>All tasks completed.</p>".to_string(),
        }
    }

    fn make_attachment(name: &str, content_type: &str) -> ResolvedAttachment {
        ResolvedAttachment {
            name:         name.to_string(),
            content_type: content_type.to_string(),
            bytes:        vec![0x25, 0x50, 0x44, 0x46],
        }
    }

    fn header_of(message: &Message, name: &str) -> String {
        message
            .headers()
            .get_raw(name)
            .map(ToString::to_string)
            .unwrap_or_default()
    }

    // ===== アドレスリストのテスト =====

    #[test]
    fn セミコロン区切りのアドレスが順序どおりにパースされる() {
        let mailboxes = parse_address_list("a@x.com; b@y.com").unwrap();

        assert_eq!(mailboxes.len(), 2);
        assert_eq!(mailboxes[0].to_string(), "a@x.com");
        assert_eq!(mailboxes[1].to_string(), "b@y.com");
    }

    #[test]
    fn 表示名つきアドレスをパースできる() {
        let mailboxes = parse_address_list("Tanaka Taro <tanaka@example.com>").unwrap();

        assert_eq!(mailboxes.len(), 1);
        assert_eq!(mailboxes[0].email.to_string(), "tanaka@example.com");
    }

    #[test]
    fn 末尾のセミコロンと空白は無視される() {
        let mailboxes = parse_address_list(" a@x.com ; ").unwrap();

        assert_eq!(mailboxes.len(), 1);
    }

    #[test]
    fn 不正なトークンはinvalid_addressで失敗する() {
        let err = parse_address_list("a@x.com; not-an-address").unwrap_err();

        assert!(matches!(
            err.kind(),
            MailErrorKind::InvalidAddress { raw } if raw == "not-an-address"
        ));
    }

    // ===== メッセージ構築のテスト =====

    #[test]
    fn ヘッダがレンダリング済みの値と一致する() {
        let mail = RenderedMail {
            cc: Some("sato@example.com; suzuki@example.com".to_string()),
            ..make_mail()
        };

        let message = compose(&mail, Vec::new(), Vec::new()).unwrap();

        assert_eq!(header_of(&message, "From"), "noreply@example.com");
        assert_eq!(header_of(&message, "To"), "tanaka@example.com");
        assert_eq!(
            header_of(&message, "Cc"),
            "sato@example.com, suzuki@example.com"
        );
        assert_eq!(header_of(&message, "Subject"), "Execution EX-0042 finished");
    }

    #[test]
    fn 開封確認ヘッダが常に付与される() {
        let message = compose(&make_mail(), Vec::new(), Vec::new()).unwrap();

        assert_eq!(
            header_of(&message, "Disposition-Notification-To"),
            "noreply@example.com"
        );
    }

    #[test]
    fn 宛先が空の場合はinvalid_addressで失敗する() {
        let mail = RenderedMail {
            to: "  ".to_string(),
            ..make_mail()
        };

        let err = compose(&mail, Vec::new(), Vec::new()).unwrap_err();

        assert!(matches!(err.kind(), MailErrorKind::InvalidAddress { .. }));
    }

    #[test]
    fn ccが空文字列の場合はヘッダが付与されない() {
        let mail = RenderedMail {
            cc: Some(String::new()),
            ..make_mail()
        };

        let message = compose(&mail, Vec::new(), Vec::new()).unwrap();

        assert!(message.headers().get_raw("Cc").is_none());
    }

    #[test]
    fn プレーンテキストのフォールバックが含まれる() {
        let message = compose(&make_mail(), Vec::new(), Vec::new()).unwrap();

        let raw = String::from_utf8_lossy(&message.formatted()).into_owned();
        assert!(raw.contains("multipart/alternative"));
        assert!(raw.contains(PLAIN_TEXT_FALLBACK));
        assert!(raw.contains("<p>All tasks completed.</p>"));
    }

    #[test]
    fn 添付が宣言順に配置される() {
        let attachments = vec![
            make_attachment("first.pdf", "application/pdf"),
            make_attachment("second.csv", "text/csv"),
            make_attachment("third.txt", "text/plain"),
        ];

        let message = compose(&make_mail(), attachments, Vec::new()).unwrap();

        let raw = String::from_utf8_lossy(&message.formatted()).into_owned();
        assert!(raw.contains("multipart/mixed"));

        let first = raw.find("first.pdf").unwrap();
        let second = raw.find("second.csv").unwrap();
        let third = raw.find("third.txt").unwrap();
        assert!(first < second && second < third);
    }

    #[test]
    fn 埋め込み画像はcontent_idつきのinlineパートになる() {
        let images = vec![make_attachment("logo.png", "image/png")];

        let message = compose(&make_mail(), Vec::new(), images).unwrap();

        let raw = String::from_utf8_lossy(&message.formatted()).into_owned();
        assert!(raw.contains("multipart/related"));
        assert!(raw.contains("Content-ID: <logo.png>"));
        assert!(raw.contains("Content-Disposition: inline"));
    }

    #[test]
    fn 添付も画像もない場合はalternativeのみになる() {
        let message = compose(&make_mail(), Vec::new(), Vec::new()).unwrap();

        let raw = String::from_utf8_lossy(&message.formatted()).into_owned();
        assert!(!raw.contains("multipart/mixed"));
        assert!(!raw.contains("multipart/related"));
    }

    #[test]
    fn 添付と画像の両方があると階層がすべて構築される() {
        let attachments = vec![make_attachment("report.pdf", "application/pdf")];
        let images = vec![make_attachment("chart.png", "image/png")];

        let message = compose(&make_mail(), attachments, images).unwrap();

        let raw = String::from_utf8_lossy(&message.formatted()).into_owned();
        assert!(raw.contains("multipart/mixed"));
        assert!(raw.contains("multipart/related"));
        assert!(raw.contains("multipart/alternative"));
    }
}
