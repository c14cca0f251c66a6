//! # メール送信リクエスト
//!
//! ホストのオーケストレーションエンジンから渡される送信設定を定義する。
//!
//! ## 設計方針
//!
//! - **イミュータブルな設定構造体**: ビルダー連鎖ではなく名前付きフィールド +
//!   serde デフォルトで表現し、デシリアライズ時点で検証する
//!   （`port` は [`NonZeroU16`] のため 0 を表現できない）
//! - **呼び出しごとに供給**: 設定はプロセス全体でキャッシュせず、
//!   1 回の送信ごとに渡される
//! - **動的フィールド**: ホスト名・認証情報・宛先・件名・本文・添付はすべて
//!   `{{ }}` プレースホルダを含み得る。利用前に
//!   [`VariableRenderer`](crate::render::VariableRenderer) を通すこと
//! - **秘匿情報の保護**: `Debug` 出力にパスワードを含めない

use std::{fmt, num::NonZeroU16, time::Duration};

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;

use crate::render::RenderContext;

/// 添付ファイルのデフォルト MIME タイプ
pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// セッションタイムアウトのデフォルト値（ミリ秒）
///
/// 接続・読み取り・書き込みのすべてに一律で適用される。
pub const DEFAULT_SESSION_TIMEOUT_MS: u64 = 1000;

/// SMTP セッションのトランスポート戦略
///
/// 未指定の場合は SMTPS（接続開始時点から TLS）がデフォルト。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TransportStrategy {
    /// 平文 SMTP（TLS なし。ローカルの Mailpit 等に限る）
    Plain,
    /// STARTTLS による TLS へのアップグレード
    Starttls,
    /// 接続開始時点から TLS（implicit TLS）
    #[default]
    Smtps,
}

/// 添付ファイル・埋め込み画像の宣言
///
/// `uri` は外部ブロブストレージへの不透明なハンドル。
/// 送信 1 回につきちょうど 1 回解決され、送信間でキャッシュされない。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    /// ストレージ URI（例: `s3://bucket/key`）。動的フィールド
    pub uri:          String,
    /// 受信者に表示されるファイル名（例: `report.pdf`）。動的フィールド
    pub name:         String,
    /// MIME タイプ。省略時は `application/octet-stream`
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

fn default_content_type() -> String {
    DEFAULT_CONTENT_TYPE.to_string()
}

/// 解決済み添付ファイル
///
/// ストレージから全読み込みしたバイト列と、レンダリング済みの表示名・
/// MIME タイプ。構築されたメッセージが所有し、送信完了または失敗後に破棄される。
#[derive(Clone)]
pub struct ResolvedAttachment {
    /// レンダリング済み表示名
    pub name:         String,
    /// レンダリング済み MIME タイプ
    pub content_type: String,
    /// ファイル内容
    pub bytes:        Vec<u8>,
}

impl fmt::Debug for ResolvedAttachment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // バイト列本体はダンプしない
        f.debug_struct("ResolvedAttachment")
            .field("name", &self.name)
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

/// メール送信タスクの設定
///
/// ホストが動的フィールド解決前の設定をデシリアライズして渡す。
/// `cc`・`attachments`・`embedded_images` は「空」と「未指定」を同値に扱う
/// （空の場合 Cc ヘッダ・添付パートは付与されない）。
#[derive(Clone, Serialize, Deserialize)]
pub struct MailSendRequest {
    /* サーバー情報 */
    /// SMTP サーバーのホスト名。動的フィールド
    pub host: String,

    /// SMTP サーバーのポート番号（1 以上）
    pub port: NonZeroU16,

    /// SMTP 認証ユーザー名。動的フィールド。
    /// `username`・`password` が揃っている場合のみ AUTH を行う
    #[serde(default)]
    pub username: Option<String>,

    /// SMTP 認証パスワード。動的フィールド
    #[serde(default)]
    pub password: Option<String>,

    /// トランスポート戦略。省略時は SMTPS
    #[serde(default)]
    pub transport_strategy: TransportStrategy,

    /// セッションタイムアウト（ミリ秒）。接続・読み取り・書き込みに一律適用。
    /// 0 は無制限。省略時は 1000ms
    #[serde(default = "default_session_timeout_ms")]
    pub session_timeout_ms: u64,

    /* メール情報 */
    /// 送信元アドレス。動的フィールド
    pub from: String,

    /// 宛先アドレス。`;` 区切りで複数指定可。動的フィールド。
    /// 各アドレスは RFC 2822 mailbox 構文に従うこと
    pub to: String,

    /// Cc アドレス。`;` 区切りで複数指定可。動的フィールド
    #[serde(default)]
    pub cc: Option<String>,

    /// 件名。動的フィールド
    #[serde(default)]
    pub subject: String,

    /// HTML 本文。動的フィールド。
    /// `template_uri` が指定されている場合はテンプレート展開結果が優先される
    #[serde(default)]
    pub html_body: String,

    /// バンドルテンプレート名。指定時は展開結果を HTML 本文として使用する
    #[serde(default)]
    pub template_uri: Option<String>,

    /// テンプレート展開に使う変数マップ。省略時は空
    #[serde(default)]
    pub template_variables: RenderContext,

    /// 添付ファイル（受信者には宣言順に提示される）
    #[serde(default)]
    pub attachments: Vec<Attachment>,

    /// HTML 本文から content-id（`cid:名前`）で参照される埋め込み画像
    #[serde(default)]
    pub embedded_images: Vec<Attachment>,
}

fn default_session_timeout_ms() -> u64 {
    DEFAULT_SESSION_TIMEOUT_MS
}

impl fmt::Debug for MailSendRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // パスワードはログに出さない
        f.debug_struct("MailSendRequest")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("transport_strategy", &self.transport_strategy)
            .field("session_timeout_ms", &self.session_timeout_ms)
            .field("from", &self.from)
            .field("to", &self.to)
            .field("cc", &self.cc)
            .field("subject", &self.subject)
            .field("template_uri", &self.template_uri)
            .field("attachments", &self.attachments.len())
            .field("embedded_images", &self.embedded_images.len())
            .finish_non_exhaustive()
    }
}

/// レンダリング済みの SMTP サーバーパラメータ
///
/// 動的フィールド解決後にトランスポートへ渡される。
/// セッションは呼び出しごとに確立され、プールされない。
#[derive(Clone)]
pub struct SmtpServer {
    /// SMTP サーバーのホスト名
    pub host:               String,
    /// ポート番号
    pub port:               NonZeroU16,
    /// 認証ユーザー名
    pub username:           Option<String>,
    /// 認証パスワード
    pub password:           Option<String>,
    /// トランスポート戦略
    pub strategy:           TransportStrategy,
    /// セッションタイムアウト（ミリ秒、0 は無制限）
    pub session_timeout_ms: u64,
}

impl SmtpServer {
    /// セッションタイムアウトを `Duration` として返す
    ///
    /// `session_timeout_ms` が 0 の場合は `None`（無制限）。
    pub fn timeout(&self) -> Option<Duration> {
        (self.session_timeout_ms > 0).then(|| Duration::from_millis(self.session_timeout_ms))
    }

    /// 認証情報を返す
    ///
    /// ユーザー名・パスワードが揃っている場合のみ `Some`。
    pub fn credentials(&self) -> Option<(&str, &str)> {
        match (&self.username, &self.password) {
            (Some(user), Some(pass)) => Some((user, pass)),
            _ => None,
        }
    }
}

impl fmt::Debug for SmtpServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpServer")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "***"))
            .field("strategy", &self.strategy)
            .field("session_timeout_ms", &self.session_timeout_ms)
            .finish()
    }
}
