//! # メール送信エラー定義
//!
//! テンプレート展開から SMTP 送信までのパイプラインで発生するエラーを表現する。
//!
//! ## 設計方針
//!
//! - **1 回の送信につき終端的**: どのエラーも現在の送信を中断する。
//!   部分的なメッセージは送信されず、リトライはこのコンポーネントでは行わない
//!   （リトライ方針は呼び出し元オーケストレータの責務）
//! - **SpanTrace 自動捕捉**: convenience constructor でエラー生成時の
//!   呼び出し経路を自動記録する
//! - **段階の区別**: SMTP 送信失敗は [`TransportStage`]（connect / auth / send）を
//!   保持し、呼び出し元が一時的な障害と恒久的な設定ミスを区別できるようにする
//!
//! ## 構造
//!
//! `std::io::Error` と同じ struct + enum パターンを採用:
//! - [`MailError`]: エラー種別（[`MailErrorKind`]）と [`SpanTrace`] を保持するラッパー
//! - [`MailErrorKind`]: エラーの具体的な種別（TemplateNotFound, Transport 等）

use std::fmt;

use serde::{Deserialize, Serialize};
use strum::IntoStaticStr;
use thiserror::Error;
use tracing_error::SpanTrace;

/// SMTP セッションの進行段階
///
/// [`MailErrorKind::Transport`] に格納され、エラーがどの段階で発生したかを示す。
/// snake_case でシリアライズされる。
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    IntoStaticStr,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "snake_case")]
pub enum TransportStage {
    /// 接続確立（TCP / TLS ハンドシェイク）
    Connect,
    /// SMTP 認証
    Auth,
    /// メッセージ送信（プロトコルレベルの拒否を含む）
    Send,
}

/// メール送信パイプラインで発生するエラー
///
/// エラー種別（[`MailErrorKind`]）と [`SpanTrace`]（呼び出し経路）を保持する。
/// convenience constructor でエラーを生成すると、その時点のスパン情報が
/// 自動的にキャプチャされる。
///
/// ## パターンマッチ
///
/// エラー種別に応じた処理には [`kind()`](MailError::kind) を使用する:
///
/// ```ignore
/// match error.kind() {
///     MailErrorKind::TransportTimeout { .. } => { /* タイムアウト処理 */ }
///     _ => { /* その他 */ }
/// }
/// ```
pub struct MailError {
    kind:       MailErrorKind,
    span_trace: SpanTrace,
}

/// メール送信エラーの種別
///
/// テンプレート展開、添付ファイル取得、アドレス検証、SMTP 送信のそれぞれで
/// 発生するエラーの具体的な種別。呼び出し元オーケストレータがこの種別に
/// 応じて実行ステータスを記録する。
#[derive(Debug, Error)]
pub enum MailErrorKind {
    /// 指定された名前のバンドルテンプレートが存在しない
    #[error("テンプレートが見つかりません: {uri}")]
    TemplateNotFound {
        /// テンプレート名（バンドルリソース名）
        uri: String,
    },

    /// テンプレートのレンダリングに失敗
    ///
    /// 未定義変数の参照や式展開の失敗を含む。
    #[error("テンプレートレンダリングに失敗: {0}")]
    TemplateRender(String),

    /// 添付ファイルの取得に失敗
    ///
    /// ひとつでも取得に失敗した場合、送信全体が中断される
    /// （部分的な添付で送信されることはない）。
    #[error("添付ファイルの取得に失敗: {uri} ({message})")]
    AttachmentResolution {
        /// 取得できなかったストレージ URI
        uri:     String,
        /// 失敗理由
        message: String,
    },

    /// メールアドレスが RFC 2822 mailbox 構文として不正
    #[error("メールアドレスが不正です: {raw}")]
    InvalidAddress {
        /// パースに失敗した生の文字列
        raw: String,
    },

    /// SMTP セッションがタイムアウト上限を超過
    ///
    /// 接続・読み取り・書き込みのいずれの段階でも同じ上限が適用される。
    #[error("SMTP セッションがタイムアウトしました: {timeout_ms}ms")]
    TransportTimeout {
        /// 設定されていたタイムアウト（ミリ秒）
        timeout_ms: u64,
    },

    /// SMTP 送信に失敗
    #[error("SMTP 送信に失敗 ({stage}): {cause}")]
    Transport {
        /// 失敗した段階
        stage: TransportStage,
        /// 失敗理由（サーバー応答等）
        cause: String,
    },
}

// ===== MailError のメソッド =====

impl MailError {
    /// エラー種別を取得する
    pub fn kind(&self) -> &MailErrorKind {
        &self.kind
    }

    /// SpanTrace を取得する
    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    /// MailError を分解して MailErrorKind と SpanTrace を取り出す
    pub fn into_parts(self) -> (MailErrorKind, SpanTrace) {
        (self.kind, self.span_trace)
    }

    /// MailErrorKind と SpanTrace から MailError を組み立てる
    pub fn from_parts(kind: MailErrorKind, span_trace: SpanTrace) -> Self {
        Self { kind, span_trace }
    }

    /// Transport バリアントの場合、stage と cause を返す
    ///
    /// 呼び出し元がリトライ可能な一時障害（connect）と恒久的な設定ミス
    /// （auth 等）を区別するためのヘルパー。
    pub fn as_transport(&self) -> Option<(TransportStage, &str)> {
        match &self.kind {
            MailErrorKind::Transport { stage, cause } => Some((*stage, cause)),
            _ => None,
        }
    }

    // ===== Convenience constructors =====

    /// テンプレート未発見エラーを生成する
    pub fn template_not_found(uri: impl Into<String>) -> Self {
        Self {
            kind:       MailErrorKind::TemplateNotFound { uri: uri.into() },
            span_trace: SpanTrace::capture(),
        }
    }

    /// テンプレートレンダリングエラーを生成する
    pub fn template_render(msg: impl Into<String>) -> Self {
        Self {
            kind:       MailErrorKind::TemplateRender(msg.into()),
            span_trace: SpanTrace::capture(),
        }
    }

    /// 添付ファイル取得エラーを生成する
    pub fn attachment_resolution(uri: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            kind:       MailErrorKind::AttachmentResolution {
                uri:     uri.into(),
                message: msg.into(),
            },
            span_trace: SpanTrace::capture(),
        }
    }

    /// アドレス不正エラーを生成する
    pub fn invalid_address(raw: impl Into<String>) -> Self {
        Self {
            kind:       MailErrorKind::InvalidAddress { raw: raw.into() },
            span_trace: SpanTrace::capture(),
        }
    }

    /// タイムアウトエラーを生成する
    pub fn transport_timeout(timeout_ms: u64) -> Self {
        Self {
            kind:       MailErrorKind::TransportTimeout { timeout_ms },
            span_trace: SpanTrace::capture(),
        }
    }

    /// SMTP 送信エラーを生成する
    pub fn transport(stage: TransportStage, cause: impl Into<String>) -> Self {
        Self {
            kind:       MailErrorKind::Transport {
                stage,
                cause: cause.into(),
            },
            span_trace: SpanTrace::capture(),
        }
    }
}

// ===== トレイト実装 =====

impl fmt::Display for MailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)
    }
}

impl fmt::Debug for MailError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MailError")
            .field("kind", &self.kind)
            .field("span_trace", &self.span_trace)
            .finish()
    }
}

impl std::error::Error for MailError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.kind.source()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use tracing_subscriber::layer::SubscriberExt as _;

    use super::*;

    /// テスト用に ErrorLayer 付き subscriber を設定する
    fn with_error_layer(f: impl FnOnce()) {
        let subscriber = tracing_subscriber::registry().with(tracing_error::ErrorLayer::default());
        let _guard = tracing::subscriber::set_default(subscriber);
        f();
    }

    // ===== Convenience constructor のテスト =====

    #[test]
    fn test_template_not_foundでspan_traceがキャプチャされる() {
        with_error_layer(|| {
            let span = tracing::info_span!("test_expand");
            let _enter = span.enter();

            let err = MailError::template_not_found("missing.html");

            assert!(matches!(
                err.kind(),
                MailErrorKind::TemplateNotFound { uri } if uri == "missing.html"
            ));
            let trace_str = format!("{}", err.span_trace());
            assert!(
                trace_str.contains("test_expand"),
                "SpanTrace がスパン名を含むこと: {trace_str}",
            );
        });
    }

    #[test]
    fn test_attachment_resolutionがuriを保持する() {
        with_error_layer(|| {
            let err = MailError::attachment_resolution("s3://bucket/report.pdf", "取得失敗");
            assert!(matches!(
                err.kind(),
                MailErrorKind::AttachmentResolution { uri, .. } if uri == "s3://bucket/report.pdf"
            ));
        });
    }

    #[test]
    fn test_transportでstageとcauseが保持される() {
        with_error_layer(|| {
            let err = MailError::transport(TransportStage::Auth, "535 authentication failed");

            let (stage, cause) = err.as_transport().expect("Transport バリアントであること");
            assert_eq!(stage, TransportStage::Auth);
            assert_eq!(cause, "535 authentication failed");
        });
    }

    #[test]
    fn test_as_transportで非transportはnoneを返す() {
        let err = MailError::invalid_address("not-an-address");
        assert!(err.as_transport().is_none());
    }

    // ===== Display / source のテスト =====

    #[test]
    fn test_displayがmail_error_kindのメッセージを出力する() {
        let err = MailError::invalid_address("not-an-address");
        assert_eq!(
            format!("{err}"),
            "メールアドレスが不正です: not-an-address"
        );
    }

    #[test]
    fn test_transport_timeoutのdisplayがタイムアウト値を含む() {
        let err = MailError::transport_timeout(1000);
        assert_eq!(
            format!("{err}"),
            "SMTP セッションがタイムアウトしました: 1000ms"
        );
    }

    // ===== TransportStage のテスト =====

    #[test]
    fn transport_stageの文字列変換が正しい() {
        // Display (snake_case)
        assert_eq!(TransportStage::Connect.to_string(), "connect");
        assert_eq!(TransportStage::Auth.to_string(), "auth");
        assert_eq!(TransportStage::Send.to_string(), "send");

        // FromStr (snake_case)
        assert_eq!(
            TransportStage::from_str("connect").unwrap(),
            TransportStage::Connect
        );
        assert_eq!(
            TransportStage::from_str("auth").unwrap(),
            TransportStage::Auth
        );
        assert_eq!(
            TransportStage::from_str("send").unwrap(),
            TransportStage::Send
        );
    }
}
