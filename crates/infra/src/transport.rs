//! # SMTP トランスポート
//!
//! 構築済みメッセージを SMTP サーバーへ送信する。
//!
//! ## 設計方針
//!
//! - **trait による抽象化**: [`MailTransport`] トレイトで送信を抽象化し、
//!   テスト時はモックに差し替える
//! - **セッションは呼び出しごと**: タスク実行は独立かつ短命のため、
//!   接続のプール・再利用は行わない
//! - **スコープドリソース**: セッションは送信直前に確立し、正常終了・
//!   タイムアウト・エラーのどの経路でも呼び出しが返る前に解放される
//! - **リトライなし**: 送信は 1 回のみ。リトライ方針は呼び出し元の責務

mod smtp;

use async_trait::async_trait;
use lettre::Message;
use mailflow_domain::{MailError, mail::SmtpServer};
pub use smtp::SmtpMailer;

/// メール送信トレイト
///
/// 構築済みメッセージを 1 回だけ送信する。メッセージは消費される
/// （同一メッセージの再送はない）。
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// メッセージを送信する
    ///
    /// セッションの確立・解放は実装の内部で完結する。
    async fn submit(&self, server: &SmtpServer, message: Message) -> Result<(), MailError>;
}

/// セッションタイムアウトを適用して送信する
///
/// `server.timeout()` が `Some` の場合、送信全体（接続・認証・送信）を
/// その上限で打ち切り、超過時は
/// [`MailErrorKind::TransportTimeout`](mailflow_domain::MailErrorKind::TransportTimeout)
/// を返す。打ち切られた送信 future は drop され、確立途中のセッションも
/// そこで解放される。
pub async fn send_with_deadline(
    transport: &dyn MailTransport,
    server: &SmtpServer,
    message: Message,
) -> Result<(), MailError> {
    match server.timeout() {
        Some(limit) => tokio::time::timeout(limit, transport.submit(server, message))
            .await
            .map_err(|_| MailError::transport_timeout(server.session_timeout_ms))?,
        None => transport.submit(server, message).await,
    }
}
