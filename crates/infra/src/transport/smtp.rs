//! lettre による SMTP トランスポート実装
//!
//! `AsyncSmtpTransport<Tokio1Executor>` を呼び出しごとに構築して送信する。
//! トランスポート戦略は次のように接続方式へ対応する:
//!
//! - `PLAIN`: TLS なし（Mailpit 等のローカル SMTP 向け）
//! - `STARTTLS`: 平文接続後に TLS へアップグレード（`Tls::Required`）
//! - `SMTPS`: 接続開始時点から TLS（`Tls::Wrapper`）

use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport,
    AsyncTransport,
    Message,
    Tokio1Executor,
    transport::smtp::{
        authentication::Credentials,
        client::{Tls, TlsParameters},
    },
};
use mailflow_domain::{MailError, TransportStage, mail::{SmtpServer, TransportStrategy}};

use super::MailTransport;

/// 認証段階の失敗を示す SMTP 応答コード
///
/// 530: 認証必須 / 534: 認証機構が弱い / 535: 認証情報不正 / 538: 暗号化必須
const AUTH_FAILURE_CODES: [&str; 4] = ["530", "534", "535", "538"];

/// lettre SMTP トランスポート
///
/// 状態を持たない。セッションは [`submit`](MailTransport::submit) の呼び出し
/// ごとに確立され、呼び出しが返る時点で解放されている。
#[derive(Debug, Clone, Copy, Default)]
pub struct SmtpMailer;

impl SmtpMailer {
    /// 新しいトランスポートインスタンスを作成する
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl MailTransport for SmtpMailer {
    async fn submit(&self, server: &SmtpServer, message: Message) -> Result<(), MailError> {
        let transport = build_transport(server)?;

        tracing::debug!(
            host = %server.host,
            port = server.port.get(),
            strategy = %server.strategy,
            "SMTP セッションを確立"
        );

        transport
            .send(message)
            .await
            .map(|_| ())
            .map_err(|e| classify_error(server, &e))
        // transport はここで drop され、接続も解放される
    }
}

/// サーバーパラメータから lettre トランスポートを構築する
fn build_transport(
    server: &SmtpServer,
) -> Result<AsyncSmtpTransport<Tokio1Executor>, MailError> {
    let mut builder = match server.strategy {
        TransportStrategy::Plain => {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&server.host)
        }
        TransportStrategy::Starttls => {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&server.host)
                .tls(Tls::Required(tls_parameters(server)?))
        }
        TransportStrategy::Smtps => {
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&server.host)
                .tls(Tls::Wrapper(tls_parameters(server)?))
        }
    };

    builder = builder.port(server.port.get()).timeout(server.timeout());

    if let Some((username, password)) = server.credentials() {
        builder = builder.credentials(Credentials::new(
            username.to_string(),
            password.to_string(),
        ));
    }

    Ok(builder.build())
}

fn tls_parameters(server: &SmtpServer) -> Result<TlsParameters, MailError> {
    TlsParameters::new(server.host.clone()).map_err(|e| {
        MailError::transport(TransportStage::Connect, format!("TLS 設定の構築に失敗: {e}"))
    })
}

/// lettre のエラーを段階付きの [`MailError`] に分類する
///
/// - タイムアウト → `TransportTimeout`
/// - サーバー応答あり: 認証系コード → `auth`、それ以外の拒否 → `send`
/// - サーバー応答に到達していない（接続・TLS・I/O） → `connect`
fn classify_error(server: &SmtpServer, error: &lettre::transport::smtp::Error) -> MailError {
    if error.is_timeout() {
        return MailError::transport_timeout(server.session_timeout_ms);
    }

    if let Some(code) = error.status() {
        let code = code.to_string();
        let stage = if AUTH_FAILURE_CODES.contains(&code.as_str()) {
            TransportStage::Auth
        } else {
            TransportStage::Send
        };
        return MailError::transport(stage, error.to_string());
    }

    MailError::transport(TransportStage::Connect, error.to_string())
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroU16;

    use rstest::rstest;

    use super::*;

    fn make_server(strategy: TransportStrategy) -> SmtpServer {
        SmtpServer {
            host:               "mail.example.com".to_string(),
            port:               NonZeroU16::new(465).unwrap(),
            username:           Some("mailer".to_string()),
            password:           Some("secret".to_string()),
            strategy,
            session_timeout_ms: 1000,
        }
    }

    #[rstest]
    #[case(TransportStrategy::Plain)]
    #[case(TransportStrategy::Starttls)]
    #[case(TransportStrategy::Smtps)]
    fn 各戦略でトランスポートを構築できる(#[case] strategy: TransportStrategy) {
        // 構築のみ（接続は行わない）
        assert!(build_transport(&make_server(strategy)).is_ok());
    }

    #[test]
    fn 認証情報なしでも構築できる() {
        let server = SmtpServer {
            username: None,
            password: None,
            ..make_server(TransportStrategy::Plain)
        };
        assert!(build_transport(&server).is_ok());
    }

    #[test]
    fn トレイトはsendとsyncを実装している() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<SmtpMailer>();
    }
}
