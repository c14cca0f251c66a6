//! # SMTP 設定の環境変数読み込み
//!
//! 開発環境向けに、SMTP サーバーのパラメータを環境変数から読み込む。
//! ローカル開発では Mailpit（localhost:1025、TLS なし）がデフォルト。
//!
//! タスク単位の設定はホストから
//! [`MailSendRequest`](mailflow_domain::mail::MailSendRequest) として
//! 呼び出しごとに渡される。ここで読み込むのはサーバーをプロセス全体で
//! 固定運用するホスト向けのデフォルト値のみ。

use std::{env, num::NonZeroU16, str::FromStr};

use mailflow_domain::mail::{DEFAULT_SESSION_TIMEOUT_MS, SmtpServer, TransportStrategy};

/// 環境変数から SMTP サーバーパラメータを読み込む
///
/// | 変数 | デフォルト |
/// |---|---|
/// | `SMTP_HOST` | `localhost` |
/// | `SMTP_PORT` | `1025`（Mailpit） |
/// | `SMTP_USERNAME` / `SMTP_PASSWORD` | なし（AUTH しない） |
/// | `SMTP_TRANSPORT_STRATEGY` | `PLAIN`（ローカル SMTP 向け。本番は `SMTPS` を指定） |
/// | `SMTP_SESSION_TIMEOUT_MS` | `1000` |
pub fn smtp_server_from_env() -> SmtpServer {
    SmtpServer {
        host:               env::var("SMTP_HOST").unwrap_or_else(|_| "localhost".to_string()),
        port:               env::var("SMTP_PORT")
            .unwrap_or_else(|_| "1025".to_string())
            .parse::<NonZeroU16>()
            .expect("SMTP_PORT は 1 以上の有効なポート番号である必要があります"),
        username:           env::var("SMTP_USERNAME").ok(),
        password:           env::var("SMTP_PASSWORD").ok(),
        strategy:           env::var("SMTP_TRANSPORT_STRATEGY").map_or(
            TransportStrategy::Plain,
            |raw| {
                TransportStrategy::from_str(&raw)
                    .expect("SMTP_TRANSPORT_STRATEGY は PLAIN / STARTTLS / SMTPS のいずれかである必要があります")
            },
        ),
        session_timeout_ms: env::var("SMTP_SESSION_TIMEOUT_MS")
            .unwrap_or_else(|_| DEFAULT_SESSION_TIMEOUT_MS.to_string())
            .parse()
            .expect("SMTP_SESSION_TIMEOUT_MS は有効なミリ秒値である必要があります"),
    }
}
