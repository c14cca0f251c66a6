//! # MailFlow インフラ層
//!
//! 外部システムとの接続・通信を担当するインフラストラクチャ層。
//!
//! ## 責務
//!
//! - **ブロブストレージ**: 添付ファイル URI のデリファレンス
//!   （Amazon S3 / MinIO、ローカルファイルシステム）
//! - **SMTP トランスポート**: lettre による送信セッションの確立と
//!   タイムアウト制御
//!
//! ## 依存関係
//!
//! ```text
//! notify → infra → domain
//! ```
//!
//! インフラ層は `domain` のみに依存する。ドメイン層はインフラ層に依存しない
//! （依存性逆転の原則）。
//!
//! ## モジュール構成
//!
//! - [`storage`] - ブロブストレージ接続（[`storage::BlobStorage`] トレイト）
//! - [`transport`] - SMTP トランスポート（[`transport::MailTransport`] トレイト）
//! - [`mock`] - テスト用インメモリモック（`test-utils` feature）

pub mod storage;
pub mod transport;

#[cfg(any(test, feature = "test-utils"))]
pub mod mock;

pub use storage::{BlobStorage, FsBlobStorage, S3BlobStorage};
pub use transport::{MailTransport, SmtpMailer, send_with_deadline};
