//! # MailFlow ドメイン層
//!
//! メール通知タスクのドメインモデルを定義する。
//!
//! ## 設計方針
//!
//! このクレートはメール送信タスクの入出力となる値オブジェクトと、
//! 送信パイプライン全体で共有するエラー型、および外部コラボレータの
//! インターフェースを提供する:
//!
//! - **値オブジェクト**: [`mail::MailSendRequest`] などの送信設定
//! - **エラー型**: [`MailError`]（エラー種別 + SpanTrace）
//! - **コラボレータ**: [`render::VariableRenderer`]（ホスト側の変数展開エンジン）
//!
//! ## 依存関係の方向
//!
//! ```text
//! notify → infra → domain
//! ```
//!
//! ドメイン層は兄弟クレートに一切依存しない。SMTP やストレージなど
//! 外部システムの詳細はインフラ層に閉じ込める。

pub mod error;
pub mod mail;
pub mod render;

pub use error::{MailError, MailErrorKind, TransportStage};
