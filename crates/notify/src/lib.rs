//! # MailFlow 通知タスク層
//!
//! ワークフローオーケストレーションエンジンのメール通知タスクを実装する。
//!
//! ## 処理の流れ
//!
//! ```text
//! TemplateExpander（テンプレート構成時）
//!   → 動的フィールドのレンダリング
//!   → AttachmentResolver（添付・埋め込み画像の解決）
//!   → compose（マルチパートメッセージの構築）
//!   → MailTransport（SMTP 送信、タイムアウト適用）
//! ```
//!
//! エントリポイントは [`SendMail`]。ホストはレンダリング済み設定
//! （[`mailflow_domain::mail::MailSendRequest`]）と変数コンテキストを渡し、
//! 成功（`Ok(())`）または失敗（[`mailflow_domain::MailError`]）を受け取る。
//! 1 回の呼び出しにつき送信は 1 回のみで、リトライ・キューイングは行わない。
//!
//! ## モジュール構成
//!
//! - [`usecase`] - 送信パイプライン（展開・解決・構築・送信）
//! - [`renderer`] - tera による変数展開エンジン実装
//! - [`config`] - 開発環境向け SMTP 設定の環境変数読み込み

pub mod config;
pub mod renderer;
pub mod usecase;

pub use renderer::TeraRenderer;
pub use usecase::send::SendMail;
