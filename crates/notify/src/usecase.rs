//! # 送信パイプライン
//!
//! メール通知タスクの各段階を統合する。
//!
//! ## モジュール構成
//!
//! - [`template`] - バンドルテンプレートの展開
//! - [`resolve`] - 添付ファイル・埋め込み画像の解決
//! - [`compose`] - マルチパートメッセージの構築
//! - [`send`] - パイプライン全体を統合する送信ユースケース

pub mod compose;
pub mod resolve;
pub mod send;
pub mod template;

pub use resolve::AttachmentResolver;
pub use send::SendMail;
pub use template::TemplateExpander;
