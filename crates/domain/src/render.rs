//! # 変数レンダリング
//!
//! ホストのオーケストレーションエンジンが持つ変数展開エンジンとの
//! インターフェースを定義する。
//!
//! ## 設計方針
//!
//! - **コラボレータの抽象化**: 展開エンジンの実体（tera 等）には依存せず、
//!   同期的な `render` 契約だけをドメイン層に置く
//! - **全動的フィールドが対象**: ホスト名・認証情報・宛先・件名・本文・
//!   添付の URI / 名前 / MIME タイプは、利用前に必ずこのインターフェースを通す

use std::collections::HashMap;

use crate::MailError;

/// 変数展開のコンテキスト
///
/// 変数名からシリアライズ可能な値へのマップ。
pub type RenderContext = HashMap<String, serde_json::Value>;

/// 変数展開エンジン
///
/// `{{name}}` 形式のプレースホルダを `context` の値で置換する。
/// 参照された変数が未定義の場合は
/// [`MailErrorKind::TemplateRender`](crate::MailErrorKind::TemplateRender)
/// で失敗する。
pub trait VariableRenderer: Send + Sync {
    /// テンプレート文字列を展開する
    fn render(&self, template: &str, context: &RenderContext) -> Result<String, MailError>;

    /// `Option` のフィールドを展開する
    ///
    /// `None` はそのまま `None` を返す。
    fn render_opt(
        &self,
        template: Option<&str>,
        context: &RenderContext,
    ) -> Result<Option<String>, MailError> {
        template.map(|t| self.render(t, context)).transpose()
    }
}
