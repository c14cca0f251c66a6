//! # 変数展開エンジン実装
//!
//! tera で `{{name}}` 形式のプレースホルダを展開する
//! [`VariableRenderer`] の実装。
//!
//! ホスト側に独自の展開エンジンがある場合はそちらの [`VariableRenderer`]
//! 実装を注入する。本実装は単体利用・テスト用のリファレンス。

use mailflow_domain::{
    MailError,
    render::{RenderContext, VariableRenderer},
};
use tera::Tera;

/// tera による変数展開エンジン
///
/// テンプレートは呼び出しごとに展開され、キャッシュされない。
/// 参照された変数が未定義の場合は失敗する。
#[derive(Debug, Clone, Copy, Default)]
pub struct TeraRenderer;

impl TeraRenderer {
    /// 新しいレンダラーインスタンスを作成する
    pub fn new() -> Self {
        Self
    }
}

impl VariableRenderer for TeraRenderer {
    fn render(&self, template: &str, context: &RenderContext) -> Result<String, MailError> {
        // メールアドレスや件名を HTML エスケープしてはならないため autoescape は無効
        Tera::one_off(template, &to_tera_context(context), false)
            .map_err(|e| MailError::template_render(error_chain(&e)))
    }
}

pub(crate) fn to_tera_context(context: &RenderContext) -> tera::Context {
    let mut tera_context = tera::Context::new();
    for (name, value) in context {
        tera_context.insert(name.as_str(), value);
    }
    tera_context
}

/// tera のエラーを原因チェーンまで含めた 1 行のメッセージにする
///
/// tera のトップレベルメッセージは「レンダリング失敗」としか言わず、
/// 未定義変数名などの実情報は source 側にある。
pub(crate) fn error_chain(error: &tera::Error) -> String {
    let mut message = error.to_string();
    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        message.push_str(&format!(": {cause}"));
        source = cause.source();
    }
    message
}
