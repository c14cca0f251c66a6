//! # テンプレート展開
//!
//! バンドルされた HTML テンプレートを名前で引き、変数マップで展開して
//! メール本文を生成する。
//!
//! ## 設計方針
//!
//! - **`include_str!` によるコンパイル時埋め込み**: テンプレートはバイナリに
//!   埋め込まれる。ユーザー指定のファイルシステムパスは読み込まない
//! - **キャッシュなし**: 展開結果は呼び出しごとに再生成する
//!   （テンプレートは小さく、レンダリング頻度も低い）

use mailflow_domain::{MailError, render::RenderContext};
use tera::Tera;

use crate::renderer::{error_chain, to_tera_context};

/// バンドルテンプレートの一覧
const TEMPLATES: &[(&str, &str)] = &[
    (
        "execution_status.html",
        include_str!("../../templates/execution_status.html"),
    ),
    (
        "task_failed.html",
        include_str!("../../templates/task_failed.html"),
    ),
];

/// テンプレート展開エンジン
///
/// `include_str!` で埋め込んだテンプレートを tera に登録し、
/// 名前と変数マップから HTML 本文を生成する。
pub struct TemplateExpander {
    engine: Tera,
}

impl TemplateExpander {
    /// 新しい展開エンジンを作成する
    ///
    /// バンドルテンプレートを tera に登録する。
    pub fn new() -> Result<Self, MailError> {
        let mut engine = Tera::default();

        engine
            .add_raw_templates(TEMPLATES.to_vec())
            .map_err(|e| MailError::template_render(error_chain(&e)))?;

        Ok(Self { engine })
    }

    /// テンプレートを展開する
    ///
    /// `template_uri` が `None` の場合は空文字列を返す（エラーにしない）。
    /// 指定された名前のテンプレートが存在しない場合は `TemplateNotFound`、
    /// 変数未定義などの展開失敗は `TemplateRender` で失敗する。
    pub fn expand(
        &self,
        template_uri: Option<&str>,
        variables: &RenderContext,
    ) -> Result<String, MailError> {
        let Some(uri) = template_uri else {
            return Ok(String::new());
        };

        if !self.engine.get_template_names().any(|name| name == uri) {
            return Err(MailError::template_not_found(uri));
        }

        self.engine
            .render(uri, &to_tera_context(variables))
            .map_err(|e| MailError::template_render(error_chain(&e)))
    }
}
