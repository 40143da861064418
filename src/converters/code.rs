// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use std::path::Path;

use crate::{
    path::read_text,
    registry::{ConvertError, Converter},
    util::escape_html,
};

/// 按源代码渲染的扩展名
pub const CODE_EXTENSIONS: &[&str] = &[
    ".arm", ".as", ".autoit", ".autohotkey", ".awk", ".mawk", ".nawk", ".gawk", ".bash", ".sh",
    ".zsh", ".basic", ".cs", ".c", ".h", ".cpp", ".hpp", ".cc", ".hh", ".cmake", ".css", ".cisco",
    ".clj", ".cson", ".curl", ".d", ".dart", ".dpr", ".dfm", ".pas", ".pascal", ".diff", ".patch",
    ".jinja", ".django", ".dns", ".zone", ".bind", ".dockerfile", ".docker", ".dos", ".bat",
    ".cmd", ".ebnf", ".elixir", ".elm", ".erl", ".fs", ".fix", ".flix", ".f90", ".f95", ".fortran",
    ".go", ".golang", ".gradle", ".graphql", ".xml", ".xhtml", ".rss", ".xsl", ".xsd", ".sjb",
    ".plist", ".http", ".https", ".hs", ".ini", ".toml", ".json", ".java", ".jsp", ".js", ".jsx",
    ".julia", ".kt", ".kotlin", ".tex", ".lisp", ".lua", ".makefile", ".mk", ".mak", ".make",
    ".mma", ".wl", ".matlab", ".mel", ".nim", ".nimrod", ".nsis", ".nginx", ".nginxconf",
    ".objectivec", ".mm", ".objc", ".php", ".perl", ".pl", ".pm", ".pgsql", ".ps", ".ps1",
    ".prolog", ".properties", ".py", ".pyw", ".gyp", ".profile", ".pycon", ".r", ".ruby", ".rb",
    ".gemspec", ".podspec", ".thor", ".irb", ".rust", ".rs", ".sas", ".scss", ".sql", ".scala",
    ".scheme", ".shell", ".console", ".sol", ".solidity", ".svelte", ".swift", ".tcl", ".tk",
    ".terraform", ".tf", ".hcl", ".tsql", ".ts", ".tsx", ".vbnet", ".vb", ".vba", ".vbs",
    ".vbscript", ".vhdl", ".verilog", ".v", ".vim", ".x86asm", ".yml", ".yaml", ".zs",
];

/// 源代码：`<pre><code class="language-<ext>">`，交给浏览器端的高亮脚本处理。
pub struct CodeConverter;

impl Converter for CodeConverter {
    fn convert(&self, path: &Path) -> Result<Option<String>, ConvertError> {
        let Some(text) = read_text(path) else {
            return Ok(None);
        };
        let language = path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .unwrap_or_default();
        Ok(Some(format!(
            r#"<pre><code class="language-{}">{}</code></pre>"#,
            escape_html(&language),
            escape_html(&text)
        )))
    }
}
