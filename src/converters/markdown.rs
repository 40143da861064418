// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use pulldown_cmark::{html, Options, Parser};
use regex::{Captures, Regex};

use crate::{
    param::WIKI_PREFIX,
    path::{make_relative_url, read_text, relative_to, walk_files},
    registry::{ConvertError, Converter},
};

lazy_static! {
    /// `[[Label]]` 或 `[[Label#anchor]]`
    static ref WIKI_LINK: Regex = Regex::new(r"\[\[([^\[\]#|]+)(#[^\[\]]*)?\]\]").unwrap();
    static ref SLASH_SPACING: Regex = Regex::new(r"\s*/\s*").unwrap();
    static ref ANCHOR_SPACING: Regex = Regex::new(r"^\s*#\s*").unwrap();
}

pub struct MarkdownConverter {
    wiki_root: PathBuf,
}

impl MarkdownConverter {
    pub fn new(wiki_root: &Path) -> Self {
        Self {
            wiki_root: wiki_root.to_path_buf(),
        }
    }
}

impl Converter for MarkdownConverter {
    fn convert(&self, path: &Path) -> Result<Option<String>, ConvertError> {
        let Some(text) = read_text(path) else {
            return Ok(None);
        };
        let text = rewrite_wiki_links(&text, &self.wiki_root);

        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

        let mut markup = String::with_capacity(text.len() * 3 / 2);
        html::push_html(&mut markup, Parser::new_ext(&text, options));
        Ok(Some(markup))
    }
}

/// 把 wiki 链接改写为普通的 Markdown 链接。
///
/// 标签按排序后的文件列表匹配第一个相对路径以该标签开头的文件；找不到时链接到 `/wiki/<标签>`，
/// 由路由器在访问时再做一次解析。
pub fn rewrite_wiki_links(text: &str, wiki_root: &Path) -> String {
    if !WIKI_LINK.is_match(text) {
        return text.to_string();
    }
    let files: Vec<String> = walk_files(wiki_root)
        .iter()
        .filter_map(|file| relative_to(file, wiki_root).ok())
        .map(|rel| rel.to_string_lossy().replace('\\', "/"))
        .collect();

    WIKI_LINK
        .replace_all(text, |caps: &Captures| {
            // `guide / setup # step` 与 `guide/setup#step` 等价
            let normalized = SLASH_SPACING.replace_all(caps[1].trim(), "/");
            let label = normalized.as_ref();
            let anchor = caps
                .get(2)
                .map(|m| ANCHOR_SPACING.replace(m.as_str().trim_end(), "#").into_owned())
                .unwrap_or_default();
            let url = match files.iter().find(|rel| rel.starts_with(label)) {
                Some(rel) => make_relative_url(WIKI_PREFIX, Path::new(rel), true),
                None => format!("/{}/{}", WIKI_PREFIX, label),
            };
            format!("[{}](<{}{}>)", label, url, anchor)
        })
        .into_owned()
}
