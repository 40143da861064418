// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 内置转换器
//!
//! 静态编译的转换器清单，启动时由 [`builtin_registry`] 一次性注册。

mod code;
mod html;
mod markdown;
mod pandoc;

pub use code::{CodeConverter, CODE_EXTENSIONS};
pub use html::HtmlConverter;
pub use markdown::{rewrite_wiki_links, MarkdownConverter};
pub use pandoc::{PandocConverter, PANDOC_EXTENSIONS};

use std::time::Duration;

use log::info;

use crate::{config::Config, path, registry::ConverterRegistry};

/// 按固定顺序注册全部内置转换器。没有默认的后处理器。
pub fn builtin_registry(config: &Config) -> ConverterRegistry {
    let wiki_root = path::canonicalize(config.wiki_root());
    let resources_root = path::canonicalize(config.resources_root());

    let mut registry = ConverterRegistry::new();
    registry
        .register(&[".md"], MarkdownConverter::new(&wiki_root))
        .register(&[".html", ".htm"], HtmlConverter)
        .register(CODE_EXTENSIONS, CodeConverter)
        .register(
            PANDOC_EXTENSIONS,
            PandocConverter::new(
                &wiki_root,
                &resources_root,
                Duration::from_secs(config.converter_timeout_secs()),
            ),
        );
    info!(
        "已注册{}种扩展名的转换器",
        1 + 2 + CODE_EXTENSIONS.len() + PANDOC_EXTENSIONS.len()
    );
    registry
}
