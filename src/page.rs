// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 页面
//!
//! 把路由结果渲染为响应：文件页面、目录页面与搜索页面。

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;

use crate::{
    cache::ContentCache,
    exception::Exception,
    param::{HttpEncoding, WIKI_PREFIX},
    path::{detect_text, is_strict_child_of, list_dir, make_relative_url, relative_to, walk_files},
    response::Response,
    util::{escape_html, format_file_size, HtmlBuilder},
};

/// 搜索词与被搜索文本的最短长度
pub const MIN_SEARCH_LENGTH: usize = 3;

/// 渲染响应时需要的请求信息
#[derive(Debug, Clone, Copy)]
pub struct RenderContext<'a> {
    pub accept_encoding: &'a [HttpEncoding],
    pub id: u128,
    pub headonly: bool,
}

impl RenderContext<'_> {
    fn html(&self, html: &str) -> Response {
        Response::from_html(html, self.accept_encoding, self.id, self.headonly)
    }
}

pub trait Page {
    fn render(&self, ctx: &RenderContext) -> Result<Response, Exception>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub url: String,
    pub label: String,
}

impl Link {
    fn to_html(&self) -> String {
        format!(
            r#"<li><a href="{}">{}</a></li>"#,
            escape_html(&self.url),
            escape_html(&self.label)
        )
    }
}

fn link_list(links: &[Link]) -> String {
    let items: String = links.iter().map(Link::to_html).collect();
    format!("<ul>{}</ul>", items)
}

fn page_title(site: &str, path: &Path, root: &Path) -> String {
    match relative_to(path, root) {
        Ok(rel) if !rel.as_os_str().is_empty() => {
            format!("{} - {}", site, rel.with_extension("").display())
        }
        _ => site.to_string(),
    }
}

/// 单个文件：有标记时渲染为页面，否则原样返回文件。
pub struct FilePage<'a> {
    pub path: &'a Path,
    pub root: &'a Path,
    pub cache: &'a ContentCache,
    pub site_title: &'a str,
}

impl Page for FilePage<'_> {
    fn render(&self, ctx: &RenderContext) -> Result<Response, Exception> {
        match self.cache.get(self.path)? {
            Some(markup) => {
                let title = page_title(self.site_title, self.path, self.root);
                Ok(ctx.html(&HtmlBuilder::new(&title, markup).build()))
            }
            None => {
                debug!("[ID{}]{}没有可显示的标记，返回原始文件", ctx.id, self.path.display());
                Response::from_file(self.path, ctx.accept_encoding, ctx.id, ctx.headonly)
            }
        }
    }
}

/// 目录：列出子目录与页面，页面链接去掉扩展名。
pub struct SectionPage<'a> {
    pub path: &'a Path,
    pub root: &'a Path,
    pub site_title: &'a str,
}

impl SectionPage<'_> {
    /// 返回 (子目录, 页面)
    pub fn entries(&self) -> Result<(Vec<Link>, Vec<Link>), Exception> {
        let mut sections = Vec::new();
        let mut pages = Vec::new();
        for entry in list_dir(self.path) {
            let rel = relative_to(&entry, self.root)?;
            let name = entry
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            if entry.is_dir() {
                sections.push(Link {
                    url: format!("{}/", make_relative_url(WIKI_PREFIX, &rel, false)),
                    label: format!("{}/", name),
                });
            } else if entry.is_file() {
                let size = fs::metadata(&entry).map(|m| m.len()).unwrap_or(0);
                pages.push(Link {
                    url: make_relative_url(WIKI_PREFIX, &rel, true),
                    label: format!("{} ({})", name, format_file_size(size)),
                });
            }
        }
        Ok((sections, pages))
    }
}

impl Page for SectionPage<'_> {
    fn render(&self, ctx: &RenderContext) -> Result<Response, Exception> {
        let (sections, pages) = self.entries()?;
        let title = page_title(self.site_title, self.path, self.root);
        let mut body = format!("<h1>{}</h1>", escape_html(&title));
        if is_strict_child_of(self.path, self.root) {
            let parent = self.path.parent().unwrap_or(self.root);
            let rel = relative_to(parent, self.root)?;
            let url = make_relative_url(WIKI_PREFIX, &rel, false);
            body.push_str(&format!(r#"<p><a href="{}">..</a></p>"#, escape_html(&url)));
        }
        if !sections.is_empty() {
            body.push_str("<h2>目录</h2>");
            body.push_str(&link_list(&sections));
        }
        if !pages.is_empty() {
            body.push_str("<h2>页面</h2>");
            body.push_str(&link_list(&pages));
        }
        Ok(ctx.html(&HtmlBuilder::new(&title, body).build()))
    }
}

/// 搜索：在路径、文本内容与已缓存的标记中做大小写无关的子串匹配。不触发转换。
pub struct SearchPage<'a> {
    pub query: &'a str,
    pub root: &'a Path,
    pub cache: &'a ContentCache,
    pub site_title: &'a str,
}

impl SearchPage<'_> {
    pub fn results(&self) -> Result<Vec<Link>, Exception> {
        let query = self.query.trim().to_lowercase();
        if query.chars().count() < MIN_SEARCH_LENGTH {
            return Ok(Vec::new());
        }
        let matches_query =
            |text: &str| text.chars().count() >= MIN_SEARCH_LENGTH && text.to_lowercase().contains(&query);

        let markup: Vec<(String, String)> = self.cache.markup_entries();
        let mut found: Vec<PathBuf> = Vec::new();
        for file in walk_files(self.root) {
            let rel = relative_to(&file, self.root)?;
            let key = rel.to_string_lossy().replace('\\', "/");
            let hit = matches_query(&key)
                || detect_text(&file, true).map_or(false, |content| matches_query(&content.text))
                || markup
                    .binary_search_by(|(k, _)| k.as_str().cmp(key.as_str()))
                    .map_or(false, |i| matches_query(&markup[i].1));
            if hit {
                found.push(rel);
            }
        }
        Ok(found
            .into_iter()
            .map(|rel| Link {
                url: make_relative_url(WIKI_PREFIX, &rel, true),
                label: rel.with_extension("").to_string_lossy().into_owned(),
            })
            .collect())
    }
}

impl Page for SearchPage<'_> {
    fn render(&self, ctx: &RenderContext) -> Result<Response, Exception> {
        let title = format!("{} - 搜索：{}", self.site_title, self.query);
        let mut body = format!("<h1>搜索：{}</h1>", escape_html(self.query));
        if self.query.trim().chars().count() < MIN_SEARCH_LENGTH {
            body.push_str(&format!("<p>搜索词至少需要{}个字符。</p>", MIN_SEARCH_LENGTH));
        } else {
            let results = self.results()?;
            debug!("[ID{}]搜索'{}'找到{}个结果", ctx.id, self.query, results.len());
            if results.is_empty() {
                body.push_str("<p>没有找到匹配的页面。</p>");
            } else {
                body.push_str(&link_list(&results));
            }
        }
        Ok(ctx.html(&HtmlBuilder::new(&title, body).build()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::IncompatiblePolicy;
    use crate::registry::{ConvertError, ConverterRegistry};
    use std::sync::Arc;
    use tempfile::TempDir;

    fn setup() -> (TempDir, PathBuf, ContentCache) {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("wiki");
        fs::create_dir_all(root.join("guide")).unwrap();
        fs::write(root.join("index.md"), "Welcome home").unwrap();
        fs::write(root.join("guide/install.md"), "Run the Installer").unwrap();
        fs::write(root.join("logo.png"), [0x89u8, b'P', b'N', b'G', 0, 0]).unwrap();
        let mut registry = ConverterRegistry::new();
        registry.register(
            &[".md"],
            |path: &Path| -> Result<Option<String>, ConvertError> {
                Ok(Some(format!("<p>{}</p>", fs::read_to_string(path)?)))
            },
        );
        let cache = ContentCache::open(
            &dir.path().join("cache.json"),
            &root,
            Arc::new(registry),
            IncompatiblePolicy::Fail,
        )
        .unwrap();
        let root = cache.root().to_path_buf();
        (dir, root, cache)
    }

    fn ctx() -> RenderContext<'static> {
        RenderContext {
            accept_encoding: &[],
            id: 0,
            headonly: false,
        }
    }

    fn body(response: &Response) -> String {
        String::from_utf8_lossy(response.content().unwrap()).into_owned()
    }

    #[test]
    fn test_file_page_renders_markup() {
        let (_dir, root, cache) = setup();
        let path = root.join("index.md");
        let page = FilePage {
            path: &path,
            root: &root,
            cache: &cache,
            site_title: "Wiki",
        };
        let response = page.render(&ctx()).unwrap();
        assert_eq!(response.content_type(), Some("text/html;charset=utf-8"));
        let html = body(&response);
        assert!(html.contains("<p>Welcome home</p>"));
        assert!(html.contains("<title>Wiki - index</title>"));
    }

    #[test]
    fn test_file_page_binary_served_raw() {
        let (_dir, root, cache) = setup();
        let path = root.join("logo.png");
        let page = FilePage {
            path: &path,
            root: &root,
            cache: &cache,
            site_title: "Wiki",
        };
        let response = page.render(&ctx()).unwrap();
        assert_eq!(response.content_type(), Some("image/png"));
    }

    #[test]
    fn test_section_entries() {
        let (_dir, root, _cache) = setup();
        let page = SectionPage {
            path: &root,
            root: &root,
            site_title: "Wiki",
        };
        let (sections, pages) = page.entries().unwrap();
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].url, "/wiki/guide/");
        let urls: Vec<&str> = pages.iter().map(|l| l.url.as_str()).collect();
        assert_eq!(urls, vec!["/wiki/index", "/wiki/logo"]);
    }

    #[test]
    fn test_section_has_parent_link() {
        let (_dir, root, _cache) = setup();
        let guide = root.join("guide");
        let page = SectionPage {
            path: &guide,
            root: &root,
            site_title: "Wiki",
        };
        let html = body(&page.render(&ctx()).unwrap());
        assert!(html.contains(r#"<a href="/wiki/">..</a>"#));
        assert!(html.contains("/wiki/guide/install"));
    }

    #[test]
    fn test_search_matches_path_and_content() {
        let (_dir, root, cache) = setup();
        let search = |query: &str| {
            SearchPage {
                query,
                root: &root,
                cache: &cache,
                site_title: "Wiki",
            }
            .results()
            .unwrap()
            .into_iter()
            .map(|l| l.url)
            .collect::<Vec<_>>()
        };
        assert_eq!(search("INSTALL"), vec!["/wiki/guide/install"]);
        assert_eq!(search("welcome"), vec!["/wiki/index"]);
        assert!(search("nothing here").is_empty());
    }

    #[test]
    fn test_search_uses_cached_markup() {
        let (_dir, root, cache) = setup();
        cache.get(&root.join("index.md")).unwrap();
        let results = SearchPage {
            query: "<p>welcome",
            root: &root,
            cache: &cache,
            site_title: "Wiki",
        }
        .results()
        .unwrap();
        assert_eq!(results.len(), 1);
    }

    #[test]
    fn test_search_short_query() {
        let (_dir, root, cache) = setup();
        let page = SearchPage {
            query: "in",
            root: &root,
            cache: &cache,
            site_title: "Wiki",
        };
        assert!(page.results().unwrap().is_empty());
        let html = body(&page.render(&ctx()).unwrap());
        assert!(html.contains("至少需要3个字符"));
    }
}
