// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路由模块
//!
//! 将已解码的请求路径映射为 [`WikiRequest`]。依次按前缀匹配：
//!
//! 1. `resources/`：静态资源，文件存在时返回 `Resource`，否则没有结果（上游返回 404）。
//! 2. `search/`：余下部分作为搜索词。
//! 3. `wiki/`：在 wiki 根目录中解析，见 [`Router::route_wiki`]。
//! 4. 其他路径重定向到 `/wiki/` 下的同名路径。

use std::path::{Path, PathBuf};

use glob::Pattern;
use log::debug;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};

use crate::{
    exception::Exception,
    param::{RESOURCES_PREFIX, SEARCH_PREFIX, WIKI_PREFIX},
    path::{self, is_contained_in, is_hidden, is_strict_child_of, list_dir},
};

/// `Location` 头中需要转义的字符
const LOCATION: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'%');

/// 路由结果。除 `Redirect` 外的每个变体都携带解析时使用的根目录，作为后续操作的包含边界。
#[derive(Debug, Clone, PartialEq)]
pub enum WikiRequest {
    Redirect { target_url: String },
    Resource { path: PathBuf, root: PathBuf },
    Search { query: String, root: PathBuf },
    Page { path: PathBuf, root: PathBuf },
    Section { path: PathBuf, root: PathBuf },
}

impl WikiRequest {
    pub fn redirect(target_url: String) -> Self {
        WikiRequest::Redirect { target_url }
    }

    pub fn resource(path: PathBuf, root: PathBuf) -> Self {
        assert!(path.is_file(), "资源请求必须指向文件：{}", path.display());
        WikiRequest::Resource { path, root }
    }

    pub fn search(query: String, root: PathBuf) -> Self {
        WikiRequest::Search { query, root }
    }

    pub fn page(path: PathBuf, root: PathBuf) -> Self {
        assert!(path.is_file(), "页面请求必须指向文件：{}", path.display());
        WikiRequest::Page { path, root }
    }

    pub fn section(path: PathBuf, root: PathBuf) -> Self {
        assert!(path.is_dir(), "目录请求必须指向目录：{}", path.display());
        WikiRequest::Section { path, root }
    }

    /// 请求的种类名，用于日志
    pub fn kind(&self) -> &'static str {
        match self {
            WikiRequest::Redirect { .. } => "redirect",
            WikiRequest::Resource { .. } => "resource",
            WikiRequest::Search { .. } => "search",
            WikiRequest::Page { .. } => "page",
            WikiRequest::Section { .. } => "section",
        }
    }
}

/// 无状态的路由器，只保存两个根目录。
#[derive(Debug, Clone)]
pub struct Router {
    wiki_root: PathBuf,
    resources_root: PathBuf,
}

impl Router {
    pub fn new(wiki_root: &Path, resources_root: &Path) -> Self {
        Self {
            wiki_root: path::canonicalize(wiki_root),
            resources_root: path::canonicalize(resources_root),
        }
    }

    pub fn wiki_root(&self) -> &Path {
        &self.wiki_root
    }

    pub fn resources_root(&self) -> &Path {
        &self.resources_root
    }

    /// 路由一个已解码的路径。`Ok(None)` 表示没有对应的资源。
    ///
    /// 路径越出根目录时返回 `PathEscapesRoot`，由请求边界转为 400。
    pub fn route(&self, url_path: &str) -> Result<Option<WikiRequest>, Exception> {
        let trimmed = url_path
            .strip_prefix("./")
            .or_else(|| url_path.strip_prefix('/'))
            .unwrap_or(url_path);
        let (first, rest) = match trimmed.split_once('/') {
            Some((first, rest)) => (first, rest),
            None => (trimmed, ""),
        };
        debug!("路由路径：'{}'，前缀：'{}'", url_path, first);

        match first {
            RESOURCES_PREFIX => {
                let resolved = path::resolve(&self.resources_root, Path::new(rest))?;
                if resolved.path().is_file() {
                    Ok(Some(WikiRequest::resource(
                        resolved.into_path(),
                        self.resources_root.clone(),
                    )))
                } else {
                    Ok(None)
                }
            }
            SEARCH_PREFIX => Ok(Some(WikiRequest::search(
                rest.trim_end_matches('/').to_string(),
                self.wiki_root.clone(),
            ))),
            WIKI_PREFIX => self.route_wiki(rest),
            _ => {
                let target = format!("/{}/{}", WIKI_PREFIX, trimmed);
                Ok(Some(WikiRequest::redirect(
                    utf8_percent_encode(&target, LOCATION).to_string(),
                )))
            }
        }
    }

    /// 在 wiki 根目录中解析路径。
    ///
    /// - 以 `.` 开头的名字被当作搜索词，例如 `/wiki/.rust` 搜索 `.rust`。
    /// - 目录返回 `Section`，文件返回 `Page`。
    /// - 路径不存在时，在父目录中查找 `<名字>.*` 的文件，取路径字典序最小者；
    ///   没有候选时退化为以该名字搜索。
    pub fn route_wiki(&self, relative: &str) -> Result<Option<WikiRequest>, Exception> {
        let resolved = path::resolve(&self.wiki_root, Path::new(relative))?;
        let target = resolved.path();

        if is_strict_child_of(target, &self.wiki_root) && is_hidden(target) {
            let query = file_name(target);
            debug!("隐藏名称{}被作为搜索词", query);
            return Ok(Some(WikiRequest::search(query, self.wiki_root.clone())));
        }
        if target.is_dir() {
            return Ok(Some(WikiRequest::section(
                target.to_path_buf(),
                self.wiki_root.clone(),
            )));
        }
        if target.is_file() {
            return Ok(Some(WikiRequest::page(
                target.to_path_buf(),
                self.wiki_root.clone(),
            )));
        }
        if target.exists() {
            debug!("{}既不是文件也不是目录", target.display());
            return Ok(None);
        }

        let name = file_name(target);
        match self.find_candidate(target, &name)? {
            Some(candidate) => {
                debug!("{}解析为{}", target.display(), candidate.display());
                Ok(Some(WikiRequest::page(candidate, self.wiki_root.clone())))
            }
            None => Ok(Some(WikiRequest::search(name, self.wiki_root.clone()))),
        }
    }

    fn find_candidate(&self, target: &Path, name: &str) -> Result<Option<PathBuf>, Exception> {
        let Some(parent) = target.parent() else {
            return Ok(None);
        };
        let pattern = Pattern::new(&format!("{}.*", Pattern::escape(name)))
            .map_err(|_| Exception::InvalidPath)?;
        Ok(list_dir(parent)
            .into_iter()
            .filter(|candidate| candidate.is_file())
            .filter(|candidate| pattern.matches(&file_name(candidate)))
            .filter(|candidate| is_contained_in(candidate, &self.wiki_root))
            .min_by(|a, b| a.to_string_lossy().cmp(&b.to_string_lossy())))
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}
