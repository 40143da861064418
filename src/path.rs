// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 路径解析模块
//!
//! 所有来自不可信输入的路径都必须先经过本模块锚定到某个根目录，之后才能对其执行文件系统操作。
//!
//! - 包含关系判断基于规范化后的绝对路径字符串前缀比较（末尾统一补分隔符），
//!   同时拦截 `..` 越界与根目录之外的绝对路径。
//! - 缓存与路由统一使用 [`to_url_key`] 产生的正斜杠相对路径作为键，保证跨平台稳定。
//! - [`detect_text`] 依据扩展名猜测 MIME 类型并嗅探字节编码；无法判断时返回 `None`，而不是报错。

use std::borrow::Cow;
use std::env;
use std::ffi::OsString;
use std::fs;
use std::path::{Component, Path, PathBuf, MAIN_SEPARATOR};

use encoding_rs::Encoding;
use log::debug;

use crate::exception::Exception;

/// 隐藏文件名前缀
pub const HIDDEN_PREFIX: char = '.';

/// 已确认位于 `root` 之内的路径。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnchoredPath {
    path: PathBuf,
    root: PathBuf,
}

impl AnchoredPath {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn into_path(self) -> PathBuf {
        self.path
    }

    pub fn url_key(&self) -> String {
        url_form(self.path.strip_prefix(&self.root).unwrap_or(Path::new("")))
    }
}

/// 可解码的文本文件内容
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedContent {
    pub text: String,
    pub mime_type: String,
    pub source_path: PathBuf,
}

fn absolute(path: &Path) -> PathBuf {
    if path.is_absolute() {
        return path.to_path_buf();
    }
    match env::current_dir() {
        Ok(cwd) => cwd.join(path),
        Err(_) => path.to_path_buf(),
    }
}

/// 词法规范化：转为绝对路径并消去 `.` 与 `..`，不访问文件系统。
pub fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in absolute(path).components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// 规范化路径：先做词法规范化，再对最长的已存在前缀解析符号链接，不存在的尾部原样拼回。
pub fn canonicalize(path: &Path) -> PathBuf {
    let normalized = normalize(path);
    let mut existing = normalized.as_path();
    let mut tail: Vec<OsString> = Vec::new();
    loop {
        if let Ok(real) = fs::canonicalize(existing) {
            return tail.iter().rev().fold(real, |acc, part| acc.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                tail.push(name.to_os_string());
                existing = parent;
            }
            _ => return normalized,
        }
    }
}

fn prefix_form(path: &Path) -> String {
    let mut s = path.to_string_lossy().into_owned();
    if !s.ends_with(MAIN_SEPARATOR) {
        s.push(MAIN_SEPARATOR);
    }
    s
}

fn url_form(relative: &Path) -> String {
    let parts: Vec<Cow<str>> = relative
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy()),
            _ => None,
        })
        .collect();
    if parts.is_empty() {
        ".".to_string()
    } else {
        parts.join("/")
    }
}

/// 将 `relative_or_absolute` 锚定到 `root`。结果越出 `root` 时返回 `PathEscapesRoot`，绝不静默截断。
pub fn resolve(root: &Path, relative_or_absolute: &Path) -> Result<AnchoredPath, Exception> {
    let root = canonicalize(root);
    let resolved = canonicalize(&root.join(relative_or_absolute));
    if !prefix_form(&resolved).starts_with(&prefix_form(&root)) {
        debug!(
            "路径{}解析为{}，位于根目录{}之外",
            relative_or_absolute.display(),
            resolved.display(),
            root.display()
        );
        return Err(Exception::path_escapes_root(relative_or_absolute, &root));
    }
    Ok(AnchoredPath {
        path: resolved,
        root,
    })
}

pub fn is_contained_in(path: &Path, root: &Path) -> bool {
    prefix_form(&canonicalize(path)).starts_with(&prefix_form(&canonicalize(root)))
}

pub fn is_same(a: &Path, b: &Path) -> bool {
    canonicalize(a) == canonicalize(b)
}

/// 位于 `root` 之内且不是 `root` 本身。
pub fn is_strict_child_of(path: &Path, root: &Path) -> bool {
    is_contained_in(path, root) && !is_same(path, root)
}

pub fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .map_or(false, |name| name.to_string_lossy().starts_with(HIDDEN_PREFIX))
}

/// `path` 相对 `root` 的路径；`path` 与 `root` 相同时返回空路径。
pub fn relative_to(path: &Path, root: &Path) -> Result<PathBuf, Exception> {
    let canonical_root = canonicalize(root);
    let canonical_path = canonicalize(path);
    if !prefix_form(&canonical_path).starts_with(&prefix_form(&canonical_root)) {
        return Err(Exception::path_escapes_root(path, root));
    }
    Ok(canonical_path
        .strip_prefix(&canonical_root)
        .map(Path::to_path_buf)
        .unwrap_or_default())
}

/// 缓存与路由使用的唯一键格式：相对 `root` 的正斜杠路径，`root` 本身为 `"."`。
pub fn to_url_key(root: &Path, path: &Path) -> Result<String, Exception> {
    relative_to(path, root).map(|rel| url_form(&rel))
}

/// [`to_url_key`] 的逆操作。
pub fn from_url_key(root: &Path, key: &str) -> PathBuf {
    key.split('/')
        .filter(|part| !part.is_empty() && *part != ".")
        .fold(root.to_path_buf(), |acc, part| acc.join(part))
}

/// 生成站内链接，例如 `make_relative_url("wiki", "a/b.md", true)` 得到 `/wiki/a/b`。
pub fn make_relative_url(prefix: &str, relative: &Path, drop_extension: bool) -> String {
    let relative = if drop_extension {
        relative.with_extension("")
    } else {
        relative.to_path_buf()
    };
    let key = url_form(&relative);
    let prefix = prefix.trim_matches('/');
    match (prefix.is_empty(), key.as_str()) {
        (true, ".") => "/".to_string(),
        (true, _) => format!("/{}", key),
        (false, ".") => format!("/{}/", prefix),
        (false, _) => format!("/{}/{}", prefix, key),
    }
}

/// 根据扩展名猜测 MIME 类型，无法猜测时返回 `None`。
pub fn guess_mime(path: &Path) -> Option<String> {
    let extension = path.extension()?.to_str()?.to_ascii_lowercase();
    match extension.as_str() {
        "md" | "markdown" => Some("text/markdown".to_string()),
        "woff" => Some("font/woff".to_string()),
        "woff2" => Some("font/woff2".to_string()),
        ext => mime_guess::from_ext(ext)
            .first()
            .map(|mime| mime.essence_str().to_string()),
    }
}

/// 嗅探字节流的编码。含有 NUL 字节且没有 BOM 的内容视为二进制。
pub fn guess_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    if let Some((encoding, _)) = Encoding::for_bom(bytes) {
        return Some(encoding);
    }
    if bytes.contains(&0) {
        return None;
    }
    if std::str::from_utf8(bytes).is_ok() {
        return Some(encoding_rs::UTF_8);
    }
    let mut detector = chardetng::EncodingDetector::new();
    detector.feed(bytes, true);
    Some(detector.guess(None, true))
}

/// 用猜测出的编码严格解码，出现任何非法序列都返回 `None`。
fn decode(bytes: &[u8], encoding: &'static Encoding) -> Option<String> {
    let bom_length = match Encoding::for_bom(bytes) {
        Some((_, length)) => length,
        None => 0,
    };
    encoding
        .decode_without_bom_handling_and_without_replacement(&bytes[bom_length..])
        .map(Cow::into_owned)
}

/// 不看扩展名，直接嗅探编码并解码文件内容。
pub fn read_text(path: &Path) -> Option<String> {
    let bytes = fs::read(path).ok()?;
    let encoding = guess_encoding(&bytes)?;
    decode(&bytes, encoding)
}

/// 尝试将文件作为文本读取。
///
/// `strict` 为真时只处理 `text/*` 类型的文件。没有 MIME 猜测、二进制内容或无法解码时返回 `None`。
pub fn detect_text(path: &Path, strict: bool) -> Option<DecodedContent> {
    let mime_type = guess_mime(path)?;
    if strict && !mime_type.starts_with("text") {
        return None;
    }
    let text = read_text(path)?;
    Some(DecodedContent {
        text,
        mime_type,
        source_path: path.to_path_buf(),
    })
}

/// 目录下的条目，按路径排序，跳过隐藏条目。目录不可读时返回空列表。
pub fn list_dir(dir: &Path) -> Vec<PathBuf> {
    let mut entries: Vec<PathBuf> = match fs::read_dir(dir) {
        Ok(read_dir) => read_dir
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|p| !is_hidden(p))
            .collect(),
        Err(_) => Vec::new(),
    };
    entries.sort();
    entries
}

/// 递归列出 `root` 下的所有文件。隐藏文件与隐藏目录（及其全部内容）被跳过，符号链接目录不展开。
pub fn walk_files(root: &Path) -> Vec<PathBuf> {
    let mut files = Vec::new();
    for entry in list_dir(root) {
        let is_link = fs::symlink_metadata(&entry)
            .map(|m| m.file_type().is_symlink())
            .unwrap_or(false);
        if entry.is_dir() {
            if !is_link {
                files.extend(walk_files(&entry));
            }
        } else if entry.is_file() {
            files.push(entry);
        }
    }
    files.sort();
    files
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    fn wiki() -> TempDir {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("section/sub")).unwrap();
        fs::write(dir.path().join("article.md"), "# Title\n").unwrap();
        fs::write(dir.path().join("section/page.txt"), "hello").unwrap();
        dir
    }

    #[test]
    fn test_resolve_inside_root() {
        let dir = wiki();
        let anchored = resolve(dir.path(), Path::new("section/page.txt")).unwrap();
        assert!(anchored.path().is_file());
        assert_eq!(anchored.url_key(), "section/page.txt");
        assert!(is_contained_in(anchored.path(), dir.path()));
    }

    #[test]
    fn test_resolve_nonexistent_inside_root() {
        let dir = wiki();
        let anchored = resolve(dir.path(), Path::new("section/missing")).unwrap();
        assert!(!anchored.path().exists());
        assert_eq!(anchored.url_key(), "section/missing");
    }

    #[test]
    fn test_resolve_dotdot_escape() {
        let dir = wiki();
        let result = resolve(dir.path(), Path::new("../../etc/passwd"));
        assert!(matches!(result, Err(Exception::PathEscapesRoot { .. })));
    }

    #[test]
    fn test_resolve_dotdot_that_stays_inside() {
        let dir = wiki();
        let anchored = resolve(dir.path(), Path::new("section/../article.md")).unwrap();
        assert_eq!(anchored.url_key(), "article.md");
    }

    #[test]
    fn test_resolve_absolute_outside() {
        let dir = wiki();
        let result = resolve(dir.path(), Path::new("/etc/passwd"));
        assert!(matches!(result, Err(Exception::PathEscapesRoot { .. })));
    }

    #[test]
    fn test_sibling_with_common_prefix_is_not_contained() {
        let parent = tempfile::tempdir().unwrap();
        let root = parent.path().join("wiki");
        let sibling = parent.path().join("wiki2");
        fs::create_dir_all(&root).unwrap();
        fs::create_dir_all(&sibling).unwrap();
        assert!(!is_contained_in(&sibling, &root));
        assert!(resolve(&root, Path::new("../wiki2/x")).is_err());
    }

    #[test]
    fn test_strict_child() {
        let dir = wiki();
        assert!(is_strict_child_of(&dir.path().join("section"), dir.path()));
        assert!(!is_strict_child_of(dir.path(), dir.path()));
        assert!(is_contained_in(dir.path(), dir.path()));
    }

    #[test]
    fn test_url_key_of_root() {
        let dir = wiki();
        assert_eq!(to_url_key(dir.path(), dir.path()).unwrap(), ".");
        assert_eq!(from_url_key(dir.path(), "."), dir.path().to_path_buf());
    }

    #[test]
    fn test_make_relative_url() {
        assert_eq!(
            make_relative_url("wiki", Path::new("a/b.md"), true),
            "/wiki/a/b"
        );
        assert_eq!(make_relative_url("wiki", Path::new("a/b.md"), false), "/wiki/a/b.md");
        assert_eq!(make_relative_url("wiki", Path::new(""), false), "/wiki/");
    }

    #[test]
    fn test_detect_text_markdown() {
        let dir = wiki();
        let content = detect_text(&dir.path().join("article.md"), true).unwrap();
        assert_eq!(content.text, "# Title\n");
        assert_eq!(content.mime_type, "text/markdown");
    }

    #[test]
    fn test_detect_text_strict_rejects_non_text_mime() {
        let dir = wiki();
        let path = dir.path().join("data.json");
        fs::write(&path, "{\"a\": 1}").unwrap();
        assert!(detect_text(&path, true).is_none());
        assert!(detect_text(&path, false).is_some());
    }

    #[test]
    fn test_detect_text_binary() {
        let dir = wiki();
        let path = dir.path().join("blob.bin");
        fs::write(&path, [0u8, 159, 146, 150, 0, 255]).unwrap();
        assert!(detect_text(&path, false).is_none());
    }

    #[test]
    fn test_detect_text_without_extension() {
        let dir = wiki();
        let path = dir.path().join("README");
        fs::write(&path, "plain").unwrap();
        assert!(detect_text(&path, false).is_none());
    }

    #[test]
    fn test_detect_text_legacy_encoding() {
        let dir = wiki();
        let path = dir.path().join("legacy.txt");
        // "café crème brûlée" in windows-1252
        fs::write(
            &path,
            b"caf\xe9 cr\xe8me br\xfbl\xe9e, caf\xe9 cr\xe8me br\xfbl\xe9e",
        )
        .unwrap();
        let content = detect_text(&path, true).unwrap();
        assert!(content.text.starts_with("caf"));
        assert!(!content.text.contains('\u{FFFD}'));
    }

    #[test]
    fn test_walk_files_skips_hidden() {
        let dir = wiki();
        fs::create_dir_all(dir.path().join(".git/objects")).unwrap();
        fs::write(dir.path().join(".git/objects/x.txt"), "x").unwrap();
        fs::write(dir.path().join("section/.hidden.md"), "x").unwrap();
        let files = walk_files(dir.path());
        let keys: Vec<String> = files
            .iter()
            .map(|f| to_url_key(dir.path(), f).unwrap())
            .collect();
        assert_eq!(keys, vec!["article.md", "section/page.txt"]);
    }

    #[test]
    fn test_list_dir_sorted() {
        let dir = wiki();
        let entries = list_dir(dir.path());
        let names: Vec<String> = entries
            .iter()
            .map(|e| e.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["article.md", "section"]);
    }

    proptest! {
        #[test]
        fn prop_containment(segments in proptest::collection::vec(
            prop_oneof![Just("..".to_string()), "[a-z]{1,8}"], 0..8)
        ) {
            let dir = tempfile::tempdir().unwrap();
            let relative: PathBuf = segments.iter().collect();
            let mut depth = 0i32;
            let mut escaped = false;
            for segment in &segments {
                if segment == ".." {
                    depth -= 1;
                    if depth < 0 {
                        escaped = true;
                    }
                } else {
                    depth += 1;
                }
            }
            match resolve(dir.path(), &relative) {
                Ok(anchored) => {
                    prop_assert!(!escaped);
                    let rejoined = from_url_key(anchored.root(), &anchored.url_key());
                    prop_assert_eq!(canonicalize(&rejoined), anchored.path().to_path_buf());
                }
                Err(e) => {
                    prop_assert!(escaped);
                    let is_escape = matches!(e, Exception::PathEscapesRoot { .. });
                    prop_assert!(is_escape);
                }
            }
        }
    }
}
