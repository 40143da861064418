// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 内容缓存
//!
//! 以根目录相对的 URL 形式路径为键，缓存转换后的 HTML 标记，并持久化为单个带版本号的 JSON 快照。
//!
//! ## 新鲜度
//! 每个条目同时保存文件内容的 MD5 与 SHA-1 摘要，两者都与当前文件字节一致时条目才有效。
//! 摘要总是针对实时文件内容重新计算，从不依赖修改时间。
//!
//! ## 并发
//! 读取（摘要校验与查表）可以并发进行；写入在全局写锁下先持久化快照、再更新内存映射，
//! 因此读者永远不会看到尚未落盘的映射更新。同一个键的并发未命中可能重复转换，但转换是幂等的。

use std::{
    collections::{BTreeMap, HashMap},
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard},
};

use log::{debug, error, info, warn};
use md5::Md5;
use serde_derive::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::{
    exception::Exception,
    param::CACHE_VERSION,
    path::{self, from_url_key, is_contained_in, walk_files},
    registry::ConverterRegistry,
};

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    digest_primary: String,
    digest_secondary: String,
    markup: Option<String>,
}

impl CacheEntry {
    fn from_bytes(data: &[u8], markup: Option<String>) -> Self {
        let (digest_primary, digest_secondary) = digests(data);
        Self {
            digest_primary,
            digest_secondary,
            markup,
        }
    }

    /// 两个摘要都与当前内容一致
    pub fn is_fresh(&self, data: &[u8]) -> bool {
        let (primary, secondary) = digests(data);
        self.digest_primary == primary && self.digest_secondary == secondary
    }

    pub fn markup(&self) -> Option<&str> {
        self.markup.as_deref()
    }
}

fn digests(data: &[u8]) -> (String, String) {
    (
        hex::encode(Md5::digest(data)),
        hex::encode(Sha1::digest(data)),
    )
}

/// 落盘格式：`{"version": 1, "entries": {"<key>": {...}}}`
#[derive(Serialize, Deserialize)]
struct Snapshot {
    version: u32,
    entries: BTreeMap<String, CacheEntry>,
}

/// 持久化快照版本不兼容时的处理策略
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum IncompatiblePolicy {
    /// 启动失败
    Fail,
    /// 丢弃旧快照，从空缓存重建
    Discard,
}

pub struct ContentCache {
    file: PathBuf,
    root: PathBuf,
    registry: Arc<ConverterRegistry>,
    entries: RwLock<HashMap<String, CacheEntry>>,
    write_lock: Mutex<()>,
}

impl ContentCache {
    /// 打开缓存：载入快照，然后清理已不存在的文件对应的条目。
    pub fn open(
        file: &Path,
        root: &Path,
        registry: Arc<ConverterRegistry>,
        policy: IncompatiblePolicy,
    ) -> Result<Self, Exception> {
        let cache = Self {
            file: file.to_path_buf(),
            root: path::canonicalize(root),
            registry,
            entries: RwLock::new(HashMap::new()),
            write_lock: Mutex::new(()),
        };
        cache.load(policy)?;
        cache.purge()?;
        Ok(cache)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.read_entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn entry(&self, key: &str) -> Option<CacheEntry> {
        self.read_entries().get(key).cloned()
    }

    /// 返回所有带有标记的条目快照，供搜索使用。
    pub fn markup_entries(&self) -> Vec<(String, String)> {
        let mut entries: Vec<(String, String)> = self
            .read_entries()
            .iter()
            .filter_map(|(key, entry)| entry.markup.clone().map(|m| (key.clone(), m)))
            .collect();
        entries.sort();
        entries
    }

    /// 取得文件的 HTML 标记。条目缺失或摘要不一致时重新转换并持久化。
    pub fn get(&self, file: &Path) -> Result<Option<String>, Exception> {
        self.get_with(file, true)
    }

    fn get_with(&self, file: &Path, persist: bool) -> Result<Option<String>, Exception> {
        if !is_contained_in(file, &self.root) {
            return Err(Exception::OutsideRoot {
                path: file.to_path_buf(),
                root: self.root.clone(),
            });
        }
        let key = path::to_url_key(&self.root, file)?;
        let data = fs::read(file)?;

        if let Some(entry) = self.read_entries().get(&key) {
            if entry.is_fresh(&data) {
                debug!("缓存命中：{}", key);
                return Ok(entry.markup.clone());
            }
            debug!("文件{}已修改，重新转换", key);
        }

        let markup = self.registry.convert(file)?;
        let entry = CacheEntry::from_bytes(&data, markup.clone());
        self.store(key, entry, persist)?;
        Ok(markup)
    }

    /// 写入条目。`persist` 为真时先落盘再更新内存映射，两步都在写锁内完成。
    fn store(&self, key: String, entry: CacheEntry, persist: bool) -> Result<(), Exception> {
        let _guard = self.lock_writes();
        if persist {
            let mut snapshot: BTreeMap<String, CacheEntry> = self
                .read_entries()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();
            snapshot.insert(key.clone(), entry.clone());
            self.write_snapshot(snapshot)?;
        }
        self.write_entries().insert(key, entry);
        Ok(())
    }

    /// 预热：转换根目录下所有非隐藏文件，结束后统一持久化一次。返回新增条目数。
    pub fn preload(&self) -> Result<usize, Exception> {
        info!("开始预加载缓存...");
        let before = self.len();
        for file in walk_files(&self.root) {
            if let Err(e) = self.get_with(&file, false) {
                warn!("预加载{}失败：{}", file.display(), e);
            }
        }
        let preloaded = self.len().saturating_sub(before);
        if preloaded > 0 {
            info!("预加载了{}个页面", preloaded);
        }
        self.save()?;
        Ok(preloaded)
    }

    /// 删除键已不对应根目录下现有文件的条目，有删除时持久化。返回删除的条目数。
    pub fn purge(&self) -> Result<usize, Exception> {
        let _guard = self.lock_writes();
        let removed = {
            let mut entries = self.write_entries();
            let before = entries.len();
            entries.retain(|key, _| from_url_key(&self.root, key).is_file());
            before - entries.len()
        };
        if removed > 0 {
            info!("清理了{}个失效的缓存条目", removed);
            self.write_snapshot(self.sorted_entries())?;
        }
        Ok(removed)
    }

    /// 持久化当前全部条目。
    pub fn save(&self) -> Result<(), Exception> {
        let _guard = self.lock_writes();
        self.write_snapshot(self.sorted_entries())
    }

    fn load(&self, policy: IncompatiblePolicy) -> Result<(), Exception> {
        if !self.file.exists() {
            debug!("缓存文件{}不存在，从空缓存开始", self.file.display());
            return Ok(());
        }
        let raw = fs::read_to_string(&self.file)?;
        let snapshot = match self.parse_snapshot(&raw) {
            Ok(snapshot) => snapshot,
            Err(e) if policy == IncompatiblePolicy::Discard => {
                warn!("{}，丢弃旧缓存", e);
                return Ok(());
            }
            Err(e) => {
                error!("无法载入缓存文件{}：{}", self.file.display(), e);
                return Err(e);
            }
        };
        let count = snapshot.entries.len();
        *self.write_entries() = snapshot.entries.into_iter().collect();
        info!("从{}载入了{}个缓存条目", self.file.display(), count);
        Ok(())
    }

    fn parse_snapshot(&self, raw: &str) -> Result<Snapshot, Exception> {
        let value: serde_json::Value =
            serde_json::from_str(raw).map_err(|e| Exception::CacheCorrupted(e.to_string()))?;
        let version = value
            .get("version")
            .and_then(serde_json::Value::as_u64)
            .ok_or_else(|| Exception::CacheCorrupted("missing version field".to_string()))?;
        if version != u64::from(CACHE_VERSION) {
            return Err(Exception::CacheVersionMismatch {
                found: u32::try_from(version).unwrap_or(u32::MAX),
                expected: CACHE_VERSION,
            });
        }
        serde_json::from_value(value).map_err(|e| Exception::CacheCorrupted(e.to_string()))
    }

    /// 先写临时文件再原子替换，崩溃后不会留下半截快照。调用方须持有写锁。
    fn write_snapshot(&self, entries: BTreeMap<String, CacheEntry>) -> Result<(), Exception> {
        let snapshot = Snapshot {
            version: CACHE_VERSION,
            entries,
        };
        let data =
            serde_json::to_vec(&snapshot).map_err(|e| Exception::Io(e.to_string()))?;
        let dir = match self.file.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;
        let mut temp = tempfile::NamedTempFile::new_in(&dir)?;
        std::io::Write::write_all(&mut temp, &data)?;
        temp.persist(&self.file)
            .map_err(|e| Exception::Io(e.error.to_string()))?;
        debug!("缓存快照已写入{}", self.file.display());
        Ok(())
    }

    fn sorted_entries(&self) -> BTreeMap<String, CacheEntry> {
        self.read_entries()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<String, CacheEntry>> {
        match self.entries.read() {
            Ok(lock) => lock,
            Err(poisoned) => {
                warn!("缓存读锁被污染，恢复并继续");
                poisoned.into_inner()
            }
        }
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<String, CacheEntry>> {
        match self.entries.write() {
            Ok(lock) => lock,
            Err(poisoned) => {
                warn!("缓存写锁被污染，恢复并继续");
                poisoned.into_inner()
            }
        }
    }

    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        match self.write_lock.lock() {
            Ok(lock) => lock,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
