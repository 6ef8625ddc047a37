use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use card_arcade_core::{Profile, Records, Settings, StatsStore, StatsUpdate};
use chrono::Utc;
use parking_lot::RwLock;
use tracing::{info, warn};

/// 以 JSON 文件持久化的统计档案，每次写入后立即落盘
pub struct JsonFileStore {
    path: PathBuf,
    profile: RwLock<Profile>,
}

impl JsonFileStore {
    /// 读取已有档案；文件不存在时从空档案开始
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let profile = if path.exists() {
            let text = fs::read_to_string(&path)
                .with_context(|| format!("读取统计文件 {} 失败", path.display()))?;
            serde_json::from_str(&text)
                .with_context(|| format!("解析统计文件 {} 失败", path.display()))?
        } else {
            info!("统计文件 {} 不存在，使用空档案", path.display());
            Profile::default()
        };
        Ok(JsonFileStore { path, profile: RwLock::new(profile) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn profile(&self) -> Profile {
        self.profile.read().clone()
    }

    pub fn settings(&self) -> Settings {
        self.profile.read().settings.clone()
    }

    /// 修改档案并落盘。写锁在保存前释放。
    pub fn update_profile<T>(&self, f: impl FnOnce(&mut Profile) -> T) -> T {
        let (out, snapshot) = {
            let mut profile = self.profile.write();
            let out = f(&mut profile);
            (out, profile.clone())
        };
        if let Err(e) = self.save(&snapshot) {
            warn!("保存统计文件失败: {:#}", e);
        }
        out
    }

    fn save(&self, profile: &Profile) -> Result<()> {
        let text = serde_json::to_string_pretty(profile).context("序列化统计档案失败")?;
        fs::write(&self.path, text).with_context(|| format!("写入统计文件 {} 失败", self.path.display()))
    }
}

impl StatsStore for JsonFileStore {
    fn records(&self) -> Records {
        self.profile.read().records()
    }

    fn update_stats(&self, update: StatsUpdate) {
        self.update_profile(|profile| profile.apply(&update, Utc::now()));
    }
}
