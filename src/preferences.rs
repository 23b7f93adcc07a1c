//! Profile and locale preferences
//!
//! Holds the user's display language and profile details, plus a static
//! key lookup for the strings the device screens show.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Language {
    #[default]
    #[serde(rename = "zh-CN")]
    ZhCn,
    #[serde(rename = "en-US")]
    EnUs,
    #[serde(rename = "de-DE")]
    DeDe,
}

impl Language {
    pub const ALL: [Language; 3] = [Language::ZhCn, Language::EnUs, Language::DeDe];

    /// BCP 47 tag
    pub fn tag(&self) -> &'static str {
        match self {
            Language::ZhCn => "zh-CN",
            Language::EnUs => "en-US",
            Language::DeDe => "de-DE",
        }
    }

    /// Name of the language in itself
    pub fn native_name(&self) -> &'static str {
        match self {
            Language::ZhCn => "简体中文",
            Language::EnUs => "English",
            Language::DeDe => "Deutsch",
        }
    }

    /// Short label shown on the language toggle, e.g. `EN`
    pub fn short_code(&self) -> String {
        self.tag()
            .split('-')
            .next()
            .unwrap_or_default()
            .to_uppercase()
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Language {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Language::ALL
            .into_iter()
            .find(|lang| lang.tag().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("Unsupported language: {s}"))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    pub email: String,
    pub nickname: String,
    pub avatar_url: String,
    pub language: Language,
}

/// Preferences for the signed-in user; language applies even when signed out
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    pub language: Language,
    pub profile: Option<UserProfile>,
}

impl Preferences {
    pub fn new(language: Language) -> Self {
        Self {
            language,
            profile: None,
        }
    }

    pub fn set_language(&mut self, language: Language) {
        self.language = language;
        if let Some(profile) = self.profile.as_mut() {
            profile.language = language;
        }
    }

    /// Sign in; the profile's language becomes the active one
    pub fn sign_in(&mut self, profile: UserProfile) {
        self.language = profile.language;
        self.profile = Some(profile);
    }

    pub fn sign_out(&mut self) -> Option<UserProfile> {
        self.profile.take()
    }

    pub fn is_signed_in(&self) -> bool {
        self.profile.is_some()
    }

    pub fn t<'a>(&self, key: &'a str) -> &'a str {
        t(key, self.language)
    }
}

// key, zh-CN, en-US, de-DE
const STRINGS: &[(&str, &str, &str, &str)] = &[
    ("app.name", "智能录音", "SmartSound", "SmartSound"),
    ("status.disconnected", "未连接", "Disconnected", "Getrennt"),
    ("status.scanning", "正在搜索设备…", "Scanning for devices…", "Suche nach Geräten…"),
    ("status.connecting", "正在连接…", "Connecting…", "Verbinde…"),
    ("status.connected", "已连接", "Connected", "Verbunden"),
    ("btn.scan", "搜索设备", "Scan for Devices", "Geräte suchen"),
    ("btn.delete", "删除", "Delete", "Löschen"),
    ("btn.done", "完成", "Done", "Fertig"),
    ("btn.select_all", "全选", "Select All", "Alle auswählen"),
    ("btn.deselect_all", "取消全选", "Deselect All", "Auswahl aufheben"),
    ("btn.sync_selected", "同步所选", "Sync Selected", "Auswahl synchronisieren"),
    ("device.battery", "电量", "Battery", "Akku"),
    ("device.history", "连接记录", "Connection History", "Verbindungsverlauf"),
    ("device.storage", "存储空间", "Storage", "Speicher"),
    ("device.files", "设备文件", "Device Files", "Gerätedateien"),
    ("device.no_files", "设备上没有文件", "No files on device", "Keine Dateien auf dem Gerät"),
    ("device.sync_all", "全部同步", "Sync All", "Alle synchronisieren"),
    ("device.remote.title", "远程录音", "Remote Recording", "Fernaufnahme"),
    ("device.remote.recording", "正在录音", "Recording", "Aufnahme läuft"),
    ("device.remote.start", "开始录音", "Start Recording", "Aufnahme starten"),
    ("device.remote.stop", "停止录音", "Stop Recording", "Aufnahme beenden"),
    ("device.settings.title", "硬件设置", "Hardware Settings", "Hardware-Einstellungen"),
    ("device.settings.duration", "按键录音时长", "Button Press Duration", "Tastendruckdauer"),
    ("device.settings.seconds", "秒", "s", "s"),
    ("device.music.title", "音乐", "Music", "Musik"),
    ("rec.sync_required", "请先同步此文件", "Sync this file first", "Datei zuerst synchronisieren"),
    ("profile.lang", "语言", "Language", "Sprache"),
    ("profile.notifications", "通知", "Notifications", "Benachrichtigungen"),
    ("lang.zh", "简体中文", "Chinese", "Chinesisch"),
    ("lang.en", "英语", "English", "Englisch"),
    ("lang.de", "德语", "German", "Deutsch"),
];

/// Look up a display string; unknown keys are returned as-is
pub fn t(key: &str, language: Language) -> &str {
    STRINGS
        .iter()
        .find(|(k, ..)| *k == key)
        .map(|(_, zh, en, de)| match language {
            Language::ZhCn => *zh,
            Language::EnUs => *en,
            Language::DeDe => *de,
        })
        .unwrap_or(key)
}
