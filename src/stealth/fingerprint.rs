//! Fingerprint generation
//!
//! A fingerprint is the full set of identity attributes presented to
//! page scripts: navigator and screen properties, WebGL identity, and
//! hashed canvas/webgl/audio signatures. A manager generates one
//! fingerprint per instance and caches it, so every page of a session
//! presents the same identity.

use rand::seq::SliceRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Mutex;
use tracing::debug;

use crate::session::BrowserSession;
use crate::Error;

pub const WINDOWS_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:132.0) Gecko/20100101 Firefox/132.0",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
];

pub const MACOS_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.2 Safari/605.1.15",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10.15; rv:132.0) Gecko/20100101 Firefox/132.0",
];

pub const LINUX_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Ubuntu; Linux x86_64; rv:132.0) Gecko/20100101 Firefox/132.0",
];

pub const ANDROID_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Linux; Android 14) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Mobile Safari/537.36",
    "Mozilla/5.0 (Linux; Android 14; Pixel 8) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Mobile Safari/537.36",
];

pub const IOS_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (iPhone; CPU iPhone OS 18_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.2 Mobile/15E148 Safari/604.1",
    "Mozilla/5.0 (iPad; CPU OS 18_2 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/18.2 Mobile/15E148 Safari/604.1",
];

pub const WEBGL_VENDORS: &[&str] = &[
    "Google Inc. (NVIDIA)",
    "Google Inc. (Intel)",
    "Google Inc. (AMD)",
];

pub const WEBGL_RENDERERS: &[&str] = &[
    "ANGLE (NVIDIA GeForce RTX 3080 Direct3D11 vs_5_0 ps_5_0)",
    "ANGLE (NVIDIA GeForce RTX 3070 Direct3D11 vs_5_0 ps_5_0)",
    "ANGLE (Intel(R) UHD Graphics 630 Direct3D11 vs_5_0 ps_5_0)",
    "ANGLE (AMD Radeon RX 6800 Direct3D11 vs_5_0 ps_5_0)",
];

const TIMEZONES: &[&str] = &[
    "America/New_York",
    "America/Chicago",
    "America/Los_Angeles",
    "Europe/London",
    "Europe/Paris",
    "Europe/Berlin",
    "Asia/Tokyo",
    "Asia/Shanghai",
    "Australia/Sydney",
];

const LOCALES: &[&str] = &[
    "en-US", "en-GB", "de-DE", "fr-FR", "es-ES", "ja-JP", "zh-CN",
];

const FONTS: &[&str] = &[
    "Arial", "Helvetica", "Times New Roman", "Courier", "Verdana", "Georgia",
    "Palatino", "Garamond", "Comic Sans MS", "Trebuchet MS", "Arial Black",
    "Impact", "Tahoma", "Calibri", "Cambria", "Segoe UI", "Roboto",
    "Open Sans", "Lato", "Montserrat",
];

const PLUGINS: &[&str] = &[
    "Chrome PDF Plugin",
    "Chrome PDF Viewer",
    "Native Client",
    "Adobe Acrobat",
    "Microsoft Office",
    "VLC Multimedia Plugin",
];

/// Target platform of a fingerprint, derived from the bot's OS label
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FingerprintOs {
    Windows,
    MacOs,
    Linux,
    Android,
    Ios,
}

impl FingerprintOs {
    /// Lenient parse; unknown labels fall back to Windows
    pub fn from_label(label: &str) -> Self {
        match label.to_lowercase().as_str() {
            "macos" | "mac" | "darwin" => FingerprintOs::MacOs,
            "linux" => FingerprintOs::Linux,
            "android" => FingerprintOs::Android,
            "ios" | "iphone" | "ipad" => FingerprintOs::Ios,
            _ => FingerprintOs::Windows,
        }
    }
}

/// The identity attributes presented to page scripts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Fingerprint {
    pub user_agent: String,
    pub platform: String,
    pub vendor: String,
    pub language: String,
    pub languages: Vec<String>,
    pub hardware_concurrency: u32,
    pub device_memory: u32,
    pub max_touch_points: u32,
    pub screen_width: u32,
    pub screen_height: u32,
    pub avail_width: u32,
    pub avail_height: u32,
    pub color_depth: u32,
    pub pixel_depth: u32,
    pub device_pixel_ratio: f64,
    pub timezone: String,
    pub do_not_track: Option<String>,
    pub cookie_enabled: bool,
    pub plugins: Vec<String>,
    pub fonts: Vec<String>,
    pub webgl_vendor: String,
    pub webgl_renderer: String,
    /// Stable per-identity hashes fed into the noise scripts
    pub canvas_hash: String,
    pub webgl_hash: String,
    pub audio_hash: String,
    pub product_sub: String,
    pub oscpu: String,
}

/// Hex-encoded sha256 of the input
fn hash_token(input: &str) -> String {
    let digest = Sha256::digest(input.as_bytes());
    digest.iter().map(|b| format!("{:02x}", b)).collect()
}

impl Fingerprint {
    /// Generate a random fingerprint for the given platform
    pub fn generate(os: FingerprintOs) -> Self {
        let mut rng = rand::thread_rng();

        let (platform, vendor, oscpu) = match os {
            FingerprintOs::Windows => ("Win32", "Google Inc.", "Windows NT 10.0; Win64; x64"),
            FingerprintOs::MacOs => ("MacIntel", "Google Inc.", "Intel Mac OS X 10_15_7"),
            FingerprintOs::Linux => ("Linux x86_64", "", "Linux x86_64"),
            FingerprintOs::Android => ("Linux armv8l", "Google Inc.", "Linux armv8l"),
            FingerprintOs::Ios => ("iPhone", "Apple Computer, Inc.", "iPhone"),
        };

        let (screen_width, screen_height) = match os {
            FingerprintOs::Windows => *[(1920, 1080), (2560, 1440), (3840, 2160), (1366, 768)]
                .choose(&mut rng)
                .unwrap_or(&(1920, 1080)),
            FingerprintOs::MacOs => *[(2560, 1440), (2880, 1800), (3840, 2160), (1920, 1080)]
                .choose(&mut rng)
                .unwrap_or(&(2560, 1440)),
            FingerprintOs::Linux => *[(1920, 1080), (2560, 1440), (3840, 2160)]
                .choose(&mut rng)
                .unwrap_or(&(1920, 1080)),
            FingerprintOs::Android => *[(360, 800), (390, 844), (412, 915)]
                .choose(&mut rng)
                .unwrap_or(&(390, 844)),
            FingerprintOs::Ios => *[(390, 844), (414, 896), (1024, 1366)]
                .choose(&mut rng)
                .unwrap_or(&(390, 844)),
        };

        let mobile = matches!(os, FingerprintOs::Android | FingerprintOs::Ios);

        let user_agent = super::user_agent::UserAgentRotator::random_for_os(os);

        let language = LOCALES.choose(&mut rng).copied().unwrap_or("en-US").to_string();
        let languages = if language == "en-US" {
            vec!["en-US".to_string(), "en".to_string()]
        } else {
            vec![language.clone(), "en-US".to_string(), "en".to_string()]
        };

        let hardware_concurrency = *[4u32, 6, 8, 12, 16, 24, 32].choose(&mut rng).unwrap_or(&8);
        let device_memory = *[4u32, 8, 16, 32].choose(&mut rng).unwrap_or(&8);

        let mut fonts: Vec<String> = FONTS.iter().map(|f| f.to_string()).collect();
        fonts.shuffle(&mut rng);
        fonts.truncate(rng.gen_range(5..=15));

        let mut plugins: Vec<String> = PLUGINS.iter().map(|p| p.to_string()).collect();
        plugins.shuffle(&mut rng);
        plugins.truncate(rng.gen_range(2..=4));

        let device_pixel_ratio = if mobile {
            *[2.0, 3.0].choose(&mut rng).unwrap_or(&2.0)
        } else {
            *[1.0, 1.25, 1.5, 2.0].choose(&mut rng).unwrap_or(&1.0)
        };

        let (webgl_vendor, webgl_renderer) = match os {
            FingerprintOs::Android => ("Qualcomm".to_string(), "Adreno 740".to_string()),
            FingerprintOs::Ios => ("Apple Inc.".to_string(), "Apple GPU".to_string()),
            _ => (
                WEBGL_VENDORS
                    .choose(&mut rng)
                    .copied()
                    .unwrap_or(WEBGL_VENDORS[0])
                    .to_string(),
                WEBGL_RENDERERS
                    .choose(&mut rng)
                    .copied()
                    .unwrap_or(WEBGL_RENDERERS[0])
                    .to_string(),
            ),
        };

        Self {
            user_agent,
            platform: platform.to_string(),
            vendor: vendor.to_string(),
            language,
            languages,
            hardware_concurrency,
            device_memory,
            max_touch_points: if mobile { 5 } else { 0 },
            screen_width,
            screen_height,
            avail_width: screen_width,
            avail_height: screen_height.saturating_sub(40),
            color_depth: 24,
            pixel_depth: 24,
            device_pixel_ratio,
            timezone: TIMEZONES
                .choose(&mut rng)
                .copied()
                .unwrap_or("America/New_York")
                .to_string(),
            do_not_track: [Some("1".to_string()), Some("0".to_string()), None]
                .choose(&mut rng)
                .cloned()
                .unwrap_or(None),
            cookie_enabled: true,
            plugins,
            fonts,
            webgl_vendor,
            webgl_renderer,
            canvas_hash: hash_token(&format!("canvas_{}", rng.gen::<u64>())),
            webgl_hash: hash_token(&format!("webgl_{}", rng.gen::<u64>())),
            audio_hash: hash_token(&format!("audio_{}", rng.gen::<u64>())),
            product_sub: "20030107".to_string(),
            oscpu: oscpu.to_string(),
        }
    }
}

/// Generates and caches one fingerprint per instance.
///
/// The first call to [`FingerprintManager::fingerprint`] generates; all
/// later calls return the same identity until [`FingerprintManager::regenerate`].
#[derive(Debug)]
pub struct FingerprintManager {
    os: FingerprintOs,
    applied: Mutex<Option<Fingerprint>>,
}

impl FingerprintManager {
    pub fn new(os: FingerprintOs) -> Self {
        Self {
            os,
            applied: Mutex::new(None),
        }
    }

    /// The manager for a bot's OS label
    pub fn for_os_label(label: &str) -> Self {
        Self::new(FingerprintOs::from_label(label))
    }

    /// The cached fingerprint, generating it on first use
    pub fn fingerprint(&self) -> Fingerprint {
        let mut applied = self.applied.lock().unwrap_or_else(|e| e.into_inner());
        applied
            .get_or_insert_with(|| {
                debug!("Generating fingerprint for {:?}", self.os);
                Fingerprint::generate(self.os)
            })
            .clone()
    }

    /// The fingerprint previously handed out, if any
    pub fn applied_fingerprint(&self) -> Option<Fingerprint> {
        self.applied
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Discard the cached identity and generate a fresh one
    pub fn regenerate(&self) -> Fingerprint {
        let fingerprint = Fingerprint::generate(self.os);
        let mut applied = self.applied.lock().unwrap_or_else(|e| e.into_inner());
        *applied = Some(fingerprint.clone());
        fingerprint
    }

    /// Install the fingerprint into a session as init scripts.
    ///
    /// Must run before the session opens pages; scripts only apply to
    /// pages created afterwards.
    pub async fn apply(&self, session: &dyn BrowserSession) -> Result<Fingerprint, Error> {
        let fingerprint = self.fingerprint();

        for script in super::evasion::evasion_scripts(&fingerprint) {
            session.add_init_script(&script).await?;
        }

        Ok(fingerprint)
    }
}
