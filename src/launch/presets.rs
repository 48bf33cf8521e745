//! Device emulation presets

use phf::phf_map;

/// Viewport and input characteristics of a device class
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DevicePreset {
    pub width: u32,
    pub height: u32,
    pub scale: f64,
    pub mobile: bool,
}

pub const DEFAULT_PRESET: DevicePreset = DevicePreset {
    width: 1920,
    height: 1080,
    scale: 1.0,
    mobile: false,
};

static DEVICE_PRESETS: phf::Map<&'static str, DevicePreset> = phf_map! {
    "Desktop Chrome" => DevicePreset { width: 1280, height: 720, scale: 1.0, mobile: false },
    "Desktop Firefox" => DevicePreset { width: 1280, height: 720, scale: 1.0, mobile: false },
    "Desktop Safari" => DevicePreset { width: 1280, height: 720, scale: 2.0, mobile: false },
    "Desktop Edge" => DevicePreset { width: 1280, height: 720, scale: 1.0, mobile: false },
    "Pixel 8" => DevicePreset { width: 412, height: 915, scale: 2.625, mobile: true },
    "Pixel 5" => DevicePreset { width: 393, height: 851, scale: 2.75, mobile: true },
    "Galaxy S23" => DevicePreset { width: 360, height: 780, scale: 3.0, mobile: true },
    "iPhone 15" => DevicePreset { width: 393, height: 852, scale: 3.0, mobile: true },
    "iPhone 13" => DevicePreset { width: 390, height: 844, scale: 3.0, mobile: true },
    "iPad Pro 11" => DevicePreset { width: 834, height: 1194, scale: 2.0, mobile: true },
};

/// The preset for a device label, falling back to a plain desktop
pub fn preset_for(device: &str) -> DevicePreset {
    DEVICE_PRESETS.get(device).copied().unwrap_or(DEFAULT_PRESET)
}
