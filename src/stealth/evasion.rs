//! Evasion init scripts
//!
//! Builders for the JavaScript installed on every new document. Each
//! script overrides one surface a detector inspects: navigator
//! properties, screen metrics, WebGL identity, canvas/audio readouts,
//! and the automation markers browsers leave behind.

use super::fingerprint::Fingerprint;

/// All evasion scripts for a fingerprint, in install order.
///
/// The automation cloak goes first so navigator.webdriver is gone
/// before any other override runs.
pub fn evasion_scripts(fingerprint: &Fingerprint) -> Vec<String> {
    vec![
        automation_cloak_script(),
        navigator_script(fingerprint),
        screen_script(fingerprint),
        webgl_script(fingerprint),
        canvas_noise_script(),
        audio_noise_script(),
    ]
}

/// Hide the markers automation leaves on the page
pub fn automation_cloak_script() -> String {
    r#"(function() {
        Object.defineProperty(navigator, 'webdriver', { get: () => false });

        const originalQuery = window.navigator.permissions.query;
        window.navigator.permissions.query = (parameters) => (
            parameters.name === 'notifications'
                ? Promise.resolve({ state: Notification.permission })
                : originalQuery(parameters)
        );

        if (navigator.mediaDevices && navigator.mediaDevices.enumerateDevices) {
            const originalEnumerate = navigator.mediaDevices.enumerateDevices.bind(navigator.mediaDevices);
            navigator.mediaDevices.enumerateDevices = () => originalEnumerate().then((devices) => {
                if (devices.length > 0) return devices;
                return [
                    { deviceId: 'default', kind: 'audioinput', label: '', groupId: 'default' },
                    { deviceId: 'default', kind: 'videoinput', label: '', groupId: 'default' }
                ];
            });
        }

        window.chrome = window.chrome || { runtime: {} };
    })();"#
        .to_string()
}

/// Navigator property overrides
pub fn navigator_script(fingerprint: &Fingerprint) -> String {
    let languages = serde_json::to_string(&fingerprint.languages).unwrap_or_default();
    let plugins: Vec<serde_json::Value> = fingerprint
        .plugins
        .iter()
        .map(|name| serde_json::json!({ "name": name, "length": 1 }))
        .collect();
    let plugins = serde_json::to_string(&plugins).unwrap_or_default();
    let do_not_track = match &fingerprint.do_not_track {
        Some(value) => format!("'{}'", value),
        None => "null".to_string(),
    };

    format!(
        r#"(function() {{
            Object.defineProperty(navigator, 'platform', {{ get: () => '{platform}' }});
            Object.defineProperty(navigator, 'vendor', {{ get: () => '{vendor}' }});
            Object.defineProperty(navigator, 'hardwareConcurrency', {{ get: () => {cores} }});
            Object.defineProperty(navigator, 'deviceMemory', {{ get: () => {memory} }});
            Object.defineProperty(navigator, 'language', {{ get: () => '{language}' }});
            Object.defineProperty(navigator, 'languages', {{ get: () => {languages} }});
            Object.defineProperty(navigator, 'maxTouchPoints', {{ get: () => {touch} }});
            Object.defineProperty(navigator, 'doNotTrack', {{ get: () => {dnt} }});
            Object.defineProperty(navigator, 'cookieEnabled', {{ get: () => {cookies} }});
            Object.defineProperty(navigator, 'productSub', {{ get: () => '{product_sub}' }});
            Object.defineProperty(navigator, 'plugins', {{ get: () => {plugins} }});
        }})();"#,
        platform = fingerprint.platform,
        vendor = fingerprint.vendor,
        cores = fingerprint.hardware_concurrency,
        memory = fingerprint.device_memory,
        language = fingerprint.language,
        languages = languages,
        touch = fingerprint.max_touch_points,
        dnt = do_not_track,
        cookies = fingerprint.cookie_enabled,
        product_sub = fingerprint.product_sub,
        plugins = plugins,
    )
}

/// Screen metric overrides
pub fn screen_script(fingerprint: &Fingerprint) -> String {
    format!(
        r#"(function() {{
            Object.defineProperty(screen, 'width', {{ get: () => {width} }});
            Object.defineProperty(screen, 'height', {{ get: () => {height} }});
            Object.defineProperty(screen, 'availWidth', {{ get: () => {avail_width} }});
            Object.defineProperty(screen, 'availHeight', {{ get: () => {avail_height} }});
            Object.defineProperty(screen, 'colorDepth', {{ get: () => {color_depth} }});
            Object.defineProperty(screen, 'pixelDepth', {{ get: () => {pixel_depth} }});
            Object.defineProperty(window, 'devicePixelRatio', {{ get: () => {ratio} }});
        }})();"#,
        width = fingerprint.screen_width,
        height = fingerprint.screen_height,
        avail_width = fingerprint.avail_width,
        avail_height = fingerprint.avail_height,
        color_depth = fingerprint.color_depth,
        pixel_depth = fingerprint.pixel_depth,
        ratio = fingerprint.device_pixel_ratio,
    )
}

/// WebGL vendor/renderer override with extension-order shuffling
pub fn webgl_script(fingerprint: &Fingerprint) -> String {
    format!(
        r#"(function() {{
            const getParameter = WebGLRenderingContext.prototype.getParameter;
            WebGLRenderingContext.prototype.getParameter = function(parameter) {{
                if (parameter === 37445) return '{vendor}';
                if (parameter === 37446) return '{renderer}';
                return getParameter.call(this, parameter);
            }};

            const getSupportedExtensions = WebGLRenderingContext.prototype.getSupportedExtensions;
            WebGLRenderingContext.prototype.getSupportedExtensions = function() {{
                return getSupportedExtensions.call(this).sort(() => Math.random() - 0.5);
            }};
        }})();"#,
        vendor = fingerprint.webgl_vendor,
        renderer = fingerprint.webgl_renderer,
    )
}

/// Per-read canvas noise
pub fn canvas_noise_script() -> String {
    r#"(function() {
        const addNoise = (data) => {
            for (let i = 0; i < data.length; i += 4) {
                data[i] += Math.random() * 0.1;
                data[i + 1] += Math.random() * 0.1;
                data[i + 2] += Math.random() * 0.1;
            }
        };

        const originalToDataURL = HTMLCanvasElement.prototype.toDataURL;
        HTMLCanvasElement.prototype.toDataURL = function(type) {
            const context = this.getContext('2d');
            if (context) {
                const imageData = context.getImageData(0, 0, this.width, this.height);
                addNoise(imageData.data);
                context.putImageData(imageData, 0, 0);
            }
            return originalToDataURL.apply(this, arguments);
        };

        const originalGetImageData = CanvasRenderingContext2D.prototype.getImageData;
        CanvasRenderingContext2D.prototype.getImageData = function() {
            const imageData = originalGetImageData.apply(this, arguments);
            addNoise(imageData.data);
            return imageData;
        };
    })();"#
        .to_string()
}

/// Per-read audio buffer noise
pub fn audio_noise_script() -> String {
    r#"(function() {
        const originalGetChannelData = AudioBuffer.prototype.getChannelData;
        AudioBuffer.prototype.getChannelData = function() {
            const data = originalGetChannelData.apply(this, arguments);
            for (let i = 0; i < data.length; i++) {
                data[i] += Math.random() * 0.0001;
            }
            return data;
        };
    })();"#
        .to_string()
}
