use super::fingerprint::UserAgentProfile;
use royale_common::StealthLevel;
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
/// Levels of stealth applied to the browser session.
pub enum StealthProfile {
    Lightweight,
    Balanced,
    Maximum,
}

impl From<StealthLevel> for StealthProfile {
    fn from(level: StealthLevel) -> Self {
        match level {
            StealthLevel::Lightweight => StealthProfile::Lightweight,
            StealthLevel::Balanced => StealthProfile::Balanced,
            StealthLevel::Maximum => StealthProfile::Maximum,
        }
    }
}

/// Construct Chrome command-line arguments for a given stealth profile
/// and fingerprint.
pub fn build_stealth_arguments(
    profile: StealthProfile,
    user_profile: &UserAgentProfile,
    headless: bool,
) -> Vec<String> {
    let mut args = vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        "--disable-infobars".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--no-sandbox".to_string(),
        "--disable-extensions".to_string(),
        "--disable-plugins-discovery".to_string(),
        format!("--user-agent={}", user_profile.user_agent),
        format!(
            "--window-size={},{}",
            user_profile.viewport.0, user_profile.viewport.1
        ),
        format!("--lang={}", user_profile.languages.join(",")),
    ];
    if profile == StealthProfile::Maximum {
        // Weakens isolation; only for the most aggressive profile.
        args.push("--disable-web-security".to_string());
    }
    if headless {
        args.push("--headless=new".to_string());
        args.push("--disable-gpu".to_string());
    }
    args
}

const CORE_EVASIONS: &str = r#"
    Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
    Object.defineProperty(navigator, 'plugins', { get: () => [1, 2, 3] });
    window.chrome = window.chrome || { runtime: {} };
    const query = navigator.permissions && navigator.permissions.query;
    if (query) {
        navigator.permissions.query = (p) => p && p.name === 'notifications'
            ? Promise.resolve({ state: Notification.permission })
            : query.call(navigator.permissions, p);
    }
"#;

const CANVAS_NOISE: &str = r#"
    const origGetContext = HTMLCanvasElement.prototype.getContext;
    HTMLCanvasElement.prototype.getContext = function (kind, ...rest) {
        const ctx = origGetContext.call(this, kind, ...rest);
        if (kind === '2d' && ctx) {
            const toDataURL = this.toDataURL;
            this.toDataURL = function (...a) {
                const img = ctx.getImageData(0, 0, this.width, this.height);
                for (let i = 0; i < img.data.length; i += 4) {
                    if (Math.random() < 0.001) img.data[i] += Math.random() < 0.5 ? -1 : 1;
                }
                ctx.putImageData(img, 0, 0);
                return toDataURL.apply(this, a);
            };
        }
        return ctx;
    };
"#;

const WEBGL_VENDOR: &str = r#"
    const origParam = WebGLRenderingContext.prototype.getParameter;
    WebGLRenderingContext.prototype.getParameter = function (p) {
        if (p === 37445) return 'Intel Inc.';
        if (p === 37446) return 'Intel Iris OpenGL Engine';
        return origParam.call(this, p);
    };
"#;

/// Align `navigator.languages` and `navigator.platform` with the session profile.
pub fn navigator_script(profile: &UserAgentProfile) -> String {
    let languages = serde_json::to_string(&profile.languages).unwrap_or_else(|_| "[]".into());
    let platform = serde_json::to_string(&profile.platform).unwrap_or_else(|_| "\"\"".into());
    format!(
        "Object.defineProperty(navigator, 'languages', {{ get: () => {languages} }});\n\
         Object.defineProperty(navigator, 'platform', {{ get: () => {platform} }});"
    )
}

/// Scripts to run after each navigation, cheapest first.
pub fn page_scripts(profile: StealthProfile, ua: &UserAgentProfile) -> Vec<Cow<'static, str>> {
    let mut scripts = vec![Cow::Borrowed(CORE_EVASIONS)];
    if profile != StealthProfile::Lightweight {
        scripts.push(Cow::Borrowed(CANVAS_NOISE));
    }
    if profile == StealthProfile::Maximum {
        scripts.push(Cow::Borrowed(WEBGL_VENDOR));
        scripts.push(Cow::Owned(navigator_script(ua)));
    }
    scripts
}
