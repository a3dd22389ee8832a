use std::collections::HashMap;

use crate::session::state::Platform;

/// App-name to bundle/package lookup tables.
///
/// Data, not code: the built-in defaults cover the common first-party apps and
/// the YAML config can extend or override entries per platform.
#[derive(Debug, Clone)]
pub struct AppCatalog {
    ios: HashMap<String, String>,
    android: HashMap<String, String>,
}

const IOS_APPS: &[(&str, &str)] = &[
    ("settings", "com.apple.Preferences"),
    ("safari", "com.apple.mobilesafari"),
    ("notes", "com.apple.mobilenotes"),
    ("photos", "com.apple.mobileslideshow"),
    ("messages", "com.apple.MobileSMS"),
    ("phone", "com.apple.mobilephone"),
    ("calculator", "com.apple.calculator"),
    ("calendar", "com.apple.mobilecal"),
    ("contacts", "com.apple.MobileAddressBook"),
    ("music", "com.apple.Music"),
    ("maps", "com.apple.Maps"),
    ("weather", "com.apple.weather"),
    ("clock", "com.apple.mobiletimer"),
    ("reminder", "com.apple.reminders"),
    ("mail", "com.apple.mobilemail"),
    ("files", "com.apple.DocumentsApp"),
    ("facetime", "com.apple.facetime"),
    ("podcasts", "com.apple.podcasts"),
];

const ANDROID_APPS: &[(&str, &str)] = &[
    ("settings", "com.android.settings"),
    ("chrome", "com.android.chrome"),
    ("contacts", "com.android.contacts"),
    ("phone", "com.android.dialer"),
    ("messages", "com.google.android.apps.messaging"),
    ("gallery", "com.google.android.apps.photos"),
    ("calculator", "com.google.android.calculator"),
    ("calendar", "com.google.calendar"),
    ("gmail", "com.google.android.gm"),
    ("maps", "com.google.android.apps.maps"),
    ("youtube", "com.google.android.youtube"),
    ("play", "com.android.vending"),
];

impl Default for AppCatalog {
    fn default() -> Self {
        let to_map = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect()
        };
        AppCatalog {
            ios: to_map(IOS_APPS),
            android: to_map(ANDROID_APPS),
        }
    }
}

impl AppCatalog {
    pub fn lookup(&self, platform: Platform, app_name: &str) -> Option<&str> {
        let table = match platform {
            Platform::Ios => &self.ios,
            Platform::Android => &self.android,
        };
        table.get(&app_name.to_lowercase()).map(|s| s.as_str())
    }

    /// Merge user-supplied entries over the defaults.
    pub fn extend(&mut self, platform: Platform, entries: &HashMap<String, String>) {
        let table = match platform {
            Platform::Ios => &mut self.ios,
            Platform::Android => &mut self.android,
        };
        for (name, id) in entries {
            table.insert(name.to_lowercase(), id.clone());
        }
    }
}
