//! Device-class inference from names and icon hints.

use bluefang_common::DeviceClass;

const PHONE_WORDS: &[&str] = &["phone", "mobile", "samsung", "iphone", "huawei", "xiaomi", "oneplus"];
const COMPUTER_WORDS: &[&str] = &["laptop", "pc", "computer", "macbook", "thinkpad", "dell"];
const HEADSET_WORDS: &[&str] = &["headset", "earbuds", "airpods", "jbl", "sony"];
const SPEAKER_WORDS: &[&str] = &["speaker", "sound", "audio", "bose", "harman"];

/// Keyword match on the lower-cased name; first matching group wins.
pub fn class_from_name(name: &str) -> DeviceClass {
    let lower = name.to_lowercase();
    let table: [(&[&str], DeviceClass); 4] = [
        (PHONE_WORDS, DeviceClass::Phone),
        (COMPUTER_WORDS, DeviceClass::Computer),
        (HEADSET_WORDS, DeviceClass::Headset),
        (SPEAKER_WORDS, DeviceClass::Speaker),
    ];
    table
        .iter()
        .find(|(words, _)| words.iter().any(|w| lower.contains(w)))
        .map(|(_, class)| *class)
        .unwrap_or(DeviceClass::Unknown)
}

/// Map a stack icon hint (`phone`, `computer`, `audio-card`, ...).
pub fn class_from_icon(icon: &str) -> DeviceClass {
    match icon.trim().to_lowercase().as_str() {
        "phone" => DeviceClass::Phone,
        "computer" => DeviceClass::Computer,
        "audio-headset" | "audio-headphones" => DeviceClass::Headset,
        "audio-card" => DeviceClass::Speaker,
        _ => DeviceClass::Unknown,
    }
}

/// Icon hint first, falling back to the name keywords.
pub fn infer_class(name: &str, icon: Option<&str>) -> DeviceClass {
    match icon.map(class_from_icon) {
        Some(class) if class != DeviceClass::Unknown => class,
        _ => class_from_name(name),
    }
}
