use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

const HEX: &[u8; 16] = b"0123456789abcdef";

static ID_SEED: OnceLock<u64> = OnceLock::new();
static ID_COUNTER: AtomicU64 = AtomicU64::new(1);

#[inline]
pub(crate) fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}

/// Generate a process-unique id with the given prefix, e.g. `chatcmpl-<16 hex>`.
///
/// Ids mix a per-process random seed with a monotonic counter so two gateway
/// instances never hand out colliding ids to the same client.
pub(crate) fn next_id(prefix: &str) -> String {
    let seed = *ID_SEED.get_or_init(|| fastrand::u64(..));
    let seq = ID_COUNTER.fetch_add(1, Ordering::Relaxed);
    let mut out = String::with_capacity(prefix.len() + 16);
    out.push_str(prefix);
    push_u64_hex_16(&mut out, seed ^ seq.rotate_left(32));
    out
}

/// Fresh OpenAI-style completion id.
pub(crate) fn next_chat_id() -> String {
    next_id("chatcmpl-")
}

/// Fresh Anthropic-style message id.
pub(crate) fn next_message_id() -> String {
    next_id("msg_")
}

/// Fresh tool-call id with the dialect-appropriate prefix (`call_` for
/// OpenAI, `toolu_` for Anthropic).
pub(crate) fn next_tool_call_id(prefix: &'static str) -> String {
    next_id(prefix)
}

#[inline]
fn push_u64_hex_16(out: &mut String, mut value: u64) {
    let mut buf = [b'0'; 16];
    let mut idx = 16;
    while idx > 0 {
        idx -= 1;
        let nibble = usize::try_from(value & 0x0f).unwrap_or(0);
        buf[idx] = HEX[nibble];
        value >>= 4;
    }
    for byte in buf {
        out.push(char::from(byte));
    }
}
